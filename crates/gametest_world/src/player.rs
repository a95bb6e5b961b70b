//! # Player Accessor Surface
//!
//! [`PlayerHandle`] is the synchronous, non-suspending view of the simulated
//! player: every read reflects the last-known remote state at the moment of
//! the call, and no atomicity is promised across multiple calls.
//!
//! Inventory writes land in the accessor-visible hotbar immediately but only
//! reach the remote copy after the world's propagation delay; tests that
//! click right after writing must wait the propagation out (the harness
//! exposes `wait_for_inventory_propagation` for exactly this).

use crate::sim::{propagate_inventory_write, WorldCore};
use crate::state::HOTBAR_SLOTS;
use gametest_event_system::{GameMode, ItemStack, PlayerId, TestFailure, Vec3};
use std::sync::Arc;
use tracing::debug;

/// Accessor handle for the simulated player.
#[derive(Clone)]
pub struct PlayerHandle {
    core: Arc<WorldCore>,
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle").field("id", &self.id()).finish()
    }
}

impl PlayerHandle {
    pub(crate) fn new(core: Arc<WorldCore>) -> Self {
        Self { core }
    }

    /// Unique ID of the player.
    pub fn id(&self) -> PlayerId {
        self.core.read_state(|state| state.player.id)
    }

    /// Position of the player.
    pub fn position(&self) -> Vec3 {
        self.core.read_state(|state| state.player.position)
    }

    /// Current game mode.
    pub fn game_mode(&self) -> GameMode {
        self.core.read_state(|state| state.player.game_mode)
    }

    /// Sets the game mode. Applied immediately; game mode is not subject to
    /// inventory-style propagation.
    pub fn set_game_mode(&self, mode: GameMode) {
        self.core.with_state(|state| state.player.game_mode = mode);
    }

    /// Currently selected hotbar slot.
    pub fn selected_slot(&self) -> usize {
        self.core.read_state(|state| state.player.selected_slot)
    }

    /// Selects a hotbar slot.
    pub fn select_hotbar_slot(&self, slot: usize) -> Result<(), TestFailure> {
        if slot >= HOTBAR_SLOTS {
            return Err(TestFailure::IllegalState(format!(
                "hotbar slot {slot} out of range (0..{HOTBAR_SLOTS})"
            )));
        }
        self.core.with_state(|state| state.player.selected_slot = slot);
        Ok(())
    }

    /// Item in the selected slot, as last written through this surface.
    pub fn item_in_hand(&self) -> Option<ItemStack> {
        self.core
            .read_state(|state| state.player.hotbar[state.player.selected_slot])
    }

    /// Puts an item stack into the selected slot. The write is visible here
    /// immediately and propagates to the remote side after the world's
    /// propagation delay.
    ///
    /// Must be called from within a tokio runtime; the propagation runs as a
    /// spawned task.
    pub fn set_item_in_hand(&self, stack: ItemStack) {
        let slot = self.core.with_state(|state| {
            let slot = state.player.selected_slot;
            state.player.hotbar[slot] = Some(stack);
            if !state.player.pending_slots.contains(&slot) {
                state.player.pending_slots.push(slot);
            }
            slot
        });
        debug!("🎒 Wrote {} into slot {} (propagating)", stack.item_type, slot);
        tokio::spawn(propagate_inventory_write(self.core.clone(), slot));
    }
}
