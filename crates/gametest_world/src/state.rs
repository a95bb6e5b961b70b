//! Internal world state shared between the accessor surface, the command
//! worker, and the delayed-consequence tasks (fuse burn-down, inventory
//! propagation).
//!
//! The state lives behind a `std::sync::RwLock`: accessors are synchronous
//! and non-suspending, and the async paths only lock it for short,
//! await-free sections.

use gametest_event_system::{
    BlockPos, BlockType, EntityId, EntityKind, EntitySnapshot, GameMode, ItemStack, PlayerId, Vec3,
};
use std::collections::HashMap;

/// Number of hotbar slots on the simulated player.
pub const HOTBAR_SLOTS: usize = 9;

/// Y level at and below which the world is solid dirt unless a block was
/// explicitly changed.
pub const GROUND_LEVEL: i32 = 64;

/// What the remote client is currently looking at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookTarget {
    /// A fixed position in the world.
    Position(Vec3),
    /// A tracked entity; the look follows the entity.
    Entity(EntityId),
}

/// One simulated entity.
#[derive(Debug, Clone)]
pub struct EntityState {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    /// Fuse length in milliseconds for fused explosives, `None` otherwise.
    pub fuse_duration_ms: Option<u64>,
    /// Whether the fuse has been lit.
    pub primed: bool,
    /// Player responsible for lighting the fuse.
    pub igniter: Option<PlayerId>,
}

impl EntityState {
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position,
        }
    }
}

/// The simulated player: accessor-visible state plus the remote copy of the
/// hotbar that click processing reads.
///
/// Accessor writes land in `hotbar` immediately; the remote copy
/// (`remote_hotbar`) catches up only after the propagation delay, matching
/// the real client/server round trip the harness has to wait out.
#[derive(Debug)]
pub struct PlayerState {
    pub id: PlayerId,
    pub game_mode: GameMode,
    pub position: Vec3,
    pub look_target: Option<LookTarget>,
    pub selected_slot: usize,
    pub hotbar: [Option<ItemStack>; HOTBAR_SLOTS],
    pub remote_hotbar: [Option<ItemStack>; HOTBAR_SLOTS],
    /// Slots written but not yet propagated to the remote copy.
    pub pending_slots: Vec<usize>,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            id: PlayerId::new(),
            game_mode: GameMode::default(),
            position: Vec3::new(0.5, GROUND_LEVEL as f64 + 1.0, 0.5),
            look_target: None,
            selected_slot: 0,
            hotbar: Default::default(),
            remote_hotbar: Default::default(),
            pending_slots: Vec::new(),
        }
    }

    /// The item the remote system considers held right now.
    pub fn remote_held_item(&self) -> Option<ItemStack> {
        self.remote_hotbar.get(self.selected_slot).copied().flatten()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete mutable world state.
#[derive(Debug, Default)]
pub struct WorldState {
    pub player: PlayerState,
    pub entities: HashMap<EntityId, EntityState>,
    /// Explicit block overrides; everything else is derived from the ground
    /// plane.
    pub block_overrides: HashMap<BlockPos, BlockType>,
}

impl WorldState {
    /// Returns the block at a position, falling back to the ground plane.
    pub fn block_at(&self, pos: BlockPos) -> BlockType {
        match self.block_overrides.get(&pos) {
            Some(block) => *block,
            None if pos.y <= GROUND_LEVEL => BlockType::Dirt,
            None => BlockType::Air,
        }
    }

    /// Resolves a look target to a concrete position, if it still exists.
    pub fn resolve_look(&self, target: LookTarget) -> Option<Vec3> {
        match target {
            LookTarget::Position(pos) => Some(pos),
            LookTarget::Entity(id) => self.entities.get(&id).map(|e| e.position),
        }
    }
}
