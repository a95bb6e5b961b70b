//! # Event Kinds and Payloads
//!
//! The event vocabulary is a closed tagged-variant registry: each world
//! occurrence the harness can observe is one [`EventKind`], and every fired
//! [`GameEvent`] carries the payload for exactly one kind plus its
//! [`Cause`]. Dispatch is by tag: a subscription registers for a kind and
//! only ever sees events of that kind, never by open-ended reflection.

use crate::cause::Cause;
use crate::types::{BlockPos, BlockType, EntityId, EntityKind, Vec3};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Category tag identifying what kind of world occurrence a subscription
/// cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// One or more entities entered the world.
    SpawnEntity,
    /// An entity moved between positions.
    MoveEntity,
    /// A fused explosive was primed (pre-detonation).
    PrimeExplosive,
    /// Blocks were broken, each recorded as a state transaction.
    BreakBlock,
    /// The remote copy of the player's inventory caught up with a write.
    InventoryChange,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::SpawnEntity => write!(f, "spawn_entity"),
            EventKind::MoveEntity => write!(f, "move_entity"),
            EventKind::PrimeExplosive => write!(f, "prime_explosive"),
            EventKind::BreakBlock => write!(f, "break_block"),
            EventKind::InventoryChange => write!(f, "inventory_change"),
        }
    }
}

/// Point-in-time view of an entity attached to an event payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Unique identifier of the entity
    pub id: EntityId,
    /// Kind of the entity
    pub kind: EntityKind,
    /// Position of the entity when the event fired
    pub position: Vec3,
}

/// Payload for [`EventKind::SpawnEntity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnEntityEvent {
    /// Entities that entered the world in this occurrence
    pub entities: Vec<EntitySnapshot>,
}

/// Payload for [`EventKind::MoveEntity`].
///
/// Movement is the one cancellable occurrence: a listener may call
/// [`MoveEntityEvent::set_cancelled`] on the delivery path and the world will
/// keep the entity at its previous position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveEntityEvent {
    /// The entity that is moving
    pub entity: EntitySnapshot,
    /// Position before the move
    pub from: Vec3,
    /// Position the entity is moving to
    pub to: Vec3,
    #[serde(skip, default)]
    cancelled: Arc<AtomicBool>,
}

impl MoveEntityEvent {
    /// Creates a movement event from `from` to `to`.
    pub fn new(entity: EntitySnapshot, from: Vec3, to: Vec3) -> Self {
        Self {
            entity,
            from,
            to,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the movement as cancelled. The world honors cancellation after
    /// delivery completes.
    pub fn set_cancelled(&self, cancelled: bool) {
        self.cancelled.store(cancelled, Ordering::SeqCst);
    }

    /// Returns true if a listener cancelled the movement.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Payload for [`EventKind::PrimeExplosive`].
///
/// Fired before detonation so listeners can observe the fuse while it is
/// still burning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimeExplosiveEvent {
    /// The explosive entity that was primed
    pub entity: EntitySnapshot,
    /// Remaining fuse duration in milliseconds
    pub fuse_duration_ms: u64,
}

/// A single block state change attached to a [`BreakBlockEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransaction {
    /// Position of the affected block
    pub position: BlockPos,
    /// Block state before the change
    pub original: BlockType,
    /// Block state after the change
    pub final_state: BlockType,
}

/// Payload for [`EventKind::BreakBlock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakBlockEvent {
    /// All block state transactions of this occurrence
    pub transactions: Vec<BlockTransaction>,
}

/// Payload for [`EventKind::InventoryChange`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryChangeEvent {
    /// Hotbar slot affected by the propagated write
    pub slot: usize,
}

/// Typed payload of a fired event, one variant per [`EventKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    SpawnEntity(SpawnEntityEvent),
    MoveEntity(MoveEntityEvent),
    PrimeExplosive(PrimeExplosiveEvent),
    BreakBlock(BreakBlockEvent),
    InventoryChange(InventoryChangeEvent),
}

/// A world occurrence as delivered to subscriptions: typed payload plus the
/// cause chain the world attached when it fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    /// What happened
    pub payload: EventPayload,
    /// Who and what made it happen
    pub cause: Cause,
}

impl GameEvent {
    /// Creates an event from a payload and its cause.
    pub fn new(payload: EventPayload, cause: Cause) -> Self {
        Self { payload, cause }
    }

    /// Returns the kind tag used for dispatch.
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::SpawnEntity(_) => EventKind::SpawnEntity,
            EventPayload::MoveEntity(_) => EventKind::MoveEntity,
            EventPayload::PrimeExplosive(_) => EventKind::PrimeExplosive,
            EventPayload::BreakBlock(_) => EventKind::BreakBlock,
            EventPayload::InventoryChange(_) => EventKind::InventoryChange,
        }
    }

    /// Returns the spawn payload, if this is a spawn event.
    pub fn as_spawn(&self) -> Option<&SpawnEntityEvent> {
        match &self.payload {
            EventPayload::SpawnEntity(event) => Some(event),
            _ => None,
        }
    }

    /// Returns the movement payload, if this is a movement event.
    pub fn as_move(&self) -> Option<&MoveEntityEvent> {
        match &self.payload {
            EventPayload::MoveEntity(event) => Some(event),
            _ => None,
        }
    }

    /// Returns the prime payload, if this is a prime event.
    pub fn as_prime(&self) -> Option<&PrimeExplosiveEvent> {
        match &self.payload {
            EventPayload::PrimeExplosive(event) => Some(event),
            _ => None,
        }
    }

    /// Returns the block-break payload, if this is a block-break event.
    pub fn as_break(&self) -> Option<&BreakBlockEvent> {
        match &self.payload {
            EventPayload::BreakBlock(event) => Some(event),
            _ => None,
        }
    }
}

/// Seam between the simulated world and whatever consumes its events.
///
/// The world only ever talks to an `EventSink`; in production that sink is
/// the [`EventBus`](crate::bus::EventBus), while unit tests can substitute a
/// recording sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one fired event to all interested parties.
    async fn deliver(&self, event: GameEvent);
}
