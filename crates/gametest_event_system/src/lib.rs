//! # Gametest Event System
//!
//! Typed game-event bus for the gametest integration-test harness. Scripted
//! tests drive a simulated game world and observe its asynchronous
//! consequences through this crate:
//!
//! - **Events** are a closed tagged-variant vocabulary ([`EventKind`] /
//!   [`GameEvent`]), each carrying a [`Cause`] chain plus keyed context.
//! - **Subscriptions** are temporary interests with an explicit lifecycle
//!   (`Idle -> Active -> {Fired | TimedOut | Revoked}`); one-shot
//!   subscriptions complete the waiter that installed them exactly once.
//! - **The bus** ([`EventBus`]) dispatches by kind, runs handlers
//!   synchronously on the delivery path, and carries handler failures to the
//!   suspended waiter instead of swallowing them.
//!
//! The bus is passed explicitly into consumers; there is no global event
//! manager.

pub mod bus;
pub mod cause;
pub mod events;
pub mod failure;
pub mod subscription;
pub mod types;

#[cfg(test)]
mod tests;

pub use bus::{EventBus, EventBusStats, PendingEvent};
pub use cause::{Cause, CauseActor, ContextKey, ContextValue};
pub use events::{
    BlockTransaction, BreakBlockEvent, EntitySnapshot, EventKind, EventPayload, EventSink,
    GameEvent, InventoryChangeEvent, MoveEntityEvent, PrimeExplosiveEvent, SpawnEntityEvent,
};
pub use failure::{FailureKind, TestFailure};
pub use subscription::{
    HandlerVerdict, ListenHandler, OneShotHandler, Subscription, SubscriptionState,
};
pub use types::{
    BlockPos, BlockType, EntityId, EntityKind, GameMode, ItemStack, ItemType, ListenerOwner,
    PlayerId, Vec3,
};

use std::sync::Arc;

/// Creates a new event bus ready for subscriptions.
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}
