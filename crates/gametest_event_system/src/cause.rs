//! # Cause Chains and Event Context
//!
//! Every [`GameEvent`](crate::events::GameEvent) carries a [`Cause`]: the
//! ordered chain of actors and objects that contributed to the event, plus a
//! keyed side-context (the item that was used, the owner responsible for a
//! delayed consequence, and so on). The cause is produced by the world when
//! the event fires and is read-only to tests.

use crate::types::{BlockPos, EntityId, ItemType, PlayerId};
use serde::{Deserialize, Serialize};

/// A single contributor in a cause chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CauseActor {
    /// A player contributed to the event.
    Player(PlayerId),
    /// A world entity contributed to the event.
    Entity(EntityId),
    /// A block position contributed to the event.
    Block(BlockPos),
}

/// Keys into the side-context of a cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKey {
    /// The item that was used to trigger the event.
    UsedItem,
    /// The player responsible for a delayed consequence (e.g. the igniter of
    /// an explosive whose blast breaks blocks later).
    Owner,
}

/// Values stored in the side-context of a cause.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ContextValue {
    Item(ItemType),
    Player(PlayerId),
    Entity(EntityId),
}

/// Ordered chain of contributing actors plus a keyed side-context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cause {
    chain: Vec<CauseActor>,
    context: Vec<(ContextKey, ContextValue)>,
}

impl Cause {
    /// Creates an empty cause.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cause rooted at a single player.
    pub fn of_player(player: PlayerId) -> Self {
        Self::new().with(CauseActor::Player(player))
    }

    /// Appends an actor to the chain.
    pub fn with(mut self, actor: CauseActor) -> Self {
        self.chain.push(actor);
        self
    }

    /// Attaches a context entry.
    pub fn with_context(mut self, key: ContextKey, value: ContextValue) -> Self {
        self.context.push((key, value));
        self
    }

    /// Returns the contributing actors in order.
    pub fn chain(&self) -> &[CauseActor] {
        &self.chain
    }

    /// Returns true if the chain contains the given player.
    pub fn contains_player(&self, player: PlayerId) -> bool {
        self.chain
            .iter()
            .any(|actor| matches!(actor, CauseActor::Player(p) if *p == player))
    }

    /// Looks up a context entry by key.
    pub fn context(&self, key: ContextKey) -> Option<&ContextValue> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Returns the used item from the context, if present.
    pub fn used_item(&self) -> Option<ItemType> {
        match self.context(ContextKey::UsedItem) {
            Some(ContextValue::Item(item)) => Some(*item),
            _ => None,
        }
    }

    /// Returns the owner from the context, if present.
    pub fn owner(&self) -> Option<PlayerId> {
        match self.context(ContextKey::Owner) {
            Some(ContextValue::Player(player)) => Some(*player),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cause[")?;
        for (i, actor) in self.chain.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            match actor {
                CauseActor::Player(id) => write!(f, "player {id}")?,
                CauseActor::Entity(id) => write!(f, "entity {id}")?,
                CauseActor::Block(pos) => write!(f, "block {pos}")?,
            }
        }
        write!(f, "]")
    }
}
