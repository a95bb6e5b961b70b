//! # Core Type Definitions
//!
//! This module contains the fundamental types shared by the event system,
//! the simulated world, and the test harness: identifier newtypes, spatial
//! primitives, and the closed vocabularies of items, entities, and blocks
//! that scripted tests interact with.
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent ID confusion (PlayerId vs EntityId)
//! - **Serialization**: All types support JSON serialization for diagnostics
//! - **Closed vocabularies**: item/entity/block kinds are enums, never free
//!   strings, so event dispatch and assertions are checked at compile time

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for the player driven by a scripted test.
///
/// This is a wrapper around UUID that provides type safety and ensures
/// player IDs cannot be confused with other kinds of IDs in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a simulated world entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Creates a new random entity ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a 3D position in the simulated world.
///
/// Uses double-precision floating point so positions survive repeated
/// accumulation without visible drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate (east-west axis)
    pub x: f64,
    /// Y coordinate (vertical axis)
    pub y: f64,
    /// Z coordinate (north-south axis)
    pub z: f64,
}

impl Vec3 {
    /// Creates a new vector with the specified coordinates.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns this vector offset by the given deltas.
    pub fn add(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Calculates the Euclidean distance to another vector.
    pub fn distance(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Creates a zero vector (0, 0, 0).
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::zero()
    }
}

/// Integer block coordinates in the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    /// Creates a new block position.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the block position containing the given world position.
    pub fn containing(pos: Vec3) -> Self {
        Self::new(
            pos.x.floor() as i32,
            pos.y.floor() as i32,
            pos.z.floor() as i32,
        )
    }

    /// Returns the center of this block as a world position.
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z as f64 + 0.5)
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Enumeration of entity kinds the simulated world can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Fused explosive mob; primes on ignition and explodes when the fuse
    /// burns down.
    Creeper,
    /// Passive mob with no special behavior, useful as a control subject.
    Pig,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Creeper => write!(f, "creeper"),
            EntityKind::Pig => write!(f, "pig"),
        }
    }
}

/// Enumeration of item types a scripted test can place in the player's hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// Spawns an entity of the carried kind when used on a block.
    SpawnEgg(EntityKind),
    /// Ignites fused explosives (and blocks) when used.
    FlintAndSteel,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemType::SpawnEgg(kind) => write!(f, "spawn_egg[{kind}]"),
            ItemType::FlintAndSteel => write!(f, "flint_and_steel"),
        }
    }
}

/// A stack of items held in an inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// The kind of item in the stack
    pub item_type: ItemType,
    /// Number of items in the stack
    pub quantity: u32,
}

impl ItemStack {
    /// Creates a stack of the given item type and quantity.
    pub fn of(item_type: ItemType, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }
}

/// Enumeration of block types the simulated world tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Air,
    Dirt,
    Stone,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockType::Air => write!(f, "air"),
            BlockType::Dirt => write!(f, "dirt"),
            BlockType::Stone => write!(f, "stone"),
        }
    }
}

/// Player game mode.
///
/// Only the modes the harness scenarios exercise are modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Survival,
    Creative,
}

impl Default for GameMode {
    fn default() -> Self {
        Self::Survival
    }
}

/// Opaque token identifying the owner of a group of event subscriptions.
///
/// Every subscription is registered under an owner; revoking the owner
/// revokes all of its live subscriptions at once. The harness allocates one
/// owner per test case so listeners cannot leak across cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerOwner(pub Uuid);

impl ListenerOwner {
    /// Creates a new unique owner token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ListenerOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
