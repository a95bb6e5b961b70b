//! # Simulated World
//!
//! [`SimWorld`] plays the role of the remote game: it owns the world state,
//! consumes client commands strictly in issuance order, and delivers the
//! asynchronous consequences (entity spawns, fuse burn-downs, block breaks,
//! inventory propagation) to an [`EventSink`] on its own schedule.
//!
//! From the harness's point of view the world is an uncontrolled execution
//! context: the script only reaches it through the command channel, the
//! accessor surface, and the events it emits.

use crate::client::{ClientCommand, CommandEnvelope, RemoteClient};
use crate::player::PlayerHandle;
use crate::state::{EntityState, LookTarget, WorldState};
use gametest_event_system::{
    BlockPos, BlockTransaction, BlockType, BreakBlockEvent, Cause, CauseActor, ContextKey,
    ContextValue, EntityId, EntityKind, EntitySnapshot, EventPayload, EventSink, GameEvent,
    InventoryChangeEvent, ItemType, MoveEntityEvent, PlayerId, PrimeExplosiveEvent,
    SpawnEntityEvent, TestFailure,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

fn default_inventory_propagation_ms() -> u64 {
    50
}
fn default_action_ack_timeout_ms() -> u64 {
    2000
}
fn default_creeper_fuse_ms() -> u64 {
    1500
}
fn default_blast_radius() -> i32 {
    2
}
fn default_move_attempt_interval_ms() -> u64 {
    200
}

/// Tunable timings and radii of the simulated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimWorldConfig {
    /// Delay before an inventory write becomes visible to the remote side
    #[serde(default = "default_inventory_propagation_ms")]
    pub inventory_propagation_ms: u64,
    /// Bound on waiting for a client action acknowledgment
    #[serde(default = "default_action_ack_timeout_ms")]
    pub action_ack_timeout_ms: u64,
    /// Fuse length assigned to freshly spawned creepers
    #[serde(default = "default_creeper_fuse_ms")]
    pub creeper_fuse_ms: u64,
    /// Block radius affected by an explosion
    #[serde(default = "default_blast_radius")]
    pub blast_radius: i32,
    /// Interval between flee attempts of a primed explosive
    #[serde(default = "default_move_attempt_interval_ms")]
    pub move_attempt_interval_ms: u64,
}

impl Default for SimWorldConfig {
    fn default() -> Self {
        Self {
            inventory_propagation_ms: default_inventory_propagation_ms(),
            action_ack_timeout_ms: default_action_ack_timeout_ms(),
            creeper_fuse_ms: default_creeper_fuse_ms(),
            blast_radius: default_blast_radius(),
            move_attempt_interval_ms: default_move_attempt_interval_ms(),
        }
    }
}

/// State, sink, and config shared by the world's tasks.
pub(crate) struct WorldCore {
    pub state: RwLock<WorldState>,
    pub sink: Arc<dyn EventSink>,
    pub config: SimWorldConfig,
}

impl WorldCore {
    /// Locks the state for a short, await-free section.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut WorldState) -> R) -> R {
        let mut state = self.state.write().expect("world state lock poisoned");
        f(&mut state)
    }

    pub fn read_state<R>(&self, f: impl FnOnce(&WorldState) -> R) -> R {
        let state = self.state.read().expect("world state lock poisoned");
        f(&state)
    }
}

/// The simulated remote game.
pub struct SimWorld {
    core: Arc<WorldCore>,
    command_tx: mpsc::Sender<CommandEnvelope>,
}

impl std::fmt::Debug for SimWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimWorld")
            .field("config", &self.core.config)
            .finish()
    }
}

impl SimWorld {
    /// Creates a world and spawns its command worker.
    pub fn spawn(sink: Arc<dyn EventSink>, config: SimWorldConfig) -> Self {
        let core = Arc::new(WorldCore {
            state: RwLock::new(WorldState::default()),
            sink,
            config,
        });
        let (command_tx, command_rx) = mpsc::channel(64);
        tokio::spawn(run_command_worker(core.clone(), command_rx));
        info!("🌍 Simulated world started");
        Self { core, command_tx }
    }

    /// Returns a proxy for issuing remote client actions.
    pub fn client(&self) -> RemoteClient {
        RemoteClient::new(
            self.command_tx.clone(),
            Duration::from_millis(self.core.config.action_ack_timeout_ms),
        )
    }

    /// Returns the accessor surface for the simulated player.
    pub fn player(&self) -> PlayerHandle {
        PlayerHandle::new(self.core.clone())
    }

    /// ID of the simulated player.
    pub fn player_id(&self) -> PlayerId {
        self.core.read_state(|state| state.player.id)
    }

    /// Last-known snapshot of an entity.
    pub fn entity(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.core
            .read_state(|state| state.entities.get(&id).map(EntityState::snapshot))
    }

    /// Snapshots of all entities of a kind.
    pub fn entities_of_kind(&self, kind: EntityKind) -> Vec<EntitySnapshot> {
        self.core.read_state(|state| {
            state
                .entities
                .values()
                .filter(|e| e.kind == kind)
                .map(EntityState::snapshot)
                .collect()
        })
    }

    /// Fuse duration of a fused explosive, in milliseconds.
    pub fn fuse_duration_ms(&self, id: EntityId) -> Option<u64> {
        self.core
            .read_state(|state| state.entities.get(&id).and_then(|e| e.fuse_duration_ms))
    }

    /// Block at a position, at the moment of the call.
    pub fn block_at(&self, pos: BlockPos) -> BlockType {
        self.core.read_state(|state| state.block_at(pos))
    }

    /// True while an inventory write is still propagating to the remote side.
    pub fn has_pending_inventory(&self) -> bool {
        self.core
            .read_state(|state| !state.player.pending_slots.is_empty())
    }

    /// Suspends until all pending inventory writes have propagated.
    pub async fn await_inventory_propagation(&self) {
        while self.has_pending_inventory() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

async fn run_command_worker(core: Arc<WorldCore>, mut rx: mpsc::Receiver<CommandEnvelope>) {
    while let Some(envelope) = rx.recv().await {
        let result = apply_command(&core, envelope.command).await;
        if envelope.ack.send(result).is_err() {
            warn!("🟡 Client went away before its {} was acknowledged", envelope.command);
        }
    }
    debug!("🌍 Command worker shutting down: all clients dropped");
}

async fn apply_command(core: &Arc<WorldCore>, command: ClientCommand) -> Result<(), TestFailure> {
    match command {
        ClientCommand::LookAt(target) => {
            core.with_state(|state| {
                if let LookTarget::Entity(id) = target {
                    if !state.entities.contains_key(&id) {
                        return Err(TestFailure::IllegalState(format!(
                            "cannot look at entity {id}: not in the world"
                        )));
                    }
                }
                state.player.look_target = Some(target);
                Ok(())
            })
        }
        ClientCommand::RightClick => {
            let events = core.with_state(|state| right_click_effects(core, state));
            for event in events {
                core.sink.deliver(event).await;
            }
            Ok(())
        }
    }
}

/// Computes the consequences of a right click against the current state.
/// Returns the events to deliver once the state lock is released.
fn right_click_effects(core: &Arc<WorldCore>, state: &mut WorldState) -> Vec<GameEvent> {
    let player_id = state.player.id;
    let held = state.player.remote_held_item();
    let target = state
        .player
        .look_target
        .and_then(|target| state.resolve_look(target).map(|pos| (target, pos)));

    let (Some(stack), Some((target, target_pos))) = (held, target) else {
        debug!("🎮 Right click with nothing to do (held: {held:?})");
        return Vec::new();
    };

    match (stack.item_type, target) {
        (ItemType::SpawnEgg(kind), _) => {
            let entity = EntityState {
                id: EntityId::new(),
                kind,
                position: target_pos,
                fuse_duration_ms: (kind == EntityKind::Creeper)
                    .then_some(core.config.creeper_fuse_ms),
                primed: false,
                igniter: None,
            };
            let snapshot = entity.snapshot();
            state.entities.insert(entity.id, entity);
            info!("🥚 Spawned {} at {:?}", kind, target_pos);
            vec![GameEvent::new(
                EventPayload::SpawnEntity(SpawnEntityEvent {
                    entities: vec![snapshot],
                }),
                Cause::of_player(player_id).with_context(
                    ContextKey::UsedItem,
                    ContextValue::Item(stack.item_type),
                ),
            )]
        }
        (ItemType::FlintAndSteel, LookTarget::Entity(id)) => {
            let Some(entity) = state.entities.get_mut(&id) else {
                return Vec::new();
            };
            let Some(fuse_ms) = entity.fuse_duration_ms else {
                debug!("🎮 Ignition attempted on non-explosive {}", entity.kind);
                return Vec::new();
            };
            if entity.primed {
                return Vec::new();
            }
            entity.primed = true;
            entity.igniter = Some(player_id);
            let snapshot = entity.snapshot();
            info!("🔥 Primed {} with a {}ms fuse", entity.kind, fuse_ms);

            tokio::spawn(run_fuse(core.clone(), id, fuse_ms));
            tokio::spawn(run_flee_attempts(core.clone(), id));

            vec![GameEvent::new(
                EventPayload::PrimeExplosive(PrimeExplosiveEvent {
                    entity: snapshot,
                    fuse_duration_ms: fuse_ms,
                }),
                Cause::of_player(player_id).with_context(
                    ContextKey::UsedItem,
                    ContextValue::Item(stack.item_type),
                ),
            )]
        }
        _ => {
            debug!("🎮 Right click with {} had no effect", stack.item_type);
            Vec::new()
        }
    }
}

/// Burns down a lit fuse, then detonates: removes the entity, turns every
/// solid block within the blast radius to air, and reports the transactions
/// with the igniter as the owning context.
async fn run_fuse(core: Arc<WorldCore>, entity_id: EntityId, fuse_ms: u64) {
    tokio::time::sleep(Duration::from_millis(fuse_ms)).await;

    let event = core.with_state(|state| {
        let entity = state.entities.remove(&entity_id)?;
        let epicenter = BlockPos::containing(entity.position);
        let radius = core.config.blast_radius;

        let mut transactions = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let pos = BlockPos::new(epicenter.x + dx, epicenter.y + dy, epicenter.z + dz);
                    let original = state.block_at(pos);
                    if original != BlockType::Air {
                        state.block_overrides.insert(pos, BlockType::Air);
                        transactions.push(BlockTransaction {
                            position: pos,
                            original,
                            final_state: BlockType::Air,
                        });
                    }
                }
            }
        }
        info!(
            "💥 {} detonated at {}: {} blocks broken",
            entity.kind,
            epicenter,
            transactions.len()
        );

        let mut cause = Cause::new().with(CauseActor::Entity(entity_id));
        if let Some(igniter) = entity.igniter {
            cause = cause.with_context(ContextKey::Owner, ContextValue::Player(igniter));
        }
        Some(GameEvent::new(
            EventPayload::BreakBlock(BreakBlockEvent { transactions }),
            cause,
        ))
    });

    if let Some(event) = event {
        core.sink.deliver(event).await;
    }
}

/// A primed explosive tries to flee. Each attempt is delivered as a
/// cancellable movement event; listeners that cancel it keep the entity in
/// place, which is how a test pins a creeper next to its victim blocks.
async fn run_flee_attempts(core: Arc<WorldCore>, entity_id: EntityId) {
    let interval = Duration::from_millis(core.config.move_attempt_interval_ms);
    loop {
        tokio::time::sleep(interval).await;

        let Some((snapshot, from, to)) = core.read_state(|state| {
            state.entities.get(&entity_id).map(|entity| {
                let from = entity.position;
                (entity.snapshot(), from, from.add(1.0, 0.0, 0.0))
            })
        }) else {
            return;
        };

        let movement = MoveEntityEvent::new(snapshot, from, to);
        let event = GameEvent::new(
            EventPayload::MoveEntity(movement.clone()),
            Cause::new().with(CauseActor::Entity(entity_id)),
        );
        core.sink.deliver(event).await;

        if movement.is_cancelled() {
            debug!("🧊 Flee attempt of {} was cancelled", entity_id);
            continue;
        }
        core.with_state(|state| {
            if let Some(entity) = state.entities.get_mut(&entity_id) {
                entity.position = to;
            }
        });
    }
}

/// Applies a pending inventory write to the remote copy after the
/// propagation delay, then reports it.
pub(crate) async fn propagate_inventory_write(core: Arc<WorldCore>, slot: usize) {
    tokio::time::sleep(Duration::from_millis(core.config.inventory_propagation_ms)).await;

    let event = core.with_state(|state| {
        state.player.remote_hotbar[slot] = state.player.hotbar[slot];
        GameEvent::new(
            EventPayload::InventoryChange(InventoryChangeEvent { slot }),
            Cause::of_player(state.player.id),
        )
    });
    core.sink.deliver(event).await;
    // The slot counts as propagated only once observers have heard about it,
    // so waiting out the propagation also waits out its delivery.
    core.with_state(|state| state.player.pending_slots.retain(|&s| s != slot));
}
