use crate::client::RemoteClient;
use crate::state::LookTarget;
use crate::{SimWorld, SimWorldConfig};
use gametest_event_system::{
    create_event_bus, EntityKind, EventBus, EventKind, GameMode, HandlerVerdict, ItemStack,
    ItemType, ListenerOwner, TestFailure,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn fast_config() -> SimWorldConfig {
    SimWorldConfig {
        inventory_propagation_ms: 10,
        action_ack_timeout_ms: 1000,
        creeper_fuse_ms: 150,
        blast_radius: 2,
        move_attempt_interval_ms: 20,
    }
}

fn world_with_bus(config: SimWorldConfig) -> (SimWorld, Arc<EventBus>) {
    let bus = create_event_bus();
    let world = SimWorld::spawn(bus.clone(), config);
    (world, bus)
}

async fn give_item(world: &SimWorld, slot: usize, stack: ItemStack) {
    let player = world.player();
    player.select_hotbar_slot(slot).expect("slot in range");
    player.set_item_in_hand(stack);
    world.await_inventory_propagation().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn spawn_egg_click_spawns_the_carried_kind() {
    let (world, bus) = world_with_bus(fast_config());
    let owner = ListenerOwner::new();
    let player = world.player();
    player.set_game_mode(GameMode::Creative);

    let egg = ItemType::SpawnEgg(EntityKind::Creeper);
    give_item(&world, 0, ItemStack::of(egg, 1)).await;

    let target = player.position().add(0.0, -1.0, 2.0);
    let client = world.client();
    client.look_at(LookTarget::Position(target)).await.expect("look ack");

    let pending = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
        )
        .await;
    client.right_click().await.expect("click ack");

    let event = pending.resolve().await.expect("spawn event");
    let spawn = event.as_spawn().expect("spawn payload");
    assert_eq!(spawn.entities.len(), 1);
    assert_eq!(spawn.entities[0].kind, EntityKind::Creeper);
    assert!(event.cause.contains_player(player.id()));
    assert_eq!(event.cause.used_item(), Some(egg));
    assert_eq!(world.entities_of_kind(EntityKind::Creeper).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn actions_are_processed_in_issuance_order() {
    let (world, _bus) = world_with_bus(fast_config());
    let player = world.player();
    let egg = ItemType::SpawnEgg(EntityKind::Pig);
    give_item(&world, 0, ItemStack::of(egg, 64)).await;

    let client = world.client();
    let first = player.position().add(0.0, -1.0, 2.0);
    let second = player.position().add(3.0, -1.0, 2.0);

    // A precondition of the second click is the look state written by the
    // action issued before it.
    client.look_at(LookTarget::Position(first)).await.expect("look ack");
    client.right_click().await.expect("click ack");
    client.look_at(LookTarget::Position(second)).await.expect("look ack");
    client.right_click().await.expect("click ack");

    let pigs = world.entities_of_kind(EntityKind::Pig);
    assert_eq!(pigs.len(), 2);
    let positions: Vec<_> = pigs.iter().map(|p| p.position).collect();
    assert!(positions.contains(&first));
    assert!(positions.contains(&second));
}

#[tokio::test(flavor = "multi_thread")]
async fn inventory_write_is_invisible_until_propagated() {
    let mut config = fast_config();
    config.inventory_propagation_ms = 300;
    let (world, _bus) = world_with_bus(config);
    let player = world.player();
    let client = world.client();

    client
        .look_at(LookTarget::Position(player.position().add(0.0, -1.0, 2.0)))
        .await
        .expect("look ack");

    player.select_hotbar_slot(0).expect("slot in range");
    player.set_item_in_hand(ItemStack::of(ItemType::SpawnEgg(EntityKind::Creeper), 1));

    // Accessor sees the write immediately, the remote side does not yet.
    assert!(player.item_in_hand().is_some());
    client.right_click().await.expect("click ack");
    assert!(world.entities_of_kind(EntityKind::Creeper).is_empty());

    world.await_inventory_propagation().await;
    client.right_click().await.expect("click ack");
    assert_eq!(world.entities_of_kind(EntityKind::Creeper).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unacknowledged_action_fails_with_ack_failure() {
    // A worker that never replies: the envelope is received and dropped.
    let (tx, mut rx) = mpsc::channel::<crate::client::CommandEnvelope>(4);
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            drop(envelope);
        }
    });
    let client = RemoteClient::new(tx, Duration::from_millis(50));

    let failure = client.right_click().await.expect_err("no ack should arrive");
    assert!(matches!(failure, TestFailure::ActionAcknowledgment(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn action_against_a_dead_world_fails_fast() {
    let (tx, rx) = mpsc::channel(4);
    drop(rx);
    let client = RemoteClient::new(tx, Duration::from_millis(50));

    let failure = client.right_click().await.expect_err("worker is gone");
    assert!(matches!(failure, TestFailure::ActionAcknowledgment(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn priming_burns_the_fuse_and_breaks_blocks() {
    let (world, bus) = world_with_bus(fast_config());
    let owner = ListenerOwner::new();
    let player = world.player();
    let client = world.client();

    give_item(
        &world,
        0,
        ItemStack::of(ItemType::SpawnEgg(EntityKind::Creeper), 1),
    )
    .await;
    client
        .look_at(LookTarget::Position(player.position().add(0.0, -1.0, 2.0)))
        .await
        .expect("look ack");
    let pending_spawn = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
        )
        .await;
    client.right_click().await.expect("click ack");
    let spawn = pending_spawn.resolve().await.expect("spawn event");
    let creeper = spawn.as_spawn().expect("spawn payload").entities[0];

    give_item(&world, 1, ItemStack::of(ItemType::FlintAndSteel, 1)).await;
    client
        .look_at(LookTarget::Entity(creeper.id))
        .await
        .expect("look ack");

    let pending_prime = bus
        .listen_once(
            owner,
            EventKind::PrimeExplosive,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
        )
        .await;
    let pending_break = bus
        .listen_with_timeout(
            owner,
            EventKind::BreakBlock,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
            Duration::from_millis(fast_config().creeper_fuse_ms + 500),
        )
        .await;
    client.right_click().await.expect("click ack");

    let prime = pending_prime.resolve().await.expect("prime event");
    let prime_payload = prime.as_prime().expect("prime payload");
    assert_eq!(prime_payload.entity.id, creeper.id);
    assert_eq!(prime_payload.fuse_duration_ms, fast_config().creeper_fuse_ms);
    assert_eq!(
        world.fuse_duration_ms(creeper.id),
        Some(fast_config().creeper_fuse_ms)
    );

    let broke = pending_break.resolve().await.expect("break event");
    let break_payload = broke.as_break().expect("break payload");
    assert!(!break_payload.transactions.is_empty());
    for transaction in &break_payload.transactions {
        assert_eq!(
            transaction.final_state,
            gametest_event_system::BlockType::Air
        );
        assert_eq!(world.block_at(transaction.position), gametest_event_system::BlockType::Air);
    }
    assert_eq!(broke.cause.owner(), Some(player.id()));
    assert!(world.entity(creeper.id).is_none(), "explosive is gone after detonation");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_movement_keeps_a_primed_explosive_in_place() {
    let mut config = fast_config();
    config.creeper_fuse_ms = 400;
    let (world, bus) = world_with_bus(config);
    let owner = ListenerOwner::new();
    let player = world.player();
    let client = world.client();

    give_item(
        &world,
        0,
        ItemStack::of(ItemType::SpawnEgg(EntityKind::Creeper), 1),
    )
    .await;
    client
        .look_at(LookTarget::Position(player.position().add(0.0, -1.0, 2.0)))
        .await
        .expect("look ack");
    let pending_spawn = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
        )
        .await;
    client.right_click().await.expect("click ack");
    let creeper = pending_spawn
        .resolve()
        .await
        .expect("spawn event")
        .as_spawn()
        .expect("spawn payload")
        .entities[0];

    // Pin the creeper by cancelling every movement it attempts.
    let pinned = creeper.id;
    bus.listen(
        owner,
        EventKind::MoveEntity,
        Box::new(move |event| {
            let movement = event.as_move().expect("move payload");
            if movement.entity.id == pinned {
                movement.set_cancelled(true);
            }
            Ok(())
        }),
    )
    .await;

    give_item(&world, 1, ItemStack::of(ItemType::FlintAndSteel, 1)).await;
    client.look_at(LookTarget::Entity(creeper.id)).await.expect("look ack");
    client.right_click().await.expect("click ack");

    // Let several flee attempts happen while the fuse burns.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let entity = world.entity(creeper.id).expect("still fused");
    assert_eq!(entity.position, creeper.position);
}
