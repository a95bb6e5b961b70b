use crate::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn spawn_event(kind: EntityKind, player: PlayerId, item: ItemType) -> GameEvent {
    let snapshot = EntitySnapshot {
        id: EntityId::new(),
        kind,
        position: Vec3::zero(),
    };
    GameEvent::new(
        EventPayload::SpawnEntity(SpawnEntityEvent {
            entities: vec![snapshot],
        }),
        Cause::of_player(player).with_context(ContextKey::UsedItem, ContextValue::Item(item)),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn one_shot_fires_exactly_once() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();
    let invocations = Arc::new(AtomicUsize::new(0));

    let counter = invocations.clone();
    let pending = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(HandlerVerdict::Matched)
            }),
        )
        .await;
    let subscription = pending.subscription().clone();

    let egg = ItemType::SpawnEgg(EntityKind::Creeper);
    bus.emit(spawn_event(EntityKind::Creeper, player, egg)).await;
    bus.emit(spawn_event(EntityKind::Creeper, player, egg)).await;

    let event = pending.resolve().await.expect("one-shot should resolve");
    assert_eq!(event.kind(), EventKind::SpawnEntity);
    assert_eq!(subscription.state(), SubscriptionState::Fired);
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    assert_eq!(bus.active_subscription_count(EventKind::SpawnEntity), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn predicate_skip_keeps_subscription_active() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    let pending = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|event| {
                let spawn = event.as_spawn().expect("spawn payload");
                if spawn.entities.iter().any(|e| e.kind == EntityKind::Creeper) {
                    Ok(HandlerVerdict::Matched)
                } else {
                    Ok(HandlerVerdict::Skipped)
                }
            }),
        )
        .await;
    let subscription = pending.subscription().clone();

    bus.emit(spawn_event(
        EntityKind::Pig,
        player,
        ItemType::SpawnEgg(EntityKind::Pig),
    ))
    .await;
    assert_eq!(subscription.state(), SubscriptionState::Active);

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;

    let event = pending.resolve().await.expect("creeper spawn should match");
    let spawn = event.as_spawn().expect("spawn payload");
    assert_eq!(spawn.entities[0].kind, EntityKind::Creeper);
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_fails_and_reaches_terminal_state() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();

    let pending = bus
        .listen_with_timeout(
            owner,
            EventKind::BreakBlock,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
            Duration::from_millis(50),
        )
        .await;
    let subscription = pending.subscription().clone();

    let failure = pending.resolve().await.expect_err("no event was emitted");
    match failure {
        TestFailure::Timeout { kind, duration } => {
            assert_eq!(kind, EventKind::BreakBlock);
            assert_eq!(duration, Duration::from_millis(50));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(subscription.state(), SubscriptionState::TimedOut);
    assert_eq!(bus.active_subscription_count(EventKind::BreakBlock), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_waits_on_same_kind_all_fire() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    let outer = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
        )
        .await;
    let inner = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
        )
        .await;

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;

    outer.resolve().await.expect("outer wait should observe the event");
    inner.resolve().await.expect("inner wait should observe the event");
}

#[tokio::test(flavor = "multi_thread")]
async fn unregister_listeners_revokes_owner_subscriptions() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let other_owner = ListenerOwner::new();
    let player = PlayerId::new();
    let invocations = Arc::new(AtomicUsize::new(0));

    let counter = invocations.clone();
    let subscription = bus
        .listen(
            owner,
            EventKind::SpawnEntity,
            Box::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await;
    let kept = bus
        .listen(
            other_owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(())),
        )
        .await;

    assert_eq!(bus.unregister_listeners(owner), 1);
    assert_eq!(subscription.state(), SubscriptionState::Revoked);
    assert_eq!(kept.state(), SubscriptionState::Active);

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn persistent_handler_failure_is_recorded_for_owner() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    bus.listen(
        owner,
        EventKind::SpawnEntity,
        Box::new(|_event| Err(TestFailure::Assertion("entity count mismatch".into()))),
    )
    .await;

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;

    let fault = bus.take_fault(owner).expect("fault should be recorded");
    assert_eq!(fault.kind(), FailureKind::Assertion);
    assert!(bus.take_fault(owner).is_none(), "fault is taken exactly once");
}

#[tokio::test(flavor = "multi_thread")]
async fn one_shot_handler_failure_rethrows_at_the_wait() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    let pending = bus
        .listen_once(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Err(TestFailure::Assertion("wrong cause".into()))),
        )
        .await;
    let subscription = pending.subscription().clone();

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;

    let failure = pending.resolve().await.expect_err("handler failure must surface");
    assert_eq!(failure.kind(), FailureKind::Assertion);
    assert_eq!(subscription.state(), SubscriptionState::Fired);
}

#[tokio::test(flavor = "multi_thread")]
async fn terminal_states_accept_no_transition() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();

    let subscription = bus
        .listen(owner, EventKind::MoveEntity, Box::new(|_event| Ok(())))
        .await;

    assert!(subscription.revoke());
    assert_eq!(subscription.state(), SubscriptionState::Revoked);
    assert!(!subscription.revoke(), "revoking twice is a no-op");
    assert!(!subscription.mark_timed_out(), "no transition out of Revoked");
    assert_eq!(subscription.state(), SubscriptionState::Revoked);
}

#[tokio::test(flavor = "multi_thread")]
async fn firing_beats_a_racing_timeout() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    let pending = bus
        .listen_with_timeout(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
            Duration::from_secs(30),
        )
        .await;

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;

    let event = pending.resolve().await.expect("event arrived well before the bound");
    assert_eq!(event.kind(), EventKind::SpawnEntity);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_timeout_landing_mid_delivery_keeps_the_subscription_timed_out() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    // The handler parks on the delivery path so the timeout can land while a
    // matching delivery is still in flight.
    let entered = Arc::new(AtomicBool::new(false));
    let released = Arc::new(AtomicBool::new(false));

    let handler_entered = entered.clone();
    let handler_released = released.clone();
    let pending = bus
        .listen_with_timeout(
            owner,
            EventKind::SpawnEntity,
            Box::new(move |_event| {
                handler_entered.store(true, Ordering::SeqCst);
                while !handler_released.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(HandlerVerdict::Matched)
            }),
            Duration::from_secs(30),
        )
        .await;
    let subscription = pending.subscription().clone();

    let emit_bus = bus.clone();
    let emitting = tokio::spawn(async move {
        emit_bus
            .emit(spawn_event(
                EntityKind::Creeper,
                player,
                ItemType::SpawnEgg(EntityKind::Creeper),
            ))
            .await;
    });

    while !entered.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(subscription.mark_timed_out(), "the timer elapsed first");
    released.store(true, Ordering::SeqCst);
    emitting.await.expect("emit task");

    // The in-flight delivery lost the race; TimedOut is terminal and must
    // not be overwritten by Fired.
    assert_eq!(subscription.state(), SubscriptionState::TimedOut);
}

#[tokio::test(flavor = "multi_thread")]
async fn emit_sweeps_terminal_subscriptions_even_when_nothing_fires() {
    let bus = create_event_bus();
    let owner = ListenerOwner::new();
    let player = PlayerId::new();

    let pending = bus
        .listen_with_timeout(
            owner,
            EventKind::SpawnEntity,
            Box::new(|_event| Ok(HandlerVerdict::Matched)),
            Duration::from_millis(10),
        )
        .await;
    pending.resolve().await.expect_err("no event was emitted");

    // The timed-out entry lingers until the next emit of its kind.
    assert_eq!(bus.registered_subscription_count(EventKind::SpawnEntity), 1);

    bus.emit(spawn_event(
        EntityKind::Creeper,
        player,
        ItemType::SpawnEgg(EntityKind::Creeper),
    ))
    .await;
    assert_eq!(bus.registered_subscription_count(EventKind::SpawnEntity), 0);
}

#[test]
fn cancellation_flag_does_not_survive_serialization() {
    let snapshot = EntitySnapshot {
        id: EntityId::new(),
        kind: EntityKind::Creeper,
        position: Vec3::zero(),
    };
    let movement = MoveEntityEvent::new(snapshot, Vec3::zero(), Vec3::new(1.0, 0.0, 0.0));
    movement.set_cancelled(true);

    // Cancellation is a live delivery-path token, not event data.
    let json = serde_json::to_string(&movement).expect("movement should serialize");
    assert!(!json.contains("cancelled"));
    let decoded: MoveEntityEvent = serde_json::from_str(&json).expect("movement should deserialize");
    assert!(!decoded.is_cancelled());
}
