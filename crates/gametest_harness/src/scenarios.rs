//! # Built-in Scenario Suite
//!
//! The scripted scenarios the harness ships with: a full multi-step
//! interaction against the simulated world (spawn a creeper from an egg,
//! pin it in place, prime it, and assert the fuse-bounded block damage) and
//! an expected-failure case demonstrating outcome inversion.

use crate::assert::{assert_eq_that, assert_that};
use crate::executor::TestContext;
use crate::runner::TestCase;
use gametest_event_system::{
    BlockType, EntityKind, EntitySnapshot, EventKind, FailureKind, GameMode, HandlerVerdict,
    ItemStack, ItemType, TestFailure,
};
use gametest_world::LookTarget;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builds the scenario suite.
pub fn builtin_suite() -> Vec<TestCase> {
    vec![
        TestCase::new("explode_creeper", explode_creeper),
        TestCase::expecting(
            "expected_failure",
            FailureKind::IllegalState,
            expected_failure,
        ),
        TestCase::expecting(
            "break_without_prime_times_out",
            FailureKind::Timeout,
            break_without_prime_times_out,
        ),
    ]
}

/// Spawns a creeper from a spawn egg, pins it, primes it with flint and
/// steel, and verifies the explosion breaks blocks within the captured fuse
/// duration.
async fn explode_creeper(ctx: TestContext) -> Result<(), TestFailure> {
    let player = ctx.player();
    player.set_game_mode(GameMode::Creative);

    let egg = ItemType::SpawnEgg(EntityKind::Creeper);
    player.select_hotbar_slot(0)?;
    player.set_item_in_hand(ItemStack::of(egg, 1));
    ctx.wait_for_inventory_propagation().await?;

    let target = player.position().add(0.0, -1.0, 2.0);
    ctx.look_at(LookTarget::Position(target)).await?;

    // The spawn races the click acknowledgment, so the subscription goes in
    // before the trigger.
    let captured: Arc<Mutex<Option<EntitySnapshot>>> = Arc::new(Mutex::new(None));
    let capture = captured.clone();
    let player_id = player.id();
    ctx.listen_one_shot_around(ctx.right_click(), EventKind::SpawnEntity, move |event| {
        let Some(spawn) = event.as_spawn() else {
            return Ok(HandlerVerdict::Skipped);
        };
        if !spawn.entities.iter().any(|e| e.kind == EntityKind::Creeper) {
            return Ok(HandlerVerdict::Skipped);
        }
        assert_eq_that(spawn.entities.len(), 1, "spawned entity count")?;
        assert_that(
            event.cause.contains_player(player_id),
            format!("cause doesn't contain player: {}", event.cause),
        )?;
        assert_that(
            event.cause.used_item() == Some(egg),
            format!("cause doesn't contain correct item: {}", event.cause),
        )?;
        *capture.lock().expect("capture lock poisoned") = Some(spawn.entities[0]);
        Ok(HandlerVerdict::Matched)
    })
    .await?;

    let creeper = captured
        .lock()
        .expect("capture lock poisoned")
        .take()
        .ok_or_else(|| TestFailure::Assertion("Creeper did not spawn!".into()))?;

    // Keep the creeper where it spawned: cancel every move it attempts.
    let pinned = creeper.id;
    ctx.listen(
        EventKind::MoveEntity,
        Box::new(move |event| {
            if let Some(movement) = event.as_move() {
                if movement.entity.id == pinned {
                    movement.set_cancelled(true);
                }
            }
            Ok(())
        }),
    )
    .await;

    player.select_hotbar_slot(1)?;
    player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));
    ctx.wait_for_inventory_propagation().await?;
    ctx.look_at(LookTarget::Entity(creeper.id)).await?;

    // Capture the fuse duration on the delivery path; a later step uses it
    // as its timeout bound.
    let fuse: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));
    let fuse_capture = fuse.clone();
    ctx.listen_one_shot_around(ctx.right_click(), EventKind::PrimeExplosive, move |event| {
        let Some(prime) = event.as_prime() else {
            return Ok(HandlerVerdict::Skipped);
        };
        assert_eq_that(prime.entity.id, pinned, "primed entity")?;
        *fuse_capture.lock().expect("fuse lock poisoned") = Some(prime.fuse_duration_ms);
        Ok(HandlerVerdict::Matched)
    })
    .await?;

    let fuse_duration = fuse
        .lock()
        .expect("fuse lock poisoned")
        .take()
        .ok_or_else(|| TestFailure::Assertion("fuse duration was not captured".into()))?;

    // Blocks must break once the fuse burns down, and not a fuse later.
    let owner_id = player.id();
    ctx.listen_timeout_around(
        ctx.right_click(),
        EventKind::BreakBlock,
        move |event| {
            let Some(broke) = event.as_break() else {
                return Ok(HandlerVerdict::Skipped);
            };
            assert_that(
                event.cause.owner() == Some(owner_id),
                format!("break is not owned by the igniter: {}", event.cause),
            )?;
            assert_that(!broke.transactions.is_empty(), "explosion broke no blocks")?;
            for transaction in &broke.transactions {
                assert_eq_that(transaction.final_state, BlockType::Air, "resulting block")?;
            }
            Ok(HandlerVerdict::Matched)
        },
        Duration::from_millis(fuse_duration),
    )
    .await?;

    Ok(())
}

/// Raises immediately; the declared expectation turns the failure into a
/// pass.
async fn expected_failure(_ctx: TestContext) -> Result<(), TestFailure> {
    Err(TestFailure::IllegalState("This should be caught!".into()))
}

/// Waits for block damage that never comes; passes because the case expects
/// the timeout.
async fn break_without_prime_times_out(ctx: TestContext) -> Result<(), TestFailure> {
    ctx.wait_for(
        EventKind::BreakBlock,
        |_event| true,
        Some(Duration::from_millis(100)),
    )
    .await?;
    Ok(())
}
