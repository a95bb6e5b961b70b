//! Runner and executor tests, driven through the real world simulation.

use crate::runner::{Outcome, TestCase, TestRunner};
use crate::scenarios::builtin_suite;
use gametest_event_system::{
    EventKind, EventPayload, FailureKind, HandlerVerdict, ItemStack, ItemType, TestFailure,
};
use gametest_world::SimWorldConfig;
use std::time::Duration;

fn fast_config() -> SimWorldConfig {
    SimWorldConfig {
        inventory_propagation_ms: 10,
        action_ack_timeout_ms: 500,
        creeper_fuse_ms: 150,
        blast_radius: 1,
        move_attempt_interval_ms: 30,
    }
}

fn fast_runner() -> TestRunner {
    TestRunner::new(fast_config())
}

#[tokio::test(flavor = "multi_thread")]
async fn builtin_suite_passes_end_to_end() {
    let report = fast_runner().run_suite(builtin_suite()).await;

    assert!(
        report.all_passed(),
        "suite had failures: {:?}",
        report.results
    );
    assert_eq!(report.passed(), 3);
    assert_eq!(report.failed(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn a_body_returning_normally_passes() {
    let case = TestCase::new("trivial", |_ctx| async { Ok(()) });
    let result = fast_runner().run_case(case).await;

    assert!(result.passed());
    assert_eq!(result.name, "trivial");
}

#[tokio::test(flavor = "multi_thread")]
async fn a_raised_failure_fails_the_case_with_its_detail() {
    let case = TestCase::new("broken", |_ctx| async {
        Err(TestFailure::Assertion("creeper was a pig".into()))
    });
    let result = fast_runner().run_case(case).await;

    let Outcome::Failed(detail) = &result.outcome else {
        panic!("expected a failed outcome, got {:?}", result.outcome);
    };
    assert!(detail.contains("creeper was a pig"));
}

#[tokio::test(flavor = "multi_thread")]
async fn an_expecting_case_fails_when_no_failure_is_raised() {
    let case = TestCase::expecting("too_healthy", FailureKind::IllegalState, |_ctx| async {
        Ok(())
    });
    let result = fast_runner().run_case(case).await;

    let Outcome::Failed(detail) = &result.outcome else {
        panic!("an unraised expected failure must fail the case");
    };
    assert!(detail.contains("IllegalState"));
}

#[tokio::test(flavor = "multi_thread")]
async fn an_expecting_case_fails_on_the_wrong_failure_kind() {
    let case = TestCase::expecting("wrong_kind", FailureKind::Timeout, |_ctx| async {
        Err(TestFailure::Assertion("not a timeout".into()))
    });
    let result = fast_runner().run_case(case).await;

    assert!(
        !result.passed(),
        "a mismatched failure kind must not count as the expected one"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn a_handler_failure_surfaces_at_the_next_suspension_point() {
    // The persistent listener raises on the delivery path; the body itself
    // never returns an error. The wait after the write must rethrow it.
    let case = TestCase::new("listener_fault", |ctx| async move {
        ctx.listen(
            EventKind::InventoryChange,
            Box::new(|_event| Err(TestFailure::Assertion("listener rejected the slot".into()))),
        )
        .await;

        let player = ctx.player();
        player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));
        ctx.wait_for_inventory_propagation().await?;
        Ok(())
    });
    let result = fast_runner().run_case(case).await;

    let Outcome::Failed(detail) = &result.outcome else {
        panic!("a listener fault must fail the case");
    };
    assert!(detail.contains("listener rejected the slot"));
}

#[tokio::test(flavor = "multi_thread")]
async fn an_unobserved_listener_fault_still_fails_the_case() {
    // The body ends before any suspension point can rethrow the fault; the
    // runner's final sweep must pick it up.
    let case = TestCase::new("silent_fault", |ctx| async move {
        ctx.listen(
            EventKind::InventoryChange,
            Box::new(|_event| Err(TestFailure::Assertion("never checked".into()))),
        )
        .await;

        let player = ctx.player();
        player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));
        // Let propagation deliver the event without a checkpoint afterwards.
        ctx.world().await_inventory_propagation().await;
        Ok(())
    });
    let result = fast_runner().run_case(case).await;

    assert!(!result.passed());
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_for_returns_the_matching_event() {
    let case = TestCase::new("observe_inventory", |ctx| async move {
        let player = ctx.player();
        player.select_hotbar_slot(3)?;
        player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));

        let event = ctx
            .wait_for(
                EventKind::InventoryChange,
                |_event| true,
                Some(Duration::from_secs(1)),
            )
            .await?;
        crate::assert_eq_that(event.kind(), EventKind::InventoryChange, "event kind")
    });
    let result = fast_runner().run_case(case).await;

    assert!(result.passed(), "got {:?}", result.outcome);
}

#[tokio::test(flavor = "multi_thread")]
async fn a_one_shot_handler_failure_fails_the_case() {
    let case = TestCase::new("handler_assertion", |ctx| async move {
        let player = ctx.player();
        player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));

        ctx.listen_timeout_around(
            async { Ok(()) },
            EventKind::InventoryChange,
            |_event| Err(TestFailure::Assertion("slot content was wrong".into())),
            Duration::from_secs(1),
        )
        .await?;
        Ok(())
    });
    let result = fast_runner().run_case(case).await;

    let Outcome::Failed(detail) = &result.outcome else {
        panic!("a one-shot handler failure must fail the case");
    };
    assert!(detail.contains("slot content was wrong"));
}

#[tokio::test(flavor = "multi_thread")]
async fn skipped_verdicts_keep_the_wait_suspended_until_a_match() {
    let case = TestCase::new("selective_wait", |ctx| async move {
        let player = ctx.player();
        player.select_hotbar_slot(0)?;
        player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));
        player.select_hotbar_slot(5)?;
        player.set_item_in_hand(ItemStack::of(ItemType::FlintAndSteel, 1));

        // Only the write to slot 5 may complete the wait.
        let event = ctx
            .listen_timeout_around(
                async { Ok(()) },
                EventKind::InventoryChange,
                |event| match &event.payload {
                    EventPayload::InventoryChange(change) if change.slot == 5 => {
                        Ok(HandlerVerdict::Matched)
                    }
                    _ => Ok(HandlerVerdict::Skipped),
                },
                Duration::from_secs(1),
            )
            .await?;

        match &event.payload {
            EventPayload::InventoryChange(change) => {
                crate::assert_eq_that(change.slot, 5, "completed slot")
            }
            _ => Err(TestFailure::IllegalState("wrong payload kind".into())),
        }
    });
    let result = fast_runner().run_case(case).await;

    assert!(result.passed(), "got {:?}", result.outcome);
}
