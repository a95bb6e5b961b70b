//! # Gametest Harness
//!
//! Scripted in-game integration tests as suspendable async bodies. A test
//! case drives the simulated world through a [`TestContext`] (remote
//! actions, accessor reads, event waits), and the [`TestRunner`] executes
//! each case against a fresh world to exactly one terminal outcome.
//!
//! A case can *declare* an expected failure kind; the runner then inverts
//! the outcome: the case passes if and only if exactly that kind is raised.
//!
//! The crate ships a built-in scenario suite ([`builtin_suite`]) exercising
//! the full action/event/cause surface end to end.

pub mod assert;
pub mod executor;
pub mod runner;
pub mod scenarios;

#[cfg(test)]
mod tests;

pub use assert::{assert_eq_that, assert_that};
pub use executor::TestContext;
pub use runner::{CaseResult, Outcome, SuiteReport, TestCase, TestRunner};
pub use scenarios::builtin_suite;

// Re-exported so test authors only need this crate in scope.
pub use gametest_event_system::{
    Cause, CauseActor, ContextKey, ContextValue, EventKind, FailureKind, GameEvent, HandlerVerdict,
    TestFailure,
};
pub use gametest_world::{LookTarget, SimWorldConfig};
