//! # Failure Taxonomy
//!
//! Every way a scripted test can fail is a variant of [`TestFailure`].
//! Failures raised inside event handlers or remote actions propagate
//! synchronously through the suspension boundary to the step that installed
//! them; nothing is swallowed silently. Each test case reports exactly one
//! terminal outcome, with the triggering failure attached for diagnosis.

use crate::events::EventKind;
use std::time::Duration;

/// Failures that can terminate a scripted test case.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TestFailure {
    /// Observed state or event did not match an expectation.
    #[error("assertion failed: {0}")]
    Assertion(String),

    /// An awaited event did not arrive before the timeout elapsed.
    #[error("timed out after {duration:?} waiting for {kind}")]
    Timeout {
        /// The event kind the wait was registered for
        kind: EventKind,
        /// The timeout bound that elapsed
        duration: Duration,
    },

    /// The remote system never confirmed that an issued action was applied.
    #[error("remote action was never acknowledged: {0}")]
    ActionAcknowledgment(String),

    /// A test declared an expected failure kind and observed none, or a
    /// different kind.
    #[error("expected failure of kind {expected:?}, got {actual:?}")]
    ExpectedFailureMismatch {
        /// The failure kind the test declared it expects
        expected: FailureKind,
        /// What was actually raised (None means the test completed normally)
        actual: Option<FailureKind>,
    },

    /// The harness or a test body reached a state it must not be in.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl TestFailure {
    /// Returns the kind tag of this failure, used for expected-failure
    /// matching.
    pub fn kind(&self) -> FailureKind {
        match self {
            TestFailure::Assertion(_) => FailureKind::Assertion,
            TestFailure::Timeout { .. } => FailureKind::Timeout,
            TestFailure::ActionAcknowledgment(_) => FailureKind::ActionAcknowledgment,
            TestFailure::ExpectedFailureMismatch { .. } => FailureKind::ExpectedFailureMismatch,
            TestFailure::IllegalState(_) => FailureKind::IllegalState,
        }
    }
}

/// Tag identifying a [`TestFailure`] variant without its detail payload.
///
/// A test case may declare that it *expects* a specific kind; the runner then
/// inverts the outcome: the case passes if and only if exactly that kind is
/// raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    Assertion,
    Timeout,
    ActionAcknowledgment,
    ExpectedFailureMismatch,
    IllegalState,
}
