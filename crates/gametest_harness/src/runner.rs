//! # Test Case Runner
//!
//! Drives scripted test cases to exactly one terminal outcome each. A case
//! passes by returning normally and fails by raising a [`TestFailure`],
//! unless it *declares* an expected failure kind, in which case the outcome
//! inverts: the case passes if and only if exactly that kind is raised.
//!
//! Every case runs against a fresh world and bus so no state or
//! subscription survives from one case into the next; the case's listener
//! owner is revoked on every exit path.

use crate::executor::TestContext;
use futures::future::BoxFuture;
use gametest_event_system::{create_event_bus, FailureKind, TestFailure};
use gametest_world::{SimWorld, SimWorldConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

type CaseBody = Box<dyn FnOnce(TestContext) -> BoxFuture<'static, Result<(), TestFailure>> + Send>;

/// A named scripted test case.
pub struct TestCase {
    name: String,
    expected_failure: Option<FailureKind>,
    body: CaseBody,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("expected_failure", &self.expected_failure)
            .finish()
    }
}

impl TestCase {
    /// Creates a case that passes by normal return.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(TestContext) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        Self {
            name: name.into(),
            expected_failure: None,
            body: Box::new(move |ctx| Box::pin(body(ctx))),
        }
    }

    /// Creates a case that passes if and only if a failure of exactly
    /// `expected` is raised.
    pub fn expecting<F, Fut>(name: impl Into<String>, expected: FailureKind, body: F) -> Self
    where
        F: FnOnce(TestContext) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<(), TestFailure>> + Send + 'static,
    {
        Self {
            name: name.into(),
            expected_failure: Some(expected),
            body: Box::new(move |ctx| Box::pin(body(ctx))),
        }
    }

    /// Name of the case.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Terminal outcome of one case.
#[derive(Debug, Clone, Serialize)]
pub enum Outcome {
    Passed,
    Failed(String),
}

/// Outcome of one case with its name attached.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub outcome: Outcome,
}

impl CaseResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }
}

/// Aggregated outcomes of a suite run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SuiteReport {
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    /// Number of passed cases.
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Number of failed cases.
    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// True when every case passed.
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

/// Executes test cases sequentially, one fresh world per case.
#[derive(Debug, Clone)]
pub struct TestRunner {
    world_config: SimWorldConfig,
    default_wait_timeout: Option<Duration>,
}

impl TestRunner {
    /// Creates a runner whose cases run against worlds built from `config`.
    pub fn new(world_config: SimWorldConfig) -> Self {
        Self {
            world_config,
            default_wait_timeout: None,
        }
    }

    /// Sets the fallback timeout for waits that do not specify their own.
    pub fn with_default_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_wait_timeout = timeout;
        self
    }

    /// Runs one case to its terminal outcome.
    pub async fn run_case(&self, case: TestCase) -> CaseResult {
        let name = case.name.clone();
        info!("▶️ Running test case '{}'", name);

        let bus = create_event_bus();
        let world = Arc::new(SimWorld::spawn(bus.clone(), self.world_config.clone()));
        let ctx = TestContext::new(bus.clone(), world)
            .with_default_wait_timeout(self.default_wait_timeout);
        let owner = ctx.owner();

        let mut raised = (case.body)(ctx).await.err();
        // A listener fault the body never observed still fails the case.
        if raised.is_none() {
            raised = bus.take_fault(owner);
        }
        bus.unregister_listeners(owner);

        let outcome = match (case.expected_failure, raised) {
            (None, None) => Outcome::Passed,
            (None, Some(failure)) => Outcome::Failed(failure.to_string()),
            (Some(expected), Some(failure)) if failure.kind() == expected => Outcome::Passed,
            (Some(expected), raised) => Outcome::Failed(
                TestFailure::ExpectedFailureMismatch {
                    expected,
                    actual: raised.map(|f| f.kind()),
                }
                .to_string(),
            ),
        };

        match &outcome {
            Outcome::Passed => info!("✅ Test case '{}' passed", name),
            Outcome::Failed(detail) => error!("❌ Test case '{}' failed: {}", name, detail),
        }
        CaseResult { name, outcome }
    }

    /// Runs cases sequentially and aggregates their outcomes.
    pub async fn run_suite(&self, cases: Vec<TestCase>) -> SuiteReport {
        let total = cases.len();
        let mut report = SuiteReport::default();
        for case in cases {
            let result = self.run_case(case).await;
            report.results.push(result);
        }
        info!(
            "🏁 Suite finished: {}/{} passed, {} failed",
            report.passed(),
            total,
            report.failed()
        );
        report
    }
}
