//! Assertion helpers that fail by returning a [`TestFailure`] instead of
//! panicking, so failures raised inside event handlers can be carried
//! through the suspension boundary to the step that installed them.

use gametest_event_system::TestFailure;
use std::fmt::Debug;

/// Fails with [`TestFailure::Assertion`] unless `condition` holds.
pub fn assert_that(condition: bool, message: impl Into<String>) -> Result<(), TestFailure> {
    if condition {
        Ok(())
    } else {
        Err(TestFailure::Assertion(message.into()))
    }
}

/// Fails with [`TestFailure::Assertion`] unless `actual == expected`,
/// attaching both values for diagnosis.
pub fn assert_eq_that<T: PartialEq + Debug>(
    actual: T,
    expected: T,
    context: &str,
) -> Result<(), TestFailure> {
    if actual == expected {
        Ok(())
    } else {
        Err(TestFailure::Assertion(format!(
            "{context}: expected {expected:?}, got {actual:?}"
        )))
    }
}
