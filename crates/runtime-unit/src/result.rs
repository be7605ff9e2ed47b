//! Aggregate result of one suite run.

use crate::error::RunError;
use crate::failure::FailureReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result delivered through a suite's future once every function has run.
///
/// `succeeded + failures == total_tests` holds by construction: the total is
/// always derived from the two parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TestCaseResultRecord", into = "TestCaseResultRecord")]
pub struct TestCaseResult {
    succeeded: usize,
    failure_reasons: Vec<FailureReason>,
}

impl TestCaseResult {
    pub fn new(succeeded: usize, failure_reasons: Vec<FailureReason>) -> Self {
        Self {
            succeeded,
            failure_reasons,
        }
    }

    /// A result with no tests at all.
    pub fn empty() -> Self {
        Self::new(0, Vec::new())
    }

    pub fn total_tests(&self) -> usize {
        self.succeeded + self.failures()
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failures(&self) -> usize {
        self.failure_reasons.len()
    }

    pub fn failure_reasons(&self) -> &[FailureReason] {
        &self.failure_reasons
    }

    pub fn all_passed(&self) -> bool {
        self.failure_reasons.is_empty()
    }

    /// Pass rate as a percentage.
    pub fn pass_rate(&self) -> f64 {
        let total = self.total_tests();
        if total == 0 {
            return 100.0;
        }
        (self.succeeded as f64 / total as f64) * 100.0
    }

    pub(crate) fn record_pass(&mut self) {
        self.succeeded += 1;
    }

    pub(crate) fn record_failure(&mut self, reason: FailureReason) {
        self.failure_reasons.push(reason);
    }
}

impl Default for TestCaseResult {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for TestCaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} passed ({:.1}%), {} failed",
            self.succeeded,
            self.total_tests(),
            self.pass_rate(),
            self.failures()
        )
    }
}

/// Wire shape of [`TestCaseResult`].
#[derive(Serialize, Deserialize)]
struct TestCaseResultRecord {
    total_tests: usize,
    succeeded: usize,
    failures: usize,
    failure_reasons: Vec<FailureReason>,
}

impl From<TestCaseResult> for TestCaseResultRecord {
    fn from(result: TestCaseResult) -> Self {
        Self {
            total_tests: result.total_tests(),
            succeeded: result.succeeded,
            failures: result.failures(),
            failure_reasons: result.failure_reasons,
        }
    }
}

impl TryFrom<TestCaseResultRecord> for TestCaseResult {
    type Error = RunError;

    fn try_from(record: TestCaseResultRecord) -> Result<Self, Self::Error> {
        if record.failures != record.failure_reasons.len()
            || record.succeeded + record.failures != record.total_tests
        {
            return Err(RunError::InconsistentResult(format!(
                "{} succeeded + {} failures != {} tests",
                record.succeeded, record.failures, record.total_tests
            )));
        }
        Ok(Self::new(record.succeeded, record.failure_reasons))
    }
}
