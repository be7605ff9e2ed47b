//! Run-level report aggregated from suite results.

use crate::result::TestCaseResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Result of one completed suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    pub name: String,
    pub result: TestCaseResult,
}

/// Totals across every completed suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Completed suites.
    pub suites: usize,
    /// Suites skipped for lack of a participant.
    pub skipped: usize,
    pub total_tests: usize,
    pub succeeded: usize,
    pub failures: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[SuiteOutcome], skipped: usize) -> Self {
        let total_tests = outcomes.iter().map(|o| o.result.total_tests()).sum();
        let succeeded = outcomes.iter().map(|o| o.result.succeeded()).sum();
        let failures = outcomes.iter().map(|o| o.result.failures()).sum();
        Self {
            suites: outcomes.len(),
            skipped,
            total_tests,
            succeeded,
            failures,
        }
    }

    /// Pass rate as a percentage.
    pub fn pass_rate(&self) -> f64 {
        if self.total_tests == 0 {
            return 100.0;
        }
        (self.succeeded as f64 / self.total_tests as f64) * 100.0
    }
}

/// Snapshot of a run, suitable for printing or exporting as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub suites: Vec<SuiteOutcome>,
    pub skipped: Vec<String>,
    /// Suites that had not completed when the report was taken.
    pub in_flight: Vec<String>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(suites: Vec<SuiteOutcome>, skipped: Vec<String>, in_flight: Vec<String>) -> Self {
        let summary = RunSummary::from_outcomes(&suites, skipped.len());
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            suites,
            skipped,
            in_flight,
            summary,
        }
    }

    /// Every completed test passed and no suite is still running.
    pub fn all_passed(&self) -> bool {
        self.summary.failures == 0 && self.in_flight.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f, "|   Runtime Unit Report                           |")?;
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(
            f,
            "| Tests: {:3}  Passed: {:3}  Failed: {:3}  ({:5.1}%)  |",
            self.summary.total_tests,
            self.summary.succeeded,
            self.summary.failures,
            self.summary.pass_rate(),
        )?;
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f)?;

        for outcome in &self.suites {
            let icon = if outcome.result.all_passed() { "+" } else { "!" };
            writeln!(f, "  [{}] {} {}", icon, outcome.name, outcome.result)?;
            for reason in outcome.result.failure_reasons() {
                writeln!(f, "      [x] {}", reason)?;
            }
        }
        for name in &self.skipped {
            writeln!(f, "  [-] {} skipped", name)?;
        }
        for name in &self.in_flight {
            writeln!(f, "  [~] {} still running", name)?;
        }

        writeln!(f)?;
        if self.all_passed() {
            writeln!(f, "  ALL TESTS PASSED (run {})", self.run_id)?;
        } else {
            writeln!(f, "  {} TEST(S) FAILED (run {})", self.summary.failures, self.run_id)?;
        }
        Ok(())
    }
}
