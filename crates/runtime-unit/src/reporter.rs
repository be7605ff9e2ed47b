//! Progress reporting for test runs.
//!
//! The engine talks to a [`Reporter`]; [`TracingReporter`] turns each hook
//! into a `tracing` event and mirrors the line to the bound participant, and
//! [`MemoryReporter`] records the hooks for inspection.

use crate::assertion::AssertionResult;
use crate::failure::{FailureReason, RaisedError};
use crate::participant::Participant;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::Duration;
use tracing::{error, info, warn};

/// A queued suite as announced at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteOverview {
    pub name: String,
    pub functions: usize,
}

/// Sink for run progress.
pub trait Reporter {
    fn run_started(&self, suites: &[SuiteOverview]);

    fn suite_skipped(&self, suite: &str, reason: &str);

    fn suite_started(&self, suite: &str);

    fn suite_finished(&self, suite: &str, elapsed: Duration);

    fn function_started(&self, suite: &str, function: &str);

    fn function_passed(&self, suite: &str, function: &str, elapsed: Duration);

    fn function_failed(&self, suite: &str, function: &str, elapsed: Duration, reason: &FailureReason);

    fn function_warning(&self, suite: &str, function: &str, warning: &str);

    fn raised_error(&self, suite: &str, function: &str, error: &RaisedError);

    fn assertions(&self, suite: &str, function: &str, results: &[AssertionResult]);
}

/// Milliseconds with three decimals.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}", elapsed.as_secs_f64() * 1000.0)
}

#[derive(Clone, Copy)]
enum Level {
    Info,
    Warn,
    Error,
}

/// Reporter backed by `tracing` events.
#[derive(Debug, Clone)]
pub struct TracingReporter {
    prefix: String,
    participant: Option<Participant>,
}

impl TracingReporter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            participant: None,
        }
    }

    /// Mirror every line to the participant's primary actor.
    pub fn with_participant(mut self, participant: Option<Participant>) -> Self {
        self.participant = participant;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn emit(&self, level: Level, line: &str) {
        match level {
            Level::Info => info!(prefix = %self.prefix, "{}", line),
            Level::Warn => warn!(prefix = %self.prefix, "{}", line),
            Level::Error => error!(prefix = %self.prefix, "{}", line),
        }
        if let Some(ref participant) = self.participant {
            participant.primary().send_message(line);
        }
    }
}

impl Reporter for TracingReporter {
    fn run_started(&self, suites: &[SuiteOverview]) {
        self.emit(Level::Info, &format!("Running tests ({})", suites.len()));
        for suite in suites {
            self.emit(Level::Info, &format!("- {}: {}", suite.name, suite.functions));
        }
    }

    fn suite_skipped(&self, suite: &str, reason: &str) {
        self.emit(Level::Info, &format!("[{}] Skipped: {}", suite, reason));
    }

    fn suite_started(&self, suite: &str) {
        self.emit(Level::Info, &format!("[{}] Started", suite));
    }

    fn suite_finished(&self, suite: &str, elapsed: Duration) {
        self.emit(
            Level::Info,
            &format!("[{}] Finished in {}ms", suite, format_elapsed(elapsed)),
        );
    }

    fn function_started(&self, suite: &str, function: &str) {
        self.emit(Level::Info, &format!("[{}::{}] Running", suite, function));
    }

    fn function_passed(&self, suite: &str, function: &str, elapsed: Duration) {
        self.emit(
            Level::Info,
            &format!("[{}::{}] Passed in {}ms", suite, function, format_elapsed(elapsed)),
        );
    }

    fn function_failed(&self, suite: &str, function: &str, elapsed: Duration, reason: &FailureReason) {
        self.emit(
            Level::Warn,
            &format!("[{}::{}] Failed in {}ms", suite, function, format_elapsed(elapsed)),
        );
        self.emit(
            Level::Warn,
            &format!(" - Constraint: {}", reason.constraint_description),
        );
        self.emit(Level::Warn, &format!(" - {}", reason.message));
        if let Some(snippet) = reason
            .assertion_result
            .as_ref()
            .and_then(|result| result.source_snippet.as_ref())
        {
            self.emit(Level::Warn, &format!(" - {}", snippet));
        }
    }

    fn function_warning(&self, suite: &str, function: &str, warning: &str) {
        self.emit(
            Level::Warn,
            &format!("[{}::{}] Warning: {}", suite, function, warning),
        );
    }

    fn raised_error(&self, suite: &str, function: &str, error: &RaisedError) {
        self.emit(
            Level::Error,
            &format!("[{}::{}] Unexpected error: {}", suite, function, error),
        );
    }

    fn assertions(&self, _suite: &str, _function: &str, results: &[AssertionResult]) {
        self.emit(Level::Info, &format!("Assertions ({}):", results.len()));
        for result in results {
            self.emit(Level::Info, &result.to_string());
        }
    }
}

/// A reporter hook, as recorded by [`MemoryReporter`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    RunStarted(Vec<SuiteOverview>),
    SuiteSkipped { suite: String, reason: String },
    SuiteStarted { suite: String },
    SuiteFinished { suite: String },
    FunctionStarted { suite: String, function: String },
    FunctionPassed { suite: String, function: String },
    FunctionFailed {
        suite: String,
        function: String,
        reason: FailureReason,
    },
    FunctionWarning {
        suite: String,
        function: String,
        warning: String,
    },
    RaisedError {
        suite: String,
        function: String,
        kind_name: String,
    },
    Assertions {
        suite: String,
        function: String,
        results: Vec<AssertionResult>,
    },
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: RefCell<Vec<ReportEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Names of suites reported as skipped.
    pub fn skipped(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                ReportEvent::SuiteSkipped { suite, .. } => Some(suite.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReportEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Reporter for MemoryReporter {
    fn run_started(&self, suites: &[SuiteOverview]) {
        self.push(ReportEvent::RunStarted(suites.to_vec()));
    }

    fn suite_skipped(&self, suite: &str, reason: &str) {
        self.push(ReportEvent::SuiteSkipped {
            suite: suite.to_string(),
            reason: reason.to_string(),
        });
    }

    fn suite_started(&self, suite: &str) {
        self.push(ReportEvent::SuiteStarted {
            suite: suite.to_string(),
        });
    }

    fn suite_finished(&self, suite: &str, _elapsed: Duration) {
        self.push(ReportEvent::SuiteFinished {
            suite: suite.to_string(),
        });
    }

    fn function_started(&self, suite: &str, function: &str) {
        self.push(ReportEvent::FunctionStarted {
            suite: suite.to_string(),
            function: function.to_string(),
        });
    }

    fn function_passed(&self, suite: &str, function: &str, _elapsed: Duration) {
        self.push(ReportEvent::FunctionPassed {
            suite: suite.to_string(),
            function: function.to_string(),
        });
    }

    fn function_failed(&self, suite: &str, function: &str, _elapsed: Duration, reason: &FailureReason) {
        self.push(ReportEvent::FunctionFailed {
            suite: suite.to_string(),
            function: function.to_string(),
            reason: reason.clone(),
        });
    }

    fn function_warning(&self, suite: &str, function: &str, warning: &str) {
        self.push(ReportEvent::FunctionWarning {
            suite: suite.to_string(),
            function: function.to_string(),
            warning: warning.to_string(),
        });
    }

    fn raised_error(&self, suite: &str, function: &str, error: &RaisedError) {
        self.push(ReportEvent::RaisedError {
            suite: suite.to_string(),
            function: function.to_string(),
            kind_name: error.kind_name().to_string(),
        });
    }

    fn assertions(&self, suite: &str, function: &str, results: &[AssertionResult]) {
        self.push(ReportEvent::Assertions {
            suite: suite.to_string(),
            function: function.to_string(),
            results: results.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::participant::Actor;
    use std::rc::Rc;

    struct Inbox(RefCell<Vec<String>>);

    impl Actor for Inbox {
        fn name(&self) -> &str {
            "inbox"
        }

        fn send_message(&self, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_micros(1500)), "1.500");
        assert_eq!(format_elapsed(Duration::ZERO), "0.000");
    }

    #[test]
    fn test_tracing_reporter_mirrors_to_participant() {
        let inbox = Rc::new(Inbox(RefCell::new(Vec::new())));
        let reporter = TracingReporter::new("console")
            .with_participant(Some(Participant::single(inbox.clone())));

        reporter.run_started(&[SuiteOverview {
            name: "Clock".into(),
            functions: 2,
        }]);
        reporter.suite_skipped("Lobby", "Has no participant");
        reporter.function_failed(
            "Clock",
            "test_tick",
            Duration::from_millis(2),
            &FailureReason::unexpected_error(),
        );

        let lines = inbox.0.borrow().clone();
        assert_eq!(
            lines,
            vec![
                "Running tests (1)".to_string(),
                "- Clock: 2".to_string(),
                "[Lobby] Skipped: Has no participant".to_string(),
                "[Clock::test_tick] Failed in 2.000ms".to_string(),
                " - Constraint: None".to_string(),
                " - Exception was thrown".to_string(),
            ]
        );
    }

    #[test]
    fn test_assertion_lines() {
        let inbox = Rc::new(Inbox(RefCell::new(Vec::new())));
        let reporter =
            TracingReporter::new("t").with_participant(Some(Participant::single(inbox.clone())));
        let results = vec![AssertionResult::pass(
            Constraint::IsTrue,
            "ok",
            vec![crate::assertion::Operand::Bool(true)],
        )];
        reporter.assertions("S", "test_a", &results);
        let lines = inbox.0.borrow().clone();
        assert_eq!(lines[0], "Assertions (1):");
        assert_eq!(lines[1], "- IS_TRUE: true is TRUE (ok): PASS");
    }

    #[test]
    fn test_memory_reporter_records() {
        let reporter = MemoryReporter::new();
        assert!(reporter.is_empty());
        reporter.suite_started("A");
        reporter.suite_skipped("B", "Has no participant");
        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.skipped(), vec!["B".to_string()]);
        assert_eq!(
            reporter.events()[0],
            ReportEvent::SuiteStarted { suite: "A".into() }
        );
    }
}
