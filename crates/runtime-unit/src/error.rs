//! Error types for the runtime-unit engine.
//!
//! Assertion failures and errors raised by test bodies are *not* engine
//! errors: they travel through [`crate::failure::Abort`] and end up in a
//! [`crate::failure::FailureReason`]. The types here form the fatal channel,
//! i.e. misuse of the engine that has to stop the run.

/// Misuse of the test-function API, detected while a test function runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("continuation for tick {tick} is already registered")]
    DuplicateContinuation { tick: u64 },

    #[error("test case did not start with a participant")]
    ParticipantUnavailable,
}

/// Fatal errors surfaced by suites, the executor and tick drivers.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("usage error in {suite}::{function}: {source}")]
    Usage {
        suite: String,
        function: String,
        #[source]
        source: UsageError,
    },

    #[error("invalid test case definition: {0}")]
    InvalidDefinition(String),

    #[error("duplicate test case name: {0}")]
    DuplicateSuite(String),

    #[error("test case {0} has already been started")]
    AlreadyStarted(String),

    #[error("participant must have at least one actor")]
    EmptyParticipant,

    #[error("suite future already completed")]
    FutureAlreadyCompleted,

    #[error("test case {0} did not start with a participant")]
    ParticipantUnavailable(String),

    #[error("inconsistent test case result: {0}")]
    InconsistentResult(String),
}

/// Convenience result type for engine operations.
pub type RunResult<T> = Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_duplicate_continuation_display() {
        let err = UsageError::DuplicateContinuation { tick: 4 };
        assert_eq!(err.to_string(), "continuation for tick 4 is already registered");
    }

    #[test]
    fn test_usage_wraps_source() {
        let err = RunError::Usage {
            suite: "TimerSuite".into(),
            function: "test_delay".into(),
            source: UsageError::DuplicateContinuation { tick: 2 },
        };
        assert!(err.to_string().contains("TimerSuite::test_delay"));
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("tick 2"));
    }

    #[test]
    fn test_definition_errors_display() {
        assert!(RunError::DuplicateSuite("A".into())
            .to_string()
            .contains("duplicate test case name: A"));
        assert!(RunError::AlreadyStarted("A".into())
            .to_string()
            .contains("already been started"));
        assert_eq!(
            RunError::EmptyParticipant.to_string(),
            "participant must have at least one actor"
        );
    }
}
