//! Failure records and the abort signal used by test bodies.
//!
//! A test body returns [`TestOutcome`]. Assertions hand back
//! `Err(Abort::Failed(..))` on failure so that `?` stops the body right at the
//! failing assertion; any other error propagated with `?` becomes
//! `Abort::Raised` and is classified by the test case.

use crate::assertion::AssertionResult;
use crate::error::UsageError;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::error::Error;
use std::fmt;

/// Why a test function failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Description of the violated constraint, or `"None"` for raised errors.
    pub constraint_description: String,
    /// Assertion message, or `"Exception was thrown"` for raised errors.
    pub message: String,
    /// The failing assertion; `None` when an unexpected error was raised.
    pub assertion_result: Option<AssertionResult>,
}

impl FailureReason {
    /// Build a reason from a failing assertion.
    pub fn from_assertion(result: AssertionResult) -> Self {
        Self {
            constraint_description: result.constraint.description().to_string(),
            message: result.message.clone(),
            assertion_result: Some(result),
        }
    }

    /// Reason recorded when a test body raised an undeclared error.
    pub fn unexpected_error() -> Self {
        Self {
            constraint_description: "None".to_string(),
            message: "Exception was thrown".to_string(),
            assertion_result: None,
        }
    }

    pub fn is_unexpected_error(&self) -> bool {
        self.assertion_result.is_none()
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.constraint_description, self.message)
    }
}

/// Error kind assigned to a panic inside a test body.
///
/// Declare it with `expect_error::<Panicked>()` to expect a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panicked {
    message: String,
}

impl Panicked {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self { message }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test body panicked: {}", self.message)
    }
}

impl Error for Panicked {}

/// An error raised by a test body, keyed by the concrete error type.
#[derive(Debug)]
pub struct RaisedError {
    kind: TypeId,
    kind_name: &'static str,
    error: Box<dyn Error + Send + Sync>,
}

impl RaisedError {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            kind: TypeId::of::<E>(),
            kind_name: std::any::type_name::<E>(),
            error: Box::new(error),
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::new(Panicked::from_payload(payload.as_ref()))
    }

    pub fn kind(&self) -> TypeId {
        self.kind
    }

    /// Fully qualified type name of the raised error.
    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }

    pub fn is<E: 'static>(&self) -> bool {
        self.kind == TypeId::of::<E>()
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }
}

impl fmt::Display for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_name, self.error)
    }
}

/// Early exit from a test body or continuation.
#[derive(Debug)]
pub enum Abort {
    /// An assertion failed; only the current test function stops.
    Failed(FailureReason),
    /// The body raised an error; classified against declared error kinds.
    Raised(RaisedError),
    /// The engine API was misused; fatal to the whole run.
    Usage(UsageError),
}

impl Abort {
    /// Raise `error` from a test body.
    pub fn raise<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Raised(RaisedError::new(error))
    }
}

impl<E> From<E> for Abort
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::Raised(RaisedError::new(error))
    }
}

/// Return type of test bodies and continuations.
pub type TestOutcome = Result<(), Abort>;
