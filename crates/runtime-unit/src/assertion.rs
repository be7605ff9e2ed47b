//! Assertion outcome records.
//!
//! An [`AssertionResult`] is created exactly once per assertion call and is
//! never mutated afterwards. The owning test case keeps the list for the
//! current test function and stores it under the function's name once the
//! function is finalized.

use crate::constraint::Constraint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;
use std::path::Path;

/// A rendered assertion operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Operand {
    Bool(bool),
    Null,
    Value(String),
}

impl Operand {
    /// Render any value through its `Debug` implementation.
    pub fn debug<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        Self::Value(format!("{:?}", value))
    }

    /// `None` becomes [`Operand::Null`], `Some(v)` is rendered with `Debug`.
    pub fn option<T: fmt::Debug>(value: &Option<T>) -> Self {
        match value {
            Some(inner) => Self::debug(inner),
            None => Self::Null,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "true"),
            Self::Bool(false) => write!(f, "false"),
            Self::Null => write!(f, "null"),
            Self::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Outcome of a single assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Which predicate was checked.
    pub constraint: Constraint,
    /// Author-supplied message (may be empty).
    pub message: String,
    /// Operands the predicate was evaluated on.
    pub operands: Vec<Operand>,
    /// Whether the predicate held.
    pub passed: bool,
    /// `file:line` of the assertion call, when known.
    pub source_location: Option<String>,
    /// The trimmed source line of the assertion call, when readable.
    pub source_snippet: Option<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(constraint: Constraint, message: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            constraint,
            message: message.into(),
            operands,
            passed: true,
            source_location: None,
            source_snippet: None,
        }
    }

    /// Create a failing result.
    pub fn fail(constraint: Constraint, message: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            passed: false,
            ..Self::pass(constraint, message, operands)
        }
    }

    /// Attach the caller location of the assertion.
    pub fn at(mut self, location: &Location<'_>) -> Self {
        self.source_location = Some(format!("{}:{}", location.file(), location.line()));
        self
    }

    /// Attach the source line of the assertion call.
    pub fn with_snippet(mut self, snippet: Option<String>) -> Self {
        self.source_snippet = snippet;
        self
    }

    /// The constraint rendered against this result's operands.
    pub fn verbose(&self) -> String {
        self.constraint.verbose(&self.operands)
    }
}

impl fmt::Display for AssertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "- {}: {} ({}): {}",
            self.constraint,
            self.verbose(),
            self.message,
            status
        )?;
        if let Some(ref location) = self.source_location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}

/// Best-effort lookup of the source line an assertion was called from.
///
/// Paths recorded by `#[track_caller]` are relative to the directory the
/// compiler ran in, so the working directory and its ancestors are searched.
pub(crate) fn read_source_line(location: &Location<'_>) -> Option<String> {
    let file = Path::new(location.file());
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()
            .ok()?
            .ancestors()
            .map(|dir| dir.join(file))
            .find(|candidate| candidate.is_file())?
    };
    let source = std::fs::read_to_string(path).ok()?;
    let index = usize::try_from(location.line()).ok()?.checked_sub(1)?;
    source
        .lines()
        .nth(index)
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
