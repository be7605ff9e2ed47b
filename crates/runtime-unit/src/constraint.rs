//! Assertion predicate kinds.

use crate::assertion::Operand;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of predicate an assertion checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    IsTrue,
    IsFalse,
    IsNull,
    IsNotNull,
    /// A declared error kind was raised by the test body.
    ExceptionThrown,
}

impl Constraint {
    /// All constraints in canonical order.
    pub fn all() -> &'static [Constraint] {
        &[
            Self::IsTrue,
            Self::IsFalse,
            Self::IsNull,
            Self::IsNotNull,
            Self::ExceptionThrown,
        ]
    }

    /// Stable identifier used in report lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::IsTrue => "IS_TRUE",
            Self::IsFalse => "IS_FALSE",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::ExceptionThrown => "EXCEPTION_THROWN",
        }
    }

    /// Fixed human-readable description, also carried by failure reasons.
    pub fn description(&self) -> &'static str {
        match self {
            Self::IsTrue => "var is TRUE",
            Self::IsFalse => "var is FALSE",
            Self::IsNull => "var is NULL",
            Self::IsNotNull => "var is NOT NULL",
            Self::ExceptionThrown => "exception was thrown",
        }
    }

    /// Render the constraint against the assertion's operands, e.g.
    /// `"false is TRUE"`. Only the first operand is substituted.
    pub fn verbose(&self, operands: &[Operand]) -> String {
        let subject = operands
            .first()
            .map(|operand| operand.to_string())
            .unwrap_or_default();
        match self {
            Self::IsTrue => format!("{} is TRUE", subject),
            Self::IsFalse => format!("{} is FALSE", subject),
            Self::IsNull => format!("{} is NULL", subject),
            Self::IsNotNull => format!("{} is NOT NULL", subject),
            Self::ExceptionThrown => format!("{} was thrown", subject),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
