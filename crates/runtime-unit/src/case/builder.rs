use super::context::TestContext;
use super::{Fixture, TestCase, TestFunction};
use crate::error::{RunError, RunResult};
use crate::failure::TestOutcome;
use std::collections::HashSet;
use std::rc::Rc;

/// Collects the test functions of a suite; see [`TestCase::builder`].
pub struct TestCaseBuilder<S> {
    name: String,
    fixture: S,
    functions: Vec<TestFunction<S>>,
    requires_participant: bool,
}

impl<S: Fixture + 'static> TestCaseBuilder<S> {
    pub(super) fn new(name: String, fixture: S) -> Self {
        Self {
            name,
            fixture,
            functions: Vec::new(),
            requires_participant: false,
        }
    }

    /// Register a test function. Functions run in registration order.
    pub fn test<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<S>) -> TestOutcome + 'static,
    {
        self.functions.push(TestFunction {
            name: name.into(),
            body: Rc::new(body),
        });
        self
    }

    /// Only run this suite when a participant is available.
    pub fn requires_participant(mut self) -> Self {
        self.requires_participant = true;
        self
    }

    pub fn build(self) -> RunResult<TestCase<S>> {
        if self.name.trim().is_empty() {
            return Err(RunError::InvalidDefinition(
                "suite name must not be blank".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for function in &self.functions {
            if function.name.trim().is_empty() {
                return Err(RunError::InvalidDefinition(format!(
                    "{}: test function name must not be blank",
                    self.name
                )));
            }
            if !seen.insert(function.name.as_str()) {
                return Err(RunError::InvalidDefinition(format!(
                    "{}: duplicate test function {}",
                    self.name, function.name
                )));
            }
        }
        Ok(TestCase::from_parts(
            self.name,
            self.fixture,
            self.functions,
            self.requires_participant,
        ))
    }
}
