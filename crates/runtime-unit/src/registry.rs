//! Explicit collection point for suites, drained into an executor.

use crate::case::{Fixture, TestCase, TestSuite};
use crate::error::{RunError, RunResult};
use crate::executor::Executor;
use std::collections::HashSet;
use std::fmt;

/// Suites registered by their authors, in registration order.
#[derive(Default)]
pub struct SuiteRegistry {
    suites: Vec<Box<dyn TestSuite>>,
    names: HashSet<String>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: Fixture + 'static>(&mut self, case: TestCase<S>) -> RunResult<()> {
        self.register_boxed(Box::new(case))
    }

    pub fn register_boxed(&mut self, suite: Box<dyn TestSuite>) -> RunResult<()> {
        let name = suite.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(RunError::DuplicateSuite(name));
        }
        self.suites.push(suite);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.suites.iter().map(|suite| suite.name()).collect()
    }

    /// Move every registered suite into `executor`. Returns how many were
    /// queued.
    pub fn drain_into(&mut self, executor: &mut Executor) -> RunResult<usize> {
        let suites = std::mem::take(&mut self.suites);
        self.names.clear();
        let count = suites.len();
        for suite in suites {
            executor.add_suite(suite)?;
        }
        Ok(count)
    }
}

impl fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRegistry")
            .field("suites", &self.names())
            .finish()
    }
}
