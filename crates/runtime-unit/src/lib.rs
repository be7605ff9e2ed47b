//! Runtime Unit
//!
//! A test-execution engine for hosts that advance time in discrete ticks.
//! Suites are plain closures registered on a [`TestCase`]; a test function
//! may suspend itself for a number of ticks and resume through continuations,
//! while the [`Executor`] fans every host tick out to the suites in flight.
//!
//! # Architecture
//!
//! - [`TestCase`]: per-suite state machine and the [`TestContext`] assertion API
//! - [`SuiteFuture`]: single-completion handle carrying a [`TestCaseResult`]
//! - [`Executor`]: suite queue, in-flight set and tick subscription
//! - [`TickDriver`]: host clock contract, with [`ManualDriver`] as reference
//! - [`Reporter`]: progress sink, backed by `tracing` in [`TracingReporter`]
//! - [`SuiteRegistry`]: explicit collection point for suites
//!
//! # Control flow
//!
//! Assertions return [`TestOutcome`]; propagating a failure with `?` stops the
//! rest of the function without affecting the rest of the suite. Any other
//! error propagated with `?` is checked against the kinds declared with
//! [`TestContext::expect_error`]. Misuse of the API (for example registering
//! two continuations for one tick) is fatal and surfaces as
//! [`RunError::Usage`].
//!
//! # Example
//!
//! ```rust
//! use runtime_unit::{Executor, Fixture, ManualDriver, MemoryReporter, TestCase};
//! use std::rc::Rc;
//!
//! #[derive(Default)]
//! struct Door {
//!     open: bool,
//! }
//!
//! impl Fixture for Door {}
//!
//! let case = TestCase::builder("Doors", Door::default())
//!     .test("test_opens_later", |_, ctx| {
//!         ctx.duration(2);
//!         ctx.on(2, |door, ctx| {
//!             door.open = true;
//!             ctx.assert_true(door.open, "door opened")
//!         })
//!     })
//!     .build()
//!     .unwrap();
//!
//! let mut executor = Executor::new(Rc::new(MemoryReporter::new()), None);
//! executor.add_test_case(case).unwrap();
//!
//! let mut driver = ManualDriver::new();
//! executor.execute_all(&mut driver).unwrap();
//! driver.run_until_idle(10).unwrap();
//!
//! assert!(executor.report().all_passed());
//! ```

#![deny(unsafe_code)]

pub mod assertion;
pub mod case;
pub mod constraint;
pub mod driver;
pub mod error;
pub mod executor;
pub mod failure;
pub mod future;
pub mod participant;
pub mod registry;
pub mod report;
pub mod reporter;
pub mod result;

// Re-export main types for convenience
pub use assertion::{AssertionResult, Operand};
pub use case::{Continuation, Fixture, FunctionState, TestCase, TestCaseBuilder, TestContext, TestSuite};
pub use constraint::Constraint;
pub use driver::{ManualDriver, TaskHandle, TickDriver, TickTask};
pub use error::{RunError, RunResult, UsageError};
pub use executor::{Executor, NO_PARTICIPANT};
pub use failure::{Abort, FailureReason, Panicked, RaisedError, TestOutcome};
pub use future::SuiteFuture;
pub use participant::{Actor, Participant};
pub use registry::SuiteRegistry;
pub use report::{RunReport, RunSummary, SuiteOutcome};
pub use reporter::{MemoryReporter, ReportEvent, Reporter, SuiteOverview, TracingReporter};
pub use result::TestCaseResult;
