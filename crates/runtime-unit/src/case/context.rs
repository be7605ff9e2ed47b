//! Per-function scratch state and the assertion API handed to test bodies.

use crate::assertion::{read_source_line, AssertionResult, Operand};
use crate::constraint::Constraint;
use crate::error::UsageError;
use crate::failure::{Abort, FailureReason, RaisedError, TestOutcome};
use crate::participant::Participant;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};

/// One-shot step registered with [`TestContext::on`].
pub type Continuation<S> = Box<dyn FnOnce(&mut S, &mut TestContext<S>) -> TestOutcome>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Body,
    Waiting { deadline: u64 },
}

/// Scratch state of the test function currently executing.
///
/// Created fresh for every function. Assertions return [`TestOutcome`] so a
/// failure can be propagated with `?`, which stops the rest of the body.
pub struct TestContext<S> {
    assertions: Vec<AssertionResult>,
    expected_errors: Vec<(TypeId, &'static str)>,
    raised_errors: Vec<RaisedError>,
    continuations: BTreeMap<u64, Continuation<S>>,
    duration: Option<u64>,
    tick: u64,
    phase: Phase,
    participant: Option<Participant>,
    usage_error: Option<UsageError>,
    warnings: Vec<String>,
}

impl<S> TestContext<S> {
    pub(crate) fn new(participant: Option<Participant>) -> Self {
        Self {
            assertions: Vec::new(),
            expected_errors: Vec::new(),
            raised_errors: Vec::new(),
            continuations: BTreeMap::new(),
            duration: None,
            tick: 0,
            phase: Phase::Body,
            participant,
            usage_error: None,
            warnings: Vec::new(),
        }
    }

    /// Keep the function running for `ticks` ticks after the body returns.
    ///
    /// The function completes on the tick after the last one, so
    /// continuations may be registered up to tick `ticks + 1`. With zero the
    /// function only waits when a continuation is registered, and then
    /// completes on tick 1.
    ///
    /// Only the body may declare a duration; a declaration from a
    /// continuation is ignored and reported as a warning.
    pub fn duration(&mut self, ticks: u64) {
        if self.phase != Phase::Body {
            self.warn(format!(
                "Duration {} declared after the function started was ignored",
                ticks
            ));
            return;
        }
        self.duration = (ticks > 0).then_some(ticks);
    }

    /// Declared duration, 0 when none.
    pub fn current_duration(&self) -> u64 {
        self.duration.unwrap_or(0)
    }

    /// Local tick counter of the current function.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Run `continuation` once the function's local tick counter reaches
    /// `tick`.
    ///
    /// Registering two continuations for the same tick is a fatal usage
    /// error. A continuation whose tick is never reached is dropped with a
    /// warning when the function completes.
    pub fn on<F>(&mut self, tick: u64, continuation: F) -> TestOutcome
    where
        F: FnOnce(&mut S, &mut TestContext<S>) -> TestOutcome + 'static,
    {
        if self.continuations.contains_key(&tick) {
            return Err(self.usage(UsageError::DuplicateContinuation { tick }));
        }
        self.continuations.insert(tick, Box::new(continuation));
        Ok(())
    }

    /// Expect the next raised error to be of kind `E`.
    pub fn expect_error<E: 'static>(&mut self) {
        self.expected_errors
            .push((TypeId::of::<E>(), std::any::type_name::<E>()));
    }

    #[track_caller]
    pub fn assert_true(&mut self, value: bool, message: impl Into<String>) -> TestOutcome {
        self.assert_that(
            value,
            Constraint::IsTrue,
            message.into(),
            vec![Operand::Bool(value)],
            Location::caller(),
        )
    }

    #[track_caller]
    pub fn assert_false(&mut self, value: bool, message: impl Into<String>) -> TestOutcome {
        self.assert_that(
            !value,
            Constraint::IsFalse,
            message.into(),
            vec![Operand::Bool(value)],
            Location::caller(),
        )
    }

    #[track_caller]
    pub fn assert_null<T: fmt::Debug>(
        &mut self,
        value: &Option<T>,
        message: impl Into<String>,
    ) -> TestOutcome {
        self.assert_that(
            value.is_none(),
            Constraint::IsNull,
            message.into(),
            vec![Operand::option(value)],
            Location::caller(),
        )
    }

    #[track_caller]
    pub fn assert_not_null<T: fmt::Debug>(
        &mut self,
        value: &Option<T>,
        message: impl Into<String>,
    ) -> TestOutcome {
        self.assert_that(
            value.is_some(),
            Constraint::IsNotNull,
            message.into(),
            vec![Operand::option(value)],
            Location::caller(),
        )
    }

    /// Participant bound to the running suite.
    pub fn participant(&mut self) -> Result<Participant, Abort> {
        if let Some(participant) = &self.participant {
            return Ok(participant.clone());
        }
        Err(self.usage(UsageError::ParticipantUnavailable))
    }

    /// Assertions recorded so far by the current function.
    pub fn assertions(&self) -> &[AssertionResult] {
        &self.assertions
    }

    fn assert_that(
        &mut self,
        passed: bool,
        constraint: Constraint,
        message: String,
        operands: Vec<Operand>,
        location: &'static Location<'static>,
    ) -> TestOutcome {
        if passed {
            self.assertions
                .push(AssertionResult::pass(constraint, message, operands).at(location));
            return Ok(());
        }
        let result = AssertionResult::fail(constraint, message, operands)
            .at(location)
            .with_snippet(read_source_line(location));
        self.assertions.push(result.clone());
        Err(Abort::Failed(FailureReason::from_assertion(result)))
    }

    fn warn(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    fn usage(&mut self, error: UsageError) -> Abort {
        if self.usage_error.is_none() {
            self.usage_error = Some(error.clone());
        }
        Abort::Usage(error)
    }

    /// Turn the outcome of one step into a failure reason, if any.
    pub(crate) fn classify(&mut self, outcome: TestOutcome) -> Option<FailureReason> {
        match outcome {
            Ok(()) => None,
            Err(Abort::Failed(reason)) => Some(reason),
            Err(Abort::Raised(raised)) => {
                let declared = self
                    .expected_errors
                    .iter()
                    .position(|(kind, _)| *kind == raised.kind());
                match declared {
                    Some(index) => {
                        let (_, kind_name) = self.expected_errors.remove(index);
                        self.assertions.push(AssertionResult::pass(
                            Constraint::ExceptionThrown,
                            "",
                            vec![Operand::Value(kind_name.to_string())],
                        ));
                        None
                    }
                    None => {
                        self.raised_errors.push(raised);
                        Some(FailureReason::unexpected_error())
                    }
                }
            }
            Err(Abort::Usage(error)) => {
                self.usage(error);
                None
            }
        }
    }

    /// Enter the waiting phase once the body has returned. Returns `false`
    /// when the function completes right away.
    pub(crate) fn suspend(&mut self) -> bool {
        let deadline = match self.duration {
            Some(duration) => duration + 1,
            None if !self.continuations.is_empty() => 1,
            None => return false,
        };
        self.phase = Phase::Waiting { deadline };
        true
    }

    pub(crate) fn deadline(&self) -> Option<u64> {
        match self.phase {
            Phase::Body => None,
            Phase::Waiting { deadline } => Some(deadline),
        }
    }

    pub(crate) fn take_continuation(&mut self, tick: u64) -> Option<Continuation<S>> {
        self.continuations.remove(&tick)
    }

    pub(crate) fn discard_continuations(&mut self) {
        self.continuations.clear();
    }

    pub(crate) fn pending_continuations(&self) -> usize {
        self.continuations.len()
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Drop continuations that never fired, keeping a warning for each.
    pub(crate) fn drop_unfired_continuations(&mut self) {
        let ticks: Vec<u64> = std::mem::take(&mut self.continuations).into_keys().collect();
        for tick in ticks {
            self.warn(format!("Continuation at tick {} never fired", tick));
        }
    }

    pub(crate) fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub(crate) fn take_usage_error(&mut self) -> Option<UsageError> {
        self.usage_error.take()
    }

    pub(crate) fn take_assertions(&mut self) -> Vec<AssertionResult> {
        std::mem::take(&mut self.assertions)
    }

    pub(crate) fn take_raised_errors(&mut self) -> Vec<RaisedError> {
        std::mem::take(&mut self.raised_errors)
    }
}

/// Run one step of a test function, converting a panic into a raised
/// [`crate::failure::Panicked`] error, and classify the outcome.
pub(crate) fn invoke<S, F>(fixture: &mut S, context: &mut TestContext<S>, step: F) -> Option<FailureReason>
where
    F: FnOnce(&mut S, &mut TestContext<S>) -> TestOutcome,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| step(&mut *fixture, &mut *context)))
        .unwrap_or_else(|payload| Err(Abort::Raised(RaisedError::from_panic(payload))));
    context.classify(outcome)
}
