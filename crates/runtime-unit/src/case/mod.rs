//! Per-suite execution state machine.
//!
//! A [`TestCase`] runs its registered functions one at a time. A function
//! either completes when its body returns, or declares a duration and waits
//! for ticks delivered through [`TestCase::increment_tick`], firing the
//! continuations registered for each local tick. When the last function is
//! finalized the suite's [`SuiteFuture`] is completed.

mod builder;
mod context;

pub use builder::TestCaseBuilder;
pub use context::{Continuation, TestContext};

use crate::assertion::AssertionResult;
use crate::error::{RunError, RunResult};
use crate::failure::{FailureReason, TestOutcome};
use crate::future::SuiteFuture;
use crate::participant::Participant;
use crate::reporter::Reporter;
use crate::result::TestCaseResult;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;

/// Lifecycle hooks of the state shared by a suite's test functions.
pub trait Fixture {
    /// Called once before the first function runs.
    fn set_up(&mut self) {}

    /// Called before [`Fixture::set_up`] when the suite runs with a participant.
    fn set_up_with_participant(&mut self, _participant: &Participant) {}

    /// Called after the last function, before the suite's result is published.
    fn cleanup(&mut self) {}

    /// Called after each function is finalized.
    fn reset(&mut self) {}
}

impl Fixture for () {}

pub(crate) struct TestFunction<S> {
    pub(crate) name: String,
    pub(crate) body: Rc<dyn Fn(&mut S, &mut TestContext<S>) -> TestOutcome>,
}

/// State of the function currently owned by a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    /// No function is active.
    Idle,
    /// The body is executing.
    Running,
    /// Suspended until the local tick counter reaches the deadline.
    WaitingUntil(u64),
    /// Every function has been finalized.
    Done,
}

struct ActiveFunction {
    index: usize,
    started_at: Instant,
    failure: Option<FailureReason>,
}

struct RunState {
    reporter: Rc<dyn Reporter>,
    queue: VecDeque<usize>,
    result: TestCaseResult,
    future: SuiteFuture,
    started_at: Instant,
    active: Option<ActiveFunction>,
}

/// A named suite of test functions sharing one fixture.
pub struct TestCase<S> {
    name: String,
    fixture: S,
    functions: Vec<TestFunction<S>>,
    requires_participant: bool,
    participant: Option<Participant>,
    context: TestContext<S>,
    state: FunctionState,
    run: Option<RunState>,
    started: bool,
    assertion_results: Vec<(String, Vec<AssertionResult>)>,
}

impl<S: Fixture + 'static> TestCase<S> {
    pub fn builder(name: impl Into<String>, fixture: S) -> TestCaseBuilder<S> {
        TestCaseBuilder::new(name.into(), fixture)
    }

    pub(crate) fn from_parts(
        name: String,
        fixture: S,
        functions: Vec<TestFunction<S>>,
        requires_participant: bool,
    ) -> Self {
        Self {
            name,
            fixture,
            functions,
            requires_participant,
            participant: None,
            context: TestContext::new(None),
            state: FunctionState::Idle,
            run: None,
            started: false,
            assertion_results: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires_participant(&self) -> bool {
        self.requires_participant
    }

    /// Registered function names, in execution order.
    pub fn runnable_test_functions(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn fixture(&self) -> &S {
        &self.fixture
    }

    pub fn state(&self) -> FunctionState {
        self.state
    }

    /// Local tick counter of the active function.
    pub fn current_tick(&self) -> u64 {
        self.context.current_tick()
    }

    pub fn pending_continuations(&self) -> usize {
        self.context.pending_continuations()
    }

    pub fn is_finished(&self) -> bool {
        self.state == FunctionState::Done
    }

    /// Assertions recorded by a finalized function.
    pub fn assertion_results(&self, function: &str) -> Option<&[AssertionResult]> {
        self.assertion_results
            .iter()
            .find(|(name, _)| name == function)
            .map(|(_, results)| results.as_slice())
    }

    pub fn participant(&self) -> RunResult<Participant> {
        self.participant
            .clone()
            .ok_or_else(|| RunError::ParticipantUnavailable(self.name.clone()))
    }

    /// Start the suite. Functions that do not suspend run to completion
    /// before this returns.
    pub fn run_tests(&mut self, reporter: Rc<dyn Reporter>) -> RunResult<SuiteFuture> {
        if self.started {
            return Err(RunError::AlreadyStarted(self.name.clone()));
        }
        self.started = true;

        self.fixture.set_up();
        reporter.suite_started(&self.name);

        let future = SuiteFuture::new();
        self.run = Some(RunState {
            reporter,
            queue: (0..self.functions.len()).collect(),
            result: TestCaseResult::empty(),
            future: future.clone(),
            started_at: Instant::now(),
            active: None,
        });
        self.advance()?;
        Ok(future)
    }

    pub fn run_tests_with_participant(
        &mut self,
        reporter: Rc<dyn Reporter>,
        participant: Participant,
    ) -> RunResult<SuiteFuture> {
        if self.started {
            return Err(RunError::AlreadyStarted(self.name.clone()));
        }
        self.fixture.set_up_with_participant(&participant);
        self.participant = Some(participant);
        self.run_tests(reporter)
    }

    /// Deliver one tick to the active function.
    pub fn increment_tick(&mut self) -> RunResult<()> {
        let FunctionState::WaitingUntil(deadline) = self.state else {
            return Ok(());
        };
        let tick = self.context.current_tick();
        self.trigger(tick)?;

        if tick >= deadline {
            self.finalize_function();
            self.advance()
        } else {
            self.context.advance_tick();
            Ok(())
        }
    }

    /// Fire the continuation registered for `tick`, if any.
    pub fn trigger(&mut self, tick: u64) -> RunResult<()> {
        if !matches!(self.state, FunctionState::WaitingUntil(_)) {
            return Ok(());
        }
        let Some(continuation) = self.context.take_continuation(tick) else {
            return Ok(());
        };
        debug!(suite = %self.name, tick, "Firing continuation");

        let failure = context::invoke(&mut self.fixture, &mut self.context, continuation);
        self.check_usage()?;

        if let Some(reason) = failure {
            self.context.discard_continuations();
            if let Some(active) = self.run.as_mut().and_then(|run| run.active.as_mut()) {
                active.failure = Some(reason);
            }
        }
        Ok(())
    }

    /// Start queued functions until one suspends or the queue is empty.
    fn advance(&mut self) -> RunResult<()> {
        loop {
            let next = self.run.as_mut().and_then(|run| run.queue.pop_front());
            let Some(index) = next else {
                return self.finish_suite();
            };
            if self.start_function(index)? {
                return Ok(());
            }
            self.finalize_function();
        }
    }

    /// Run the body of function `index`. Returns whether it suspended.
    fn start_function(&mut self, index: usize) -> RunResult<bool> {
        let Some(run) = self.run.as_mut() else {
            return Ok(false);
        };
        let function = &self.functions[index];
        run.reporter.function_started(&self.name, &function.name);
        run.active = Some(ActiveFunction {
            index,
            started_at: Instant::now(),
            failure: None,
        });
        let body = Rc::clone(&function.body);

        self.context = TestContext::new(self.participant.clone());
        self.state = FunctionState::Running;
        let failure = context::invoke(&mut self.fixture, &mut self.context, |fixture, ctx| {
            body(fixture, ctx)
        });
        self.check_usage()?;

        if failure.is_some() {
            self.context.discard_continuations();
            if let Some(active) = self.run.as_mut().and_then(|run| run.active.as_mut()) {
                active.failure = failure;
            }
        }

        if !self.context.suspend() {
            return Ok(false);
        }
        match self.context.deadline() {
            Some(deadline) => {
                self.state = FunctionState::WaitingUntil(deadline);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Record and report the outcome of the active function.
    fn finalize_function(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(active) = run.active.take() else {
            return;
        };
        let function = self.functions[active.index].name.clone();
        let assertions = self.context.take_assertions();
        let elapsed = active.started_at.elapsed();
        let reporter = Rc::clone(&run.reporter);

        if assertions.is_empty() {
            reporter.function_warning(&self.name, &function, "Ended with zero assertions");
        }
        self.context.drop_unfired_continuations();
        for warning in self.context.take_warnings() {
            reporter.function_warning(&self.name, &function, &warning);
        }
        for raised in self.context.take_raised_errors() {
            reporter.raised_error(&self.name, &function, &raised);
        }
        match active.failure {
            None => {
                reporter.function_passed(&self.name, &function, elapsed);
                run.result.record_pass();
            }
            Some(reason) => {
                reporter.function_failed(&self.name, &function, elapsed, &reason);
                run.result.record_failure(reason);
            }
        }
        reporter.assertions(&self.name, &function, &assertions);
        self.assertion_results.push((function, assertions));

        self.fixture.reset();
        self.state = FunctionState::Idle;
    }

    fn finish_suite(&mut self) -> RunResult<()> {
        let Some(run) = self.run.take() else {
            return Ok(());
        };
        run.reporter
            .suite_finished(&self.name, run.started_at.elapsed());
        self.fixture.cleanup();
        self.state = FunctionState::Done;
        run.future.complete(run.result)
    }

    fn check_usage(&mut self) -> RunResult<()> {
        let Some(source) = self.context.take_usage_error() else {
            return Ok(());
        };
        let function = self
            .run
            .as_ref()
            .and_then(|run| run.active.as_ref())
            .map(|active| self.functions[active.index].name.clone())
            .unwrap_or_default();
        Err(RunError::Usage {
            suite: self.name.clone(),
            function,
            source,
        })
    }
}

impl<S> fmt::Debug for TestCase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("functions", &self.functions.len())
            .field("requires_participant", &self.requires_participant)
            .field("state", &self.state)
            .finish()
    }
}

/// Object-safe view of a [`TestCase`] used by the executor and registry.
pub trait TestSuite {
    fn name(&self) -> &str;

    fn requires_participant(&self) -> bool;

    fn runnable_test_functions(&self) -> Vec<&str>;

    fn run_tests(&mut self, reporter: Rc<dyn Reporter>) -> RunResult<SuiteFuture>;

    fn run_tests_with_participant(
        &mut self,
        reporter: Rc<dyn Reporter>,
        participant: Participant,
    ) -> RunResult<SuiteFuture>;

    fn increment_tick(&mut self) -> RunResult<()>;

    fn is_finished(&self) -> bool;
}

impl<S: Fixture + 'static> TestSuite for TestCase<S> {
    fn name(&self) -> &str {
        TestCase::name(self)
    }

    fn requires_participant(&self) -> bool {
        TestCase::requires_participant(self)
    }

    fn runnable_test_functions(&self) -> Vec<&str> {
        TestCase::runnable_test_functions(self)
    }

    fn run_tests(&mut self, reporter: Rc<dyn Reporter>) -> RunResult<SuiteFuture> {
        TestCase::run_tests(self, reporter)
    }

    fn run_tests_with_participant(
        &mut self,
        reporter: Rc<dyn Reporter>,
        participant: Participant,
    ) -> RunResult<SuiteFuture> {
        TestCase::run_tests_with_participant(self, reporter, participant)
    }

    fn increment_tick(&mut self) -> RunResult<()> {
        TestCase::increment_tick(self)
    }

    fn is_finished(&self) -> bool {
        TestCase::is_finished(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UsageError;
    use crate::reporter::{MemoryReporter, ReportEvent};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Counter {
        value: u32,
        set_up: u32,
        resets: u32,
        cleaned: bool,
    }

    impl Fixture for Counter {
        fn set_up(&mut self) {
            self.set_up += 1;
        }

        fn cleanup(&mut self) {
            self.cleaned = true;
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn reporter() -> Rc<MemoryReporter> {
        Rc::new(MemoryReporter::new())
    }

    #[test]
    fn test_synchronous_suite_completes_immediately() {
        let mut case = TestCase::builder("Sync", Counter::default())
            .test("test_one", |counter, ctx| {
                counter.value += 1;
                ctx.assert_true(counter.value == 1, "first")
            })
            .test("test_two", |counter, ctx| {
                counter.value += 1;
                ctx.assert_null::<u8>(&None, "nothing")
            })
            .build()
            .unwrap();

        let future = case.run_tests(reporter()).unwrap();
        let result = future.result().unwrap();
        assert_eq!(result.total_tests(), 2);
        assert_eq!(result.succeeded(), 2);
        assert!(case.is_finished());
        assert_eq!(case.fixture().set_up, 1);
        assert_eq!(case.fixture().resets, 2);
        assert!(case.fixture().cleaned);
        assert_eq!(case.assertion_results("test_two").map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_second_start_rejected() {
        let mut case = TestCase::builder("Once", ()).build().unwrap();
        case.run_tests(reporter()).unwrap();
        assert!(matches!(
            case.run_tests(reporter()),
            Err(RunError::AlreadyStarted(_))
        ));
    }

    #[test]
    fn test_continuation_fires_after_exact_ticks() {
        let fired_at = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&fired_at);
        let mut case = TestCase::builder("Delay", ())
            .test("test_delay", move |_, ctx| {
                ctx.duration(3);
                let log = Rc::clone(&log);
                ctx.on(4, move |_, ctx| {
                    log.borrow_mut().push(ctx.current_tick());
                    ctx.assert_true(true, "fired")
                })
            })
            .build()
            .unwrap();

        let future = case.run_tests(reporter()).unwrap();
        assert_eq!(case.state(), FunctionState::WaitingUntil(4));
        for _ in 0..4 {
            case.increment_tick().unwrap();
            assert!(fired_at.borrow().is_empty());
        }
        assert!(!future.is_completed());
        case.increment_tick().unwrap();
        assert_eq!(*fired_at.borrow(), vec![4]);
        assert!(future.is_completed());
        assert_eq!(future.result().map(|r| r.succeeded()), Some(1));
    }

    #[test]
    fn test_failing_continuation_waits_for_deadline() {
        let later = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&later);
        let memory = reporter();
        let mut case = TestCase::builder("LateFail", ())
            .test("test_fail", move |_, ctx| {
                ctx.duration(10);
                ctx.on(1, |_, ctx| ctx.assert_false(true, "boom"))?;
                let flag = Rc::clone(&flag);
                ctx.on(5, move |_, ctx| {
                    *flag.borrow_mut() = true;
                    ctx.assert_true(true, "never")
                })
            })
            .test("test_after", |_, ctx| ctx.assert_true(true, "next"))
            .build()
            .unwrap();

        let future = case.run_tests(memory.clone()).unwrap();
        for _ in 0..11 {
            case.increment_tick().unwrap();
            assert!(!future.is_completed());
        }
        assert_eq!(case.pending_continuations(), 0);
        case.increment_tick().unwrap();

        assert!(!*later.borrow());
        let result = future.result().unwrap();
        assert_eq!(result.total_tests(), 2);
        assert_eq!(result.failures(), 1);
        assert_eq!(result.failure_reasons()[0].message, "boom");
        assert_eq!(case.assertion_results("test_fail").map(|r| r.len()), Some(1));
        assert!(!memory.events().iter().any(|event| matches!(
            event,
            ReportEvent::FunctionWarning { warning, .. } if warning.contains("never fired")
        )));
    }

    #[test]
    fn test_next_function_starts_at_tick_zero() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut case = TestCase::builder("Chain", ())
            .test("test_first", |_, ctx| {
                ctx.duration(1);
                ctx.assert_true(true, "")
            })
            .test("test_second", move |_, ctx| {
                ctx.duration(2);
                let log = Rc::clone(&log);
                ctx.on(0, move |_, ctx| {
                    log.borrow_mut().push(ctx.current_tick());
                    ctx.assert_true(true, "")
                })
            })
            .build()
            .unwrap();

        case.run_tests(reporter()).unwrap();
        assert_eq!(case.state(), FunctionState::WaitingUntil(2));
        for _ in 0..3 {
            case.increment_tick().unwrap();
        }
        assert_eq!(case.state(), FunctionState::WaitingUntil(3));
        assert_eq!(case.current_tick(), 0);
        assert!(seen.borrow().is_empty());
        case.increment_tick().unwrap();
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn test_body_failure_waits_for_deadline() {
        let mut case = TestCase::builder("BodyFail", ())
            .test("test_fail", |_, ctx| {
                ctx.duration(3);
                ctx.on(1, |_, ctx| ctx.assert_true(true, ""))?;
                ctx.assert_not_null::<u8>(&None, "missing")
            })
            .build()
            .unwrap();

        let future = case.run_tests(reporter()).unwrap();
        assert!(!future.is_completed());
        assert_eq!(case.state(), FunctionState::WaitingUntil(4));
        assert_eq!(case.pending_continuations(), 0);

        for _ in 0..4 {
            case.increment_tick().unwrap();
            assert!(!future.is_completed());
        }
        case.increment_tick().unwrap();

        let result = future.result().unwrap();
        assert_eq!(result.failures(), 1);
        assert_eq!(
            result.failure_reasons()[0].constraint_description,
            "var is NOT NULL"
        );
        assert_eq!(case.assertion_results("test_fail").map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_body_failure_without_duration_completes_immediately() {
        let mut case = TestCase::builder("QuickFail", ())
            .test("test_fail", |_, ctx| {
                ctx.on(1, |_, ctx| ctx.assert_true(true, ""))?;
                ctx.assert_true(false, "stop")
            })
            .build()
            .unwrap();

        let future = case.run_tests(reporter()).unwrap();
        assert_eq!(future.result().map(|r| r.failures()), Some(1));
        assert!(case.is_finished());
    }

    #[test]
    fn test_zero_duration_continuation_fires_on_next_tick() {
        let fired = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&fired);
        let mut case = TestCase::builder("Zero", ())
            .test("test_zero", move |_, ctx| {
                ctx.duration(0);
                let log = Rc::clone(&log);
                ctx.on(1, move |_, ctx| {
                    log.borrow_mut().push(ctx.current_tick());
                    ctx.assert_true(true, "fired")
                })
            })
            .build()
            .unwrap();

        let future = case.run_tests(reporter()).unwrap();
        assert_eq!(case.state(), FunctionState::WaitingUntil(1));
        case.increment_tick().unwrap();
        assert!(fired.borrow().is_empty());
        case.increment_tick().unwrap();
        assert_eq!(*fired.borrow(), vec![1]);
        assert_eq!(future.result().map(|r| r.succeeded()), Some(1));
    }

    #[test]
    fn test_unreachable_continuation_dropped_with_warning() {
        let memory = reporter();
        let mut case = TestCase::builder("Far", ())
            .test("test_far", |_, ctx| {
                ctx.duration(1);
                ctx.on(5, |_, ctx| ctx.assert_true(false, "never runs"))?;
                ctx.assert_true(true, "body")
            })
            .build()
            .unwrap();

        let future = case.run_tests(memory.clone()).unwrap();
        for _ in 0..3 {
            case.increment_tick().unwrap();
        }
        assert_eq!(future.result().map(|r| r.succeeded()), Some(1));
        assert!(memory.events().contains(&ReportEvent::FunctionWarning {
            suite: "Far".into(),
            function: "test_far".into(),
            warning: "Continuation at tick 5 never fired".into(),
        }));
    }

    #[test]
    fn test_duplicate_continuation_is_fatal() {
        let mut case = TestCase::builder("Dup", ())
            .test("test_dup", |_, ctx| {
                ctx.duration(5);
                ctx.on(2, |_, _| Ok(()))?;
                ctx.on(2, |_, _| Ok(()))
            })
            .build()
            .unwrap();

        match case.run_tests(reporter()) {
            Err(RunError::Usage {
                suite,
                function,
                source,
            }) => {
                assert_eq!(suite, "Dup");
                assert_eq!(function, "test_dup");
                assert_eq!(source, UsageError::DuplicateContinuation { tick: 2 });
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_usage_error_from_continuation_surfaces_on_tick() {
        let mut case = TestCase::builder("LateDup", ())
            .test("test_late", |_, ctx| {
                ctx.duration(3);
                ctx.on(1, |_, ctx| {
                    ctx.on(2, |_, _| Ok(()))?;
                    ctx.on(2, |_, _| Ok(()))
                })
            })
            .build()
            .unwrap();

        case.run_tests(reporter()).unwrap();
        case.increment_tick().unwrap();
        assert!(matches!(
            case.increment_tick(),
            Err(RunError::Usage {
                source: UsageError::DuplicateContinuation { tick: 2 },
                ..
            })
        ));
    }

    #[test]
    fn test_duration_from_continuation_warns() {
        let memory = reporter();
        let mut case = TestCase::builder("LateDuration", ())
            .test("test_late", |_, ctx| {
                ctx.duration(1);
                ctx.on(1, |_, ctx| {
                    ctx.duration(4);
                    ctx.assert_true(true, "still counts")
                })
            })
            .build()
            .unwrap();

        let future = case.run_tests(memory.clone()).unwrap();
        for _ in 0..2 {
            case.increment_tick().unwrap();
        }
        assert!(!future.is_completed());
        case.increment_tick().unwrap();
        assert_eq!(future.result().map(|r| r.succeeded()), Some(1));
        assert!(memory.events().iter().any(|event| matches!(
            event,
            ReportEvent::FunctionWarning { warning, .. } if warning.contains("Duration 4")
        )));
    }

    #[test]
    fn test_zero_assertions_warns() {
        let memory = reporter();
        let mut case = TestCase::builder("Quiet", ())
            .test("test_nothing", |_, _| Ok(()))
            .build()
            .unwrap();
        let future = case.run_tests(memory.clone()).unwrap();
        assert_eq!(future.result().map(|r| r.succeeded()), Some(1));
        assert!(memory.events().contains(&ReportEvent::FunctionWarning {
            suite: "Quiet".into(),
            function: "test_nothing".into(),
            warning: "Ended with zero assertions".into(),
        }));
    }

    #[test]
    fn test_participant_accessors() {
        let mut case = TestCase::builder("NoParticipant", ())
            .test("test_needs", |_, ctx| {
                ctx.participant()?;
                Ok(())
            })
            .build()
            .unwrap();
        assert!(matches!(
            case.participant(),
            Err(RunError::ParticipantUnavailable(_))
        ));
        assert!(matches!(
            case.run_tests(reporter()),
            Err(RunError::Usage {
                source: UsageError::ParticipantUnavailable,
                ..
            })
        ));
    }
}
