//! Sequences suites and fans host ticks out to the ones in flight.

use crate::case::{Fixture, TestCase, TestSuite};
use crate::driver::{TaskHandle, TickDriver};
use crate::error::{RunError, RunResult};
use crate::participant::Participant;
use crate::report::{RunReport, SuiteOutcome};
use crate::reporter::{Reporter, SuiteOverview};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::{Rc, Weak};
use tracing::{debug, info};

/// Reason reported for suites that need a participant when none is bound.
pub const NO_PARTICIPANT: &str = "Has no participant";

type SharedSuite = Rc<RefCell<Box<dyn TestSuite>>>;
type InFlight = Vec<(String, SharedSuite)>;

/// Runs queued suites against a tick driver.
///
/// Every suite is started as soon as it is dequeued; suites that suspend stay
/// in flight and receive one `increment_tick` per driver tick, in the order
/// they were started.
pub struct Executor {
    reporter: Rc<dyn Reporter>,
    participant: Option<Participant>,
    pending: VecDeque<SharedSuite>,
    names: HashSet<String>,
    in_flight: Rc<RefCell<InFlight>>,
    results: Rc<RefCell<Vec<SuiteOutcome>>>,
    skipped: Vec<String>,
    task: Option<TaskHandle>,
}

impl Executor {
    pub fn new(reporter: Rc<dyn Reporter>, participant: Option<Participant>) -> Self {
        Self {
            reporter,
            participant,
            pending: VecDeque::new(),
            names: HashSet::new(),
            in_flight: Rc::new(RefCell::new(Vec::new())),
            results: Rc::new(RefCell::new(Vec::new())),
            skipped: Vec::new(),
            task: None,
        }
    }

    pub fn add_test_case<S: Fixture + 'static>(&mut self, case: TestCase<S>) -> RunResult<()> {
        self.add_suite(Box::new(case))
    }

    /// Queue a suite. Names must be unique within an executor.
    pub fn add_suite(&mut self, suite: Box<dyn TestSuite>) -> RunResult<()> {
        let name = suite.name().to_string();
        if !self.names.insert(name.clone()) {
            return Err(RunError::DuplicateSuite(name));
        }
        self.pending.push_back(Rc::new(RefCell::new(suite)));
        Ok(())
    }

    /// Start every queued suite and subscribe to `driver` for ticks.
    pub fn execute_all(&mut self, driver: &mut dyn TickDriver) -> RunResult<()> {
        let in_flight = Rc::clone(&self.in_flight);
        let handle = driver.schedule_repeating(
            1,
            Box::new(move |handle: &TaskHandle| -> RunResult<()> {
                let suites: Vec<SharedSuite> = in_flight
                    .borrow()
                    .iter()
                    .map(|(_, suite)| Rc::clone(suite))
                    .collect();
                if suites.is_empty() {
                    handle.cancel();
                    return Ok(());
                }
                for suite in suites {
                    suite.borrow_mut().increment_tick()?;
                }
                if in_flight.borrow().is_empty() {
                    debug!("No suites in flight, cancelling tick subscription");
                    handle.cancel();
                }
                Ok(())
            }),
        );
        self.task = Some(handle.clone());

        let overview: Vec<SuiteOverview> = self
            .pending
            .iter()
            .map(|suite| {
                let suite = suite.borrow();
                SuiteOverview {
                    name: suite.name().to_string(),
                    functions: suite.runnable_test_functions().len(),
                }
            })
            .collect();
        self.reporter.run_started(&overview);

        while let Some(suite) = self.pending.pop_front() {
            self.execute_next(suite)?;
        }

        if self.in_flight.borrow().is_empty() {
            handle.cancel();
        }
        Ok(())
    }

    fn execute_next(&mut self, suite: SharedSuite) -> RunResult<()> {
        let (name, requires_participant) = {
            let suite = suite.borrow();
            (suite.name().to_string(), suite.requires_participant())
        };

        let reporter = Rc::clone(&self.reporter);
        let future = match (requires_participant, self.participant.clone()) {
            (true, None) => {
                self.reporter.suite_skipped(&name, NO_PARTICIPANT);
                self.skipped.push(name);
                return Ok(());
            }
            (true, Some(participant)) => suite
                .borrow_mut()
                .run_tests_with_participant(reporter, participant)?,
            (false, _) => suite.borrow_mut().run_tests(reporter)?,
        };

        self.in_flight
            .borrow_mut()
            .push((name.clone(), Rc::clone(&suite)));

        let in_flight: Weak<RefCell<InFlight>> = Rc::downgrade(&self.in_flight);
        let results = Rc::clone(&self.results);
        future.add_listener(move |result| {
            if let Some(in_flight) = in_flight.upgrade() {
                in_flight.borrow_mut().retain(|(running, _)| *running != name);
            }
            info!(suite = %name, %result, "Suite completed");
            results.borrow_mut().push(SuiteOutcome {
                name,
                result: result.clone(),
            });
        });
        Ok(())
    }

    /// Nothing queued and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.borrow().is_empty()
    }

    /// Names of suites still running, in start order.
    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Completed suites, in completion order.
    pub fn results(&self) -> Vec<SuiteOutcome> {
        self.results.borrow().clone()
    }

    /// Whether the tick subscription is still active.
    pub fn is_subscribed(&self) -> bool {
        self.task
            .as_ref()
            .map_or(false, |handle| !handle.is_cancelled())
    }

    pub fn report(&self) -> RunReport {
        RunReport::new(self.results(), self.skipped.clone(), self.in_flight())
    }
}
