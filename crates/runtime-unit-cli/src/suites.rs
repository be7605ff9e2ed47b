//! Self-check suites bundled with the runner.
//!
//! They exercise every engine feature against itself: plain assertions,
//! delayed effects across ticks, declared errors and participant access.

use runtime_unit::{Fixture, Participant, RunResult, SuiteRegistry, TestCase};

/// Register every bundled suite.
pub fn register_all(registry: &mut SuiteRegistry) -> RunResult<()> {
    registry.register(assertions()?)?;
    registry.register(timers()?)?;
    registry.register(errors()?)?;
    registry.register(participant()?)?;
    Ok(())
}

fn assertions() -> RunResult<TestCase<()>> {
    TestCase::builder("Assertions", ())
        .test("test_booleans", |_, ctx| {
            ctx.assert_true(1 + 1 == 2, "arithmetic holds")?;
            ctx.assert_false("".contains('x'), "empty string has no chars")
        })
        .test("test_nulls", |_, ctx| {
            let missing: Option<u32> = None;
            ctx.assert_null(&missing, "nothing there")?;
            ctx.assert_not_null(&Some("value"), "something there")
        })
        .build()
}

/// State mutated by continuations while a timer test waits.
#[derive(Debug, Default)]
pub struct Clock {
    pub armed: bool,
    pub fired_at: Option<u64>,
}

impl Fixture for Clock {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

fn timers() -> RunResult<TestCase<Clock>> {
    TestCase::builder("Timers", Clock::default())
        .test("test_delayed_effect", |clock, ctx| {
            clock.armed = true;
            ctx.duration(3);
            ctx.on(1, |clock: &mut Clock, ctx| {
                clock.fired_at = Some(ctx.current_tick());
                ctx.assert_true(clock.armed, "armed before first tick")
            })?;
            ctx.on(4, |clock: &mut Clock, ctx| {
                ctx.assert_not_null(&clock.fired_at, "first continuation ran")
            })
        })
        .test("test_chained_continuation", |_, ctx| {
            ctx.duration(2);
            ctx.on(1, |_, ctx| {
                ctx.on(3, |_, ctx| ctx.assert_true(ctx.current_tick() == 3, "fires on deadline"))
            })
        })
        .test("test_reset_between_functions", |clock, ctx| {
            ctx.assert_null(&clock.fired_at, "fixture reset after previous function")
        })
        .build()
}

fn errors() -> RunResult<TestCase<()>> {
    TestCase::builder("Errors", ())
        .test("test_expected_parse_error", |_, ctx| {
            ctx.expect_error::<std::num::ParseIntError>();
            let _: u32 = "not a number".parse()?;
            Ok(())
        })
        .test("test_expected_utf8_error", |_, ctx| {
            ctx.expect_error::<std::str::Utf8Error>();
            let bytes: Vec<u8> = vec![0xff, 0xfe];
            let text = std::str::from_utf8(&bytes)?;
            ctx.assert_true(text.is_empty(), "unreachable")
        })
        .build()
}

/// Name of the participant the suite was started with.
#[derive(Debug, Default)]
pub struct Greeting {
    pub host: Option<String>,
}

impl Fixture for Greeting {
    fn set_up_with_participant(&mut self, participant: &Participant) {
        self.host = Some(participant.name().to_string());
    }
}

fn participant() -> RunResult<TestCase<Greeting>> {
    TestCase::builder("Participant", Greeting::default())
        .requires_participant()
        .test("test_greets_participant", |greeting, ctx| {
            let participant = ctx.participant()?;
            participant
                .primary()
                .send_message("runtime-unit self-check says hello");
            ctx.assert_not_null(&greeting.host, "participant bound during set-up")?;
            ctx.assert_true(
                greeting.host.as_deref() == Some(participant.name()),
                "fixture saw the same participant",
            )
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime_unit::{Executor, ManualDriver, MemoryReporter};
    use std::rc::Rc;

    #[test]
    fn test_bundled_suites_register() {
        let mut registry = SuiteRegistry::new();
        register_all(&mut registry).unwrap();
        assert_eq!(
            registry.names(),
            vec!["Assertions", "Timers", "Errors", "Participant"]
        );
    }

    #[test]
    fn test_bundled_suites_pass_without_participant() {
        let mut registry = SuiteRegistry::new();
        register_all(&mut registry).unwrap();

        let mut executor = Executor::new(Rc::new(MemoryReporter::new()), None);
        registry.drain_into(&mut executor).unwrap();
        let mut driver = ManualDriver::new();
        executor.execute_all(&mut driver).unwrap();
        driver.run_until_idle(100).unwrap();

        let report = executor.report();
        assert!(report.all_passed(), "{}", report);
        assert_eq!(report.skipped, vec!["Participant".to_string()]);
        assert_eq!(report.summary.total_tests, 7);
    }
}
