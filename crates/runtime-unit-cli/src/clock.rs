//! Wall-clock tick source for the runner

use crate::config::TickConfig;
use runtime_unit::{ManualDriver, RunResult};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Why the tick loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every suite finished and the subscription was cancelled
    Idle,
    /// `max_ticks` was reached with suites still in flight
    TickLimit,
    /// Interrupted by Ctrl-C
    Interrupted,
}

/// Advance `driver` once per configured interval until it goes idle.
///
/// Returns the number of ticks advanced and why the loop stopped.
pub async fn drive(driver: &mut ManualDriver, config: &TickConfig) -> RunResult<(u64, StopReason)> {
    let mut ticker = interval(Duration::from_millis(config.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut advanced = 0;

    loop {
        if driver.is_idle() {
            return Ok((advanced, StopReason::Idle));
        }
        if config.max_ticks > 0 && advanced >= config.max_ticks {
            tracing::warn!(ticks = advanced, "Tick limit reached with suites still running");
            return Ok((advanced, StopReason::TickLimit));
        }

        tokio::select! {
            _ = ticker.tick() => {
                driver.advance()?;
                advanced += 1;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!(ticks = advanced, "Interrupted");
                return Ok((advanced, StopReason::Interrupted));
            }
        }
    }
}
