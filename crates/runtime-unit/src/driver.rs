//! Host clock contract.
//!
//! The engine never owns time: a host implements [`TickDriver`] and calls
//! scheduled tasks once per elapsed tick. [`ManualDriver`] advances only when
//! told to, which is what embedding hosts and tests use.

use crate::error::RunResult;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Cancellation handle of a scheduled task.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// A repeating task. It receives its own handle so it can cancel itself.
pub type TickTask = Box<dyn FnMut(&TaskHandle) -> RunResult<()>>;

pub trait TickDriver {
    /// Run `task` every `interval` ticks, starting `interval` ticks from now.
    fn schedule_repeating(&mut self, interval: u64, task: TickTask) -> TaskHandle;
}

struct Scheduled {
    handle: TaskHandle,
    interval: u64,
    next_due: u64,
    task: TickTask,
}

/// Driver that advances one tick per [`ManualDriver::advance`] call.
#[derive(Default)]
pub struct ManualDriver {
    tick: u64,
    tasks: Vec<Scheduled>,
}

impl ManualDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks advanced so far.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advance one tick and run every task that is due.
    ///
    /// The first error returned by a task stops the tick and is returned;
    /// tasks later in the list are not run for this tick.
    pub fn advance(&mut self) -> RunResult<()> {
        self.tick += 1;
        let tick = self.tick;
        for scheduled in self.tasks.iter_mut() {
            if scheduled.handle.is_cancelled() || scheduled.next_due > tick {
                continue;
            }
            scheduled.next_due = tick + scheduled.interval;
            (scheduled.task)(&scheduled.handle)?;
        }
        self.tasks.retain(|scheduled| !scheduled.handle.is_cancelled());
        Ok(())
    }

    pub fn advance_by(&mut self, ticks: u64) -> RunResult<()> {
        for _ in 0..ticks {
            self.advance()?;
        }
        Ok(())
    }

    /// Advance until every task is cancelled, at most `max_ticks` times.
    /// Returns the number of ticks advanced.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> RunResult<u64> {
        let mut advanced = 0;
        while !self.is_idle() && advanced < max_ticks {
            self.advance()?;
            advanced += 1;
        }
        Ok(advanced)
    }

    pub fn is_idle(&self) -> bool {
        self.active_tasks() == 0
    }

    pub fn active_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|scheduled| !scheduled.handle.is_cancelled())
            .count()
    }
}

impl TickDriver for ManualDriver {
    fn schedule_repeating(&mut self, interval: u64, task: TickTask) -> TaskHandle {
        let interval = interval.max(1);
        let handle = TaskHandle::new();
        self.tasks.push(Scheduled {
            handle: handle.clone(),
            interval,
            next_due: self.tick + interval,
            task,
        });
        handle
    }
}

impl fmt::Debug for ManualDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualDriver")
            .field("tick", &self.tick)
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}
