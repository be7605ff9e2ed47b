//! Single-completion, multi-listener handle for a suite's result.

use crate::error::{RunError, RunResult};
use crate::result::TestCaseResult;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Listener = Box<dyn FnOnce(&TestCaseResult)>;

#[derive(Default)]
struct FutureState {
    result: Option<TestCaseResult>,
    listeners: Vec<Listener>,
}

/// Shared handle that is completed exactly once with a [`TestCaseResult`].
///
/// Clones refer to the same state. Listeners run synchronously, in
/// registration order, inside [`SuiteFuture::complete`]. A listener added
/// after completion runs immediately with the stored result.
#[derive(Clone, Default)]
pub struct SuiteFuture {
    state: Rc<RefCell<FutureState>>,
}

impl SuiteFuture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, listener: F)
    where
        F: FnOnce(&TestCaseResult) + 'static,
    {
        let completed = self.state.borrow().result.clone();
        match completed {
            Some(result) => listener(&result),
            None => self.state.borrow_mut().listeners.push(Box::new(listener)),
        }
    }

    /// Store the result and notify every listener.
    ///
    /// Listeners may register further listeners or inspect the future while
    /// being notified; no borrow is held across the calls.
    pub fn complete(&self, result: TestCaseResult) -> RunResult<()> {
        let listeners = {
            let mut state = self.state.borrow_mut();
            if state.result.is_some() {
                return Err(RunError::FutureAlreadyCompleted);
            }
            state.result = Some(result.clone());
            std::mem::take(&mut state.listeners)
        };
        for listener in listeners {
            listener(&result);
        }
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.state.borrow().result.is_some()
    }

    pub fn result(&self) -> Option<TestCaseResult> {
        self.state.borrow().result.clone()
    }

    /// Number of listeners still waiting for completion.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }
}

impl fmt::Debug for SuiteFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SuiteFuture")
            .field("result", &state.result)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_listeners_run_in_order() {
        let future = SuiteFuture::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for id in 0..3 {
            let order = Rc::clone(&order);
            future.add_listener(move |_| order.borrow_mut().push(id));
        }
        assert_eq!(future.listener_count(), 3);

        future.complete(TestCaseResult::new(2, Vec::new())).unwrap();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(future.listener_count(), 0);
        assert_eq!(future.result().map(|r| r.succeeded()), Some(2));
    }

    #[test]
    fn test_second_complete_rejected() {
        let future = SuiteFuture::new();
        future.complete(TestCaseResult::empty()).unwrap();
        assert!(matches!(
            future.complete(TestCaseResult::empty()),
            Err(RunError::FutureAlreadyCompleted)
        ));
    }

    #[test]
    fn test_late_listener_invoked_immediately() {
        let future = SuiteFuture::new();
        future.complete(TestCaseResult::new(1, Vec::new())).unwrap();

        let seen = Rc::new(Cell::new(0));
        let seen_in = Rc::clone(&seen);
        future.add_listener(move |result| seen_in.set(result.total_tests()));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_listener_may_reenter() {
        let future = SuiteFuture::new();
        let inner_ran = Rc::new(Cell::new(false));

        let handle = future.clone();
        let flag = Rc::clone(&inner_ran);
        future.add_listener(move |_| {
            assert!(handle.is_completed());
            handle.add_listener(move |_| flag.set(true));
        });

        future.complete(TestCaseResult::empty()).unwrap();
        assert!(inner_ran.get());
    }
}
