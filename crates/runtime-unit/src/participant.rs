//! Live actors bound to suites that need one.

use crate::error::{RunError, RunResult};
use std::fmt;
use std::rc::Rc;

/// A live session that tests can drive and that receives report lines.
pub trait Actor {
    fn name(&self) -> &str;

    fn send_message(&self, message: &str);
}

/// Non-empty group of actors; the first one is the primary actor.
#[derive(Clone)]
pub struct Participant {
    actors: Vec<Rc<dyn Actor>>,
}

impl Participant {
    pub fn new(actors: Vec<Rc<dyn Actor>>) -> RunResult<Self> {
        if actors.is_empty() {
            return Err(RunError::EmptyParticipant);
        }
        Ok(Self { actors })
    }

    pub fn single(actor: Rc<dyn Actor>) -> Self {
        Self {
            actors: vec![actor],
        }
    }

    pub fn primary(&self) -> &Rc<dyn Actor> {
        // Construction guarantees at least one actor.
        &self.actors[0]
    }

    pub fn actors(&self) -> &[Rc<dyn Actor>] {
        &self.actors
    }

    /// Name of the primary actor.
    pub fn name(&self) -> &str {
        self.primary().name()
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.actors.iter().map(|actor| actor.name()).collect();
        f.debug_struct("Participant").field("actors", &names).finish()
    }
}
