use runtime_unit::Actor;

/// Participant actor backed by the invoking terminal.
#[derive(Debug, Clone)]
pub struct ConsoleActor {
    name: String,
}

impl ConsoleActor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Actor for ConsoleActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, message: &str) {
        println!("[{}] {}", self.name, message);
    }
}
