//! In-memory queue storage.

use parking_lot::Mutex;

use crate::domain::state::QueueState;
use crate::error::QueueError;
use crate::ports::outbound::QueueStorage;

#[derive(Debug, Default)]
pub struct InMemoryQueueStorage {
    state: Mutex<QueueState>,
}

impl InMemoryQueueStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueueStorage for InMemoryQueueStorage {
    fn transaction(&self, f: &mut dyn FnMut(&mut QueueState)) -> Result<(), QueueError> {
        f(&mut self.state.lock());
        Ok(())
    }

    fn read(&self, f: &mut dyn FnMut(&QueueState)) -> Result<(), QueueError> {
        f(&self.state.lock());
        Ok(())
    }
}
