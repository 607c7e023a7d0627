//! In-memory store and sink.

use parking_lot::Mutex;

use crate::domain::health::{HealthAlert, HealthState};
use crate::error::HealthError;
use crate::ports::outbound::{AlertSink, HealthStore};

#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    state: Mutex<HealthState>,
}

impl InMemoryHealthStore {
    pub fn snapshot(&self) -> HealthState {
        self.state.lock().clone()
    }
}

impl HealthStore for InMemoryHealthStore {
    fn transaction(&self, f: &mut dyn FnMut(&mut HealthState)) -> Result<(), HealthError> {
        f(&mut self.state.lock());
        Ok(())
    }
}

/// Keeps every delivered alert.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    sent: Mutex<Vec<(String, HealthAlert)>>,
}

impl RecordingAlertSink {
    pub fn sent(&self) -> Vec<(String, HealthAlert)> {
        self.sent.lock().clone()
    }
}

#[async_trait::async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send(&self, job: &str, alert: &HealthAlert) -> Result<(), HealthError> {
        self.sent.lock().push((job.to_string(), alert.clone()));
        Ok(())
    }
}
