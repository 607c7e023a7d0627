//! Outbound ports: persistence and alert delivery.

use crate::domain::health::{HealthAlert, HealthState};
use crate::error::HealthError;

/// Persists [`HealthState`]. Every mutation runs inside `transaction`.
pub trait HealthStore: Send + Sync {
    fn transaction(&self, f: &mut dyn FnMut(&mut HealthState)) -> Result<(), HealthError>;
}

/// Delivers alerts to operators.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, job: &str, alert: &HealthAlert) -> Result<(), HealthError>;
}
