//! Alert sink that writes to the log.

use tracing::error;

use crate::domain::health::HealthAlert;
use crate::error::HealthError;
use crate::ports::outbound::AlertSink;

/// Emits alerts as `error` events for log-based paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

#[async_trait::async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, job: &str, alert: &HealthAlert) -> Result<(), HealthError> {
        error!(
            job,
            family = alert.family(),
            "Provisioning job \"{job}\" may be having issues: {alert}"
        );
        Ok(())
    }
}
