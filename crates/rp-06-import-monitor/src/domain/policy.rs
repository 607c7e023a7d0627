//! Monitoring cadence.

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorPolicy {
    /// Minimum time between two status polls of one batch.
    pub poll_interval: Duration,
    /// A batch still unfinished this long after submission is failed.
    pub max_monitoring_window: Duration,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::seconds(60),
            max_monitoring_window: Duration::seconds(86_400),
        }
    }
}
