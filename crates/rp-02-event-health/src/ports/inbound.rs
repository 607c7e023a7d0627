//! Inbound port for the event health subsystem.

use crate::domain::health::{HealthAlert, HealthStatus};
use crate::error::HealthError;

#[async_trait::async_trait]
pub trait EventHealthApi: Send + Sync {
    /// Add `count` applied events for `family` to the current minute bucket.
    /// Returns the bucket total.
    fn record_events(&self, family: &str, count: u64) -> Result<u64, HealthError>;

    /// The alert due for `family`, if its latest bucket is older than
    /// `acceptable_silence_minutes`.
    fn check_interval(
        &self,
        family: &str,
        acceptable_silence_minutes: i64,
    ) -> Result<Option<HealthAlert>, HealthError>;

    /// Run `check_interval` and deliver any alert for `job`, throttled.
    async fn check_health(
        &self,
        job: &str,
        family: &str,
        acceptable_silence_minutes: i64,
    ) -> Result<HealthStatus, HealthError>;
}
