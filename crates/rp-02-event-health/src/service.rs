//! # Health Monitor
//!
//! Implements [`EventHealthApi`] over a [`HealthStore`], an [`AlertSink`] and
//! a [`TimeSource`]. The store transaction is never held across the sink
//! call.

use shared_types::TimeSource;
use tracing::{debug, error, warn};

use crate::domain::frequency::minute_of;
use crate::domain::health::{HealthAlert, HealthStatus};
use crate::error::HealthError;
use crate::ports::inbound::EventHealthApi;
use crate::ports::outbound::{AlertSink, HealthStore};

/// Days of buckets kept when nothing else is configured.
pub const DEFAULT_PRUNE_AFTER_DAYS: u32 = 7;

pub struct HealthMonitor<S: HealthStore, A: AlertSink, T: TimeSource> {
    store: S,
    sink: A,
    clock: T,
    prune_after_days: u32,
}

impl<S: HealthStore, A: AlertSink, T: TimeSource> HealthMonitor<S, A, T> {
    pub fn new(store: S, sink: A, clock: T) -> Self {
        Self {
            store,
            sink,
            clock,
            prune_after_days: DEFAULT_PRUNE_AFTER_DAYS,
        }
    }

    pub fn with_prune_after_days(mut self, days: u32) -> Self {
        self.prune_after_days = days;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    fn set_status(&self, job: &str, status: Option<String>) -> Result<bool, HealthError> {
        let now = self.clock.now();
        let mut may_alert = false;
        self.store.transaction(&mut |state| {
            let entry = state.jobs.entry(job.to_string()).or_default();
            entry.status = status.clone();
            may_alert = entry.may_alert(now);
        })?;
        Ok(may_alert)
    }

    async fn squawk(&self, job: &str, alert: HealthAlert) -> Result<HealthStatus, HealthError> {
        warn!(job, family = alert.family(), "{alert}");
        if !self.set_status(job, Some(alert.to_string()))? {
            debug!(job, "alert suppressed by throttle");
            return Ok(HealthStatus::Suppressed(alert));
        }

        match self.sink.send(job, &alert).await {
            Ok(()) => {
                let now = self.clock.now();
                self.store.transaction(&mut |state| {
                    state.jobs.entry(job.to_string()).or_default().last_alerted_at = Some(now);
                })?;
                Ok(HealthStatus::Alerted(alert))
            }
            Err(e) => {
                // Left unthrottled so the next run tries again.
                error!(job, error = %e, "cannot deliver alert: {alert}");
                Ok(HealthStatus::Suppressed(alert))
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: HealthStore, A: AlertSink, T: TimeSource> EventHealthApi for HealthMonitor<S, A, T> {
    fn record_events(&self, family: &str, count: u64) -> Result<u64, HealthError> {
        let minute = minute_of(self.clock.now());
        let prune_after_days = self.prune_after_days;
        let mut total = 0;
        self.store.transaction(&mut |state| {
            total = state
                .logs
                .entry(family.to_string())
                .or_default()
                .record(minute, count, prune_after_days);
        })?;
        debug!(family, count, bucket_total = total, "events recorded");
        Ok(total)
    }

    fn check_interval(
        &self,
        family: &str,
        acceptable_silence_minutes: i64,
    ) -> Result<Option<HealthAlert>, HealthError> {
        let now_minute = minute_of(self.clock.now());
        let mut silence = None;
        self.store.transaction(&mut |state| {
            silence = state
                .logs
                .get(family)
                .and_then(|log| log.silence_exceeding(now_minute, acceptable_silence_minutes));
        })?;
        Ok(silence.map(|elapsed| HealthAlert::silence(family, elapsed)))
    }

    async fn check_health(
        &self,
        job: &str,
        family: &str,
        acceptable_silence_minutes: i64,
    ) -> Result<HealthStatus, HealthError> {
        match self.check_interval(family, acceptable_silence_minutes)? {
            Some(alert) => self.squawk(job, alert).await,
            None => {
                self.set_status(job, None)?;
                Ok(HealthStatus::Healthy)
            }
        }
    }
}
