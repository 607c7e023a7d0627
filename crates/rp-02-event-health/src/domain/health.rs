//! Health alerts and per-job alert bookkeeping.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::frequency::FrequencyLog;

/// Minimum gap, in minutes, between two alerts delivered for the same job.
pub const ALERT_THROTTLE: i64 = 60;

/// Non-fatal notification that a family has gone quiet.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HealthAlert {
    #[error("No events in the last {hours} hours and {minutes} minutes")]
    Silence {
        family: String,
        hours: i64,
        minutes: i64,
    },
}

impl HealthAlert {
    pub fn silence(family: &str, elapsed_minutes: i64) -> Self {
        HealthAlert::Silence {
            family: family.to_string(),
            hours: elapsed_minutes.div_euclid(60),
            minutes: elapsed_minutes.rem_euclid(60),
        }
    }

    pub fn family(&self) -> &str {
        match self {
            HealthAlert::Silence { family, .. } => family,
        }
    }
}

/// Outcome of a health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// The alert went to the sink.
    Alerted(HealthAlert),
    /// The alert was recorded but the sink was called within the last hour.
    Suppressed(HealthAlert),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHealth {
    /// The last alert message, cleared when the job is healthy again.
    pub status: Option<String>,
    pub last_alerted_at: Option<DateTime<Utc>>,
}

impl JobHealth {
    pub fn may_alert(&self, now: DateTime<Utc>) -> bool {
        match self.last_alerted_at {
            None => true,
            Some(last) => now - last > Duration::minutes(ALERT_THROTTLE),
        }
    }
}

/// Everything the health subsystem persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub logs: BTreeMap<String, FrequencyLog>,
    pub jobs: BTreeMap<String, JobHealth>,
}
