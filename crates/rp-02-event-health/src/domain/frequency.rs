//! Minute-bucket frequency log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bucket at or below this count triggers pruning of old buckets.
pub const PRUNE_THRESHOLD: u64 = 5;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes since the Unix epoch.
pub fn minute_of(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(60)
}

/// Event counts for one family, keyed by minute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyLog {
    buckets: BTreeMap<i64, u64>,
}

impl FrequencyLog {
    /// Add `count` to the bucket for `minute` and return the bucket total.
    ///
    /// A zero count still creates the bucket: the queue was alive even if
    /// nothing changed.
    pub fn record(&mut self, minute: i64, count: u64, prune_after_days: u32) -> u64 {
        let bucket = self.buckets.entry(minute).or_insert(0);
        *bucket += count;
        let total = *bucket;

        if total <= PRUNE_THRESHOLD {
            let horizon = minute - i64::from(prune_after_days) * MINUTES_PER_DAY;
            self.buckets = self.buckets.split_off(&horizon);
        }
        total
    }

    pub fn latest_minute(&self) -> Option<i64> {
        self.buckets.keys().next_back().copied()
    }

    pub fn count_at(&self, minute: i64) -> u64 {
        self.buckets.get(&minute).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Minutes since the latest bucket, if that exceeds `acceptable_silence`.
    ///
    /// An empty log never reports silence.
    pub fn silence_exceeding(&self, now_minute: i64, acceptable_silence: i64) -> Option<i64> {
        let latest = self.latest_minute()?;
        let delta = now_minute - latest;
        (delta > acceptable_silence).then_some(delta)
    }
}
