//! Per-message and per-run results.

use chrono::Duration;

use super::family::EventFamily;

/// What happened to one message that did not fail. Every variant is
/// acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Events recorded in the frequency log.
    Applied(u64),
    /// Valid, but nothing in it concerns this system.
    Ignored,
    /// Decrypted to something that is not a JSON object.
    Empty,
}

impl MessageOutcome {
    pub fn events(self) -> u64 {
        match self {
            MessageOutcome::Applied(n) => n,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatherOptions {
    pub max_messages: usize,
    pub visibility_timeout: Duration,
}

impl Default for GatherOptions {
    fn default() -> Self {
        Self {
            max_messages: 10,
            visibility_timeout: Duration::seconds(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherReport {
    pub family: EventFamily,
    pub received: usize,
    pub acknowledged: usize,
    /// Events recorded in the frequency log across all messages.
    pub events: u64,
    /// Messages that failed with a protocol error, left for redelivery.
    pub rejected: Vec<String>,
    /// Messages that failed for any other reason, left for redelivery.
    pub failed: Vec<String>,
}

impl GatherReport {
    pub fn new(family: EventFamily) -> Self {
        Self {
            family,
            received: 0,
            acknowledged: 0,
            events: 0,
            rejected: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }
}
