//! Per-event results.
//!
//! A skipped sub-event never fails its message; the rest of the message is
//! still applied.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnhandledActionCode(String),
    InvalidRegId(String),
    /// The section's term is not active.
    InactiveTerm,
    /// The time schedule for the section is not finalized.
    TimeScheduleNotReady,
    MissingNetId,
    /// The sub-event lacks a required field.
    Malformed(String),
}

impl SkipReason {
    /// Outcome word used in intake log lines.
    pub fn outcome(&self) -> &'static str {
        match self {
            SkipReason::UnhandledActionCode(_) => "IGNORE CODE",
            SkipReason::InvalidRegId(_) => "INVALID REGID",
            SkipReason::InactiveTerm => "IGNORE (Inactive section)",
            SkipReason::TimeScheduleNotReady => "IGNORE (TS not ready)",
            SkipReason::MissingNetId => "IGNORE missing uwnetid",
            SkipReason::Malformed(_) => "IGNORE (malformed)",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnhandledActionCode(code) => write!(f, "{} {code}", self.outcome()),
            SkipReason::InvalidRegId(reg_id) => write!(f, "{} {reg_id}", self.outcome()),
            SkipReason::Malformed(reason) => write!(f, "{}: {reason}", self.outcome()),
            _ => f.write_str(self.outcome()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome<T> {
    Accepted(T),
    Skipped(SkipReason),
}

impl<T> NormalizeOutcome<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            NormalizeOutcome::Accepted(t) => Some(t),
            NormalizeOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, NormalizeOutcome::Skipped(_))
    }
}
