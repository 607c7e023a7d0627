//! # Import Batches
//!
//! An [`ImportBatch`] is a homogeneous set of claimed rows travelling
//! through build, submission and monitoring:
//!
//! ```text
//! Queued -> Building -> Built -> Submitted -> Monitoring -> Complete
//!                         |          |             |
//!                         +----------+-------------+-----> Failed
//! ```
//!
//! The batch id doubles as the claim token stamped on every row it holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::entities::{EntityKind, Priority};

/// Identifier of an import batch and claim token of its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    /// A fresh, never-before-issued id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Queued,
    Building,
    Built,
    Submitted,
    Monitoring,
    Complete,
    Failed,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Complete | BatchState::Failed)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchState::Queued => "queued",
            BatchState::Building => "building",
            BatchState::Built => "built",
            BatchState::Submitted => "submitted",
            BatchState::Monitoring => "monitoring",
            BatchState::Complete => "complete",
            BatchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Whether a build emits everything or only what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Full,
    #[default]
    Delta,
}

impl BuildMode {
    /// Urgent batches are always built in full.
    pub fn effective(self, priority: Priority) -> Self {
        if priority.is_urgent() {
            BuildMode::Full
        } else {
            self
        }
    }
}

/// Where a built artifact lives and what it hashes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: PathBuf,
    /// Hex SHA-256 over file names and contents, in file order.
    pub digest: String,
    pub files: Vec<String>,
    pub row_count: usize,
    /// Row fingerprint per natural key, copied to the export ledger once
    /// the batch is imported.
    #[serde(default)]
    pub fingerprints: BTreeMap<String, String>,
}

/// A batch and everything learned about it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: BatchId,
    pub kind: EntityKind,
    pub priority: Priority,
    pub state: BatchState,
    pub created_at: DateTime<Utc>,
    pub mode: BuildMode,
    pub override_sis_stickiness: bool,
    pub artifact: Option<ArtifactRef>,
    pub build_error: Option<String>,
    /// HTTP-like status of the submission call.
    pub post_status: Option<u16>,
    pub remote_id: Option<String>,
    pub remote_state: Option<String>,
    pub progress: u8,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub poll_count: u32,
}

impl ImportBatch {
    pub fn new(kind: EntityKind, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id: BatchId::new(),
            kind,
            priority,
            state: BatchState::Queued,
            created_at: now,
            mode: BuildMode::default(),
            override_sis_stickiness: false,
            artifact: None,
            build_error: None,
            post_status: None,
            remote_id: None,
            remote_state: None,
            progress: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            submitted_at: None,
            last_polled_at: None,
            poll_count: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.post_status == Some(200) && self.progress == 100
    }

    pub fn is_imported(&self) -> bool {
        self.is_completed()
            && self
                .remote_state
                .as_deref()
                .is_some_and(|s| s.starts_with("imported"))
    }

    pub fn is_cleanly_imported(&self) -> bool {
        self.is_imported() && self.warnings.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(BatchId::new(), BatchId::new());
    }

    #[test]
    fn test_urgent_batches_build_full() {
        assert_eq!(BuildMode::Delta.effective(Priority::High), BuildMode::Full);
        assert_eq!(BuildMode::Delta.effective(Priority::Immediate), BuildMode::Full);
        assert_eq!(BuildMode::Delta.effective(Priority::Default), BuildMode::Delta);
    }

    #[test]
    fn test_imported_requires_full_progress() {
        let mut batch = ImportBatch::new(EntityKind::User, Priority::Default, Utc::now());
        batch.post_status = Some(200);
        batch.remote_state = Some("imported".into());
        batch.progress = 90;
        assert!(!batch.is_imported());
        batch.progress = 100;
        assert!(batch.is_cleanly_imported());
        batch.warnings.push("row 3: unknown user".into());
        assert!(batch.is_imported());
        assert!(!batch.is_cleanly_imported());
    }
}
