//! Build errors.

use std::path::PathBuf;

use shared_types::EntityKind;
use thiserror::Error;

use crate::ports::outbound::RosterSourceError;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Nothing changed since the last export; the batch has nothing to send.
    #[error("No rows to export")]
    MissingArtifact,

    #[error("Batch of {expected} holds a {found} entity")]
    KindMismatch { expected: EntityKind, found: EntityKind },

    #[error("Invalid course id: {0}")]
    InvalidCourseId(String),

    #[error("Roster lookup failed: {0}")]
    Roster(#[from] RosterSourceError),

    #[error("Artifact I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl BuildError {
    pub fn is_missing_artifact(&self) -> bool {
        matches!(self, BuildError::MissingArtifact)
    }
}
