//! # Outbound Ports (Driven Ports / SPI)

use std::path::PathBuf;

use shared_types::{BatchId, Course, User};
use thiserror::Error;

use crate::domain::collector::RenderedFile;
use crate::domain::rows::{SectionListing, UserProfile};
use crate::error::BuildError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RosterSourceError(pub String);

/// Roster data that enriches export rows.
#[async_trait::async_trait]
pub trait RosterSource: Send + Sync {
    async fn user_profile(&self, user: &User) -> Result<Option<UserProfile>, RosterSourceError>;

    /// Every section the roster lists under `course`.
    async fn course_sections(&self, course: &Course) -> Result<Vec<SectionListing>, RosterSourceError>;
}

/// Where rendered files go.
pub trait ArtifactStore: Send + Sync {
    /// Store `files` as the artifact of `batch`, replacing any earlier one.
    /// Returns the artifact location.
    fn write(&self, batch: BatchId, files: &[RenderedFile]) -> Result<PathBuf, BuildError>;

    fn remove(&self, batch: BatchId) -> Result<(), BuildError>;
}
