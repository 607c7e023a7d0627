//! In-memory adapters for tests and dry runs.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use shared_types::{BatchId, Course, User};

use crate::domain::collector::RenderedFile;
use crate::domain::rows::{SectionListing, UserProfile};
use crate::error::BuildError;
use crate::ports::outbound::{ArtifactStore, RosterSource, RosterSourceError};

/// Artifacts kept as file name to contents.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: RwLock<HashMap<BatchId, Vec<(String, String)>>>,
}

impl InMemoryArtifactStore {
    pub fn files(&self, batch: BatchId) -> Option<Vec<(String, String)>> {
        self.artifacts.read().get(&batch).cloned()
    }

    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn write(&self, batch: BatchId, files: &[RenderedFile]) -> Result<PathBuf, BuildError> {
        let files = files
            .iter()
            .map(|f| (f.file.file_name().to_string(), f.contents.clone()))
            .collect();
        self.artifacts.write().insert(batch, files);
        Ok(PathBuf::from(format!("memory://{batch}")))
    }

    fn remove(&self, batch: BatchId) -> Result<(), BuildError> {
        self.artifacts.write().remove(&batch);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRosterSource {
    profiles: RwLock<HashMap<String, UserProfile>>,
    sections: RwLock<HashMap<String, Vec<SectionListing>>>,
    unavailable: RwLock<bool>,
}

impl InMemoryRosterSource {
    pub fn add_profile(&self, reg_id: &str, profile: UserProfile) {
        self.profiles.write().insert(reg_id.to_string(), profile);
    }

    pub fn add_section(&self, course_id: &str, listing: SectionListing) {
        self.sections
            .write()
            .entry(course_id.to_string())
            .or_default()
            .push(listing);
    }

    /// Make every lookup fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }

    fn check(&self) -> Result<(), RosterSourceError> {
        if *self.unavailable.read() {
            return Err(RosterSourceError("roster unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RosterSource for InMemoryRosterSource {
    async fn user_profile(&self, user: &User) -> Result<Option<UserProfile>, RosterSourceError> {
        self.check()?;
        Ok(self.profiles.read().get(&user.reg_id).cloned())
    }

    async fn course_sections(&self, course: &Course) -> Result<Vec<SectionListing>, RosterSourceError> {
        self.check()?;
        Ok(self
            .sections
            .read()
            .get(&course.course_id)
            .cloned()
            .unwrap_or_default())
    }
}
