//! Scripted LMS for tests.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use shared_types::ArtifactRef;

use crate::domain::remote::{RemoteImport, RemoteStatus};
use crate::ports::outbound::{LmsError, LmsImportApi};

#[derive(Debug, Default)]
struct LmsState {
    next_id: u64,
    /// (artifact path, override flag) per submission, in order.
    submissions: Vec<(PathBuf, bool)>,
    statuses: HashMap<String, Result<RemoteStatus, LmsError>>,
    reject_with: Option<LmsError>,
}

/// Accepts every submission as `created` unless told to reject; reports
/// whatever status was last scripted per import id.
#[derive(Debug, Default)]
pub struct InMemoryLms {
    state: Mutex<LmsState>,
}

impl InMemoryLms {
    pub fn reject_submissions(&self, error: LmsError) {
        self.state.lock().reject_with = Some(error);
    }

    pub fn set_status(&self, remote_id: &str, status: Result<RemoteStatus, LmsError>) {
        self.state.lock().statuses.insert(remote_id.to_string(), status);
    }

    pub fn submissions(&self) -> Vec<(PathBuf, bool)> {
        self.state.lock().submissions.clone()
    }
}

#[async_trait::async_trait]
impl LmsImportApi for InMemoryLms {
    async fn submit(
        &self,
        artifact: &ArtifactRef,
        override_sis_stickiness: bool,
    ) -> Result<RemoteImport, LmsError> {
        let mut state = self.state.lock();
        if let Some(error) = state.reject_with.clone() {
            return Err(error);
        }
        state.next_id += 1;
        state
            .submissions
            .push((artifact.path.clone(), override_sis_stickiness));
        Ok(RemoteImport {
            id: state.next_id.to_string(),
            workflow_state: "created".into(),
        })
    }

    async fn status(&self, remote_id: &str) -> Result<RemoteStatus, LmsError> {
        self.state
            .lock()
            .statuses
            .get(remote_id)
            .cloned()
            .unwrap_or_else(|| {
                Ok(RemoteStatus {
                    workflow_state: "created".into(),
                    ..RemoteStatus::default()
                })
            })
    }
}
