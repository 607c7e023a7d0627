//! # Outbound Ports (Driven Ports / SPI)
//!
//! The LMS batch import API is an external collaborator.

use shared_types::ArtifactRef;
use thiserror::Error;

use crate::domain::remote::{RemoteImport, RemoteStatus};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LmsError {
    #[error("LMS responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("LMS request failed: {0}")]
    Transport(String),
}

impl LmsError {
    /// The HTTP status recorded on the batch. Transport failures have none
    /// and record 0.
    pub fn status(&self) -> u16 {
        match self {
            LmsError::Status { status, .. } => *status,
            LmsError::Transport(_) => 0,
        }
    }
}

#[async_trait::async_trait]
pub trait LmsImportApi: Send + Sync {
    async fn submit(
        &self,
        artifact: &ArtifactRef,
        override_sis_stickiness: bool,
    ) -> Result<RemoteImport, LmsError>;

    async fn status(&self, remote_id: &str) -> Result<RemoteStatus, LmsError>;
}
