//! Inbound port for the batch builder.

use std::collections::BTreeMap;

use shared_types::{ArtifactRef, ImportBatch, QueueableEntity};

use crate::error::BuildError;

#[async_trait::async_trait]
pub trait BatchBuilderApi: Send + Sync {
    /// Write the export artifact for `entities`, the rows `batch` claimed.
    ///
    /// The mode is the batch's mode after urgency promotion. In delta mode
    /// an entity whose fingerprint equals its `ledger` entry is left out.
    /// `BuildError::MissingArtifact` when no row remains.
    async fn build(
        &self,
        batch: &ImportBatch,
        entities: &[QueueableEntity],
        ledger: &BTreeMap<String, String>,
    ) -> Result<ArtifactRef, BuildError>;
}
