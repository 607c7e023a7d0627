//! # Batch Builder Service
//!
//! Implements [`BatchBuilderApi`]: entity rows, delta filtering against the
//! export ledger, rendering and artifact storage.

use std::collections::BTreeMap;

use shared_crypto::Sha256Hasher;
use shared_types::{ArtifactRef, BuildMode, Course, EntityKind, ImportBatch, QueueableEntity};
use tracing::{debug, info};

use crate::domain::collector::{Collector, RenderedFile};
use crate::domain::rows::{
    course_rows, enrollment_rows, fingerprint, group_rows, section_listing_row, user_rows,
    ExportRow,
};
use crate::error::BuildError;
use crate::ports::inbound::BatchBuilderApi;
use crate::ports::outbound::{ArtifactStore, RosterSource};

pub struct BatchBuilder<R: RosterSource, A: ArtifactStore> {
    roster: R,
    store: A,
}

/// SHA-256 over each file's name and contents, in file order.
pub fn artifact_digest(files: &[RenderedFile]) -> String {
    let mut hasher = Sha256Hasher::new();
    for rendered in files {
        hasher
            .update(rendered.file.file_name().as_bytes())
            .update(b"\n")
            .update(rendered.contents.as_bytes());
    }
    hasher.finalize_hex()
}

impl<R: RosterSource, A: ArtifactStore> BatchBuilder<R, A> {
    pub fn new(roster: R, store: A) -> Self {
        Self { roster, store }
    }

    pub fn store(&self) -> &A {
        &self.store
    }

    pub fn roster(&self) -> &R {
        &self.roster
    }

    async fn rows_for(&self, entity: &QueueableEntity) -> Result<Vec<ExportRow>, BuildError> {
        Ok(match entity {
            QueueableEntity::Course(course) => course_rows(course)?,
            QueueableEntity::Enrollment(enrollment) => enrollment_rows(enrollment),
            QueueableEntity::Group(group) => group_rows(group),
            QueueableEntity::User(user) => {
                let profile = self.roster.user_profile(user).await?;
                user_rows(user, profile.as_ref())
            }
        })
    }
}

#[async_trait::async_trait]
impl<R: RosterSource, A: ArtifactStore> BatchBuilderApi for BatchBuilder<R, A> {
    async fn build(
        &self,
        batch: &ImportBatch,
        entities: &[QueueableEntity],
        ledger: &BTreeMap<String, String>,
    ) -> Result<ArtifactRef, BuildError> {
        if let Some(other) = entities.iter().find(|e| e.kind() != batch.kind) {
            return Err(BuildError::KindMismatch {
                expected: batch.kind,
                found: other.kind(),
            });
        }
        let mode = batch.mode.effective(batch.priority);

        let mut sorted: Vec<(String, &QueueableEntity)> = entities
            .iter()
            .map(|e| (e.natural_key().to_string(), e))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted.dedup_by(|a, b| a.0 == b.0);

        let mut collector = Collector::new();
        let mut fingerprints = BTreeMap::new();
        let mut unchanged = 0usize;
        for (key, entity) in &sorted {
            let rows = self.rows_for(entity).await?;
            let print = fingerprint(&rows);
            if mode == BuildMode::Delta && ledger.get(key) == Some(&print) {
                unchanged += 1;
                continue;
            }
            collector.extend(rows);
            fingerprints.insert(key.clone(), print);
        }

        if mode == BuildMode::Full && batch.kind == EntityKind::Course {
            let courses: Vec<&Course> = sorted
                .iter()
                .filter_map(|(_, e)| match e {
                    QueueableEntity::Course(course) => Some(course),
                    _ => None,
                })
                .collect();
            for course in courses {
                let listings = self.roster.course_sections(course).await?;
                collector.extend(listings.iter().map(section_listing_row));
            }
        }

        if collector.is_empty() {
            debug!(batch_id = %batch.id, unchanged, "nothing to export");
            return Err(BuildError::MissingArtifact);
        }

        let files = collector.render();
        let digest = artifact_digest(&files);
        let path = self.store.write(batch.id, &files)?;
        let artifact = ArtifactRef {
            path,
            digest,
            files: files.iter().map(|f| f.file.file_name().to_string()).collect(),
            row_count: collector.row_count(),
            fingerprints,
        };
        info!(
            batch_id = %batch.id,
            kind = %batch.kind,
            mode = ?mode,
            rows = artifact.row_count,
            unchanged,
            digest = %artifact.digest,
            "artifact built"
        );
        Ok(artifact)
    }
}
