//! The persisted queue document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{
    BatchId, EntityKind, ImportBatch, MemberGroupLink, NaturalKey, Priority, QueueEntry,
    QueueableEntity,
};

/// Everything the queue persists, mutated as one unit.
///
/// Rows are keyed by the `Display` form of their [`NaturalKey`], so a key
/// can never map to two rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(default)]
    pub entries: BTreeMap<String, QueueEntry>,
    #[serde(default)]
    pub member_groups: Vec<MemberGroupLink>,
    /// Import batches by id.
    #[serde(default)]
    pub batches: BTreeMap<String, ImportBatch>,
    /// Fingerprint of the last imported row per natural key.
    #[serde(default)]
    pub ledger: BTreeMap<String, String>,
}

impl QueueState {
    pub fn entry(&self, key: &NaturalKey) -> Option<&QueueEntry> {
        self.entries.get(&key.to_string())
    }

    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &QueueEntry> {
        self.entries.values().filter(move |e| e.entity.kind() == kind)
    }

    /// Rows carrying `batch` as their claim, in key order.
    pub fn claimed_by(&self, batch: BatchId) -> Vec<QueueEntry> {
        self.entries
            .values()
            .filter(|e| e.claim == Some(batch))
            .cloned()
            .collect()
    }

    /// Insert `entity` or replace the row with the same key. Returns true
    /// when a new row was created. Claim and history survive replacement.
    pub fn upsert(&mut self, entity: QueueableEntity, priority: Priority, now: DateTime<Utc>) -> bool {
        let key = entity.natural_key().to_string();
        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.entity = entity;
                existing.priority = priority;
                existing.modified_at = now;
                false
            }
            None => {
                self.entries.insert(key, QueueEntry::new(entity, priority, now));
                true
            }
        }
    }

    pub fn batch(&self, id: BatchId) -> Option<&ImportBatch> {
        self.batches.get(&id.to_string())
    }

    pub fn put_batch(&mut self, batch: ImportBatch) {
        self.batches.insert(batch.id.to_string(), batch);
    }

    pub fn remove_batch(&mut self, id: BatchId) -> Option<ImportBatch> {
        self.batches.remove(&id.to_string())
    }

    /// Clear the claim of every row in `batch`.
    ///
    /// With `imported_at`, the rows are also marked provisioned: enrollments
    /// step down one tier, other kinds return to Default, and the batch's
    /// row fingerprints are copied into the ledger.
    pub fn release(&mut self, batch: BatchId, imported_at: Option<DateTime<Utc>>) -> usize {
        let mut released = 0;
        for entry in self.entries.values_mut().filter(|e| e.claim == Some(batch)) {
            entry.claim = None;
            if let Some(at) = imported_at {
                entry.provisioned_at = Some(at);
                entry.priority = match entry.entity.kind() {
                    EntityKind::Enrollment => entry.priority.decremented(),
                    _ => Priority::Default,
                };
            }
            released += 1;
        }

        if imported_at.is_some() {
            let fingerprints = self
                .batch(batch)
                .and_then(|b| b.artifact.as_ref())
                .map(|a| a.fingerprints.clone())
                .unwrap_or_default();
            self.ledger.extend(fingerprints);
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_types::{ArtifactRef, User};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap()
    }

    fn user(reg: &str) -> QueueableEntity {
        QueueableEntity::User(User {
            reg_id: reg.into(),
            net_id: format!("net{reg}"),
        })
    }

    #[test]
    fn test_upsert_keeps_one_row_per_key() {
        let mut state = QueueState::default();
        assert!(state.upsert(user("A"), Priority::Default, now()));
        assert!(!state.upsert(user("A"), Priority::High, now()));
        assert_eq!(state.entries.len(), 1);
        assert_eq!(
            state.entry(&user("A").natural_key()).unwrap().priority,
            Priority::High
        );
    }

    #[test]
    fn test_release_after_import_updates_ledger() {
        let mut state = QueueState::default();
        state.upsert(user("A"), Priority::High, now());
        let mut batch = ImportBatch::new(EntityKind::User, Priority::High, now());
        let key = user("A").natural_key().to_string();
        batch.artifact = Some(ArtifactRef {
            path: "/tmp/x".into(),
            digest: "d".into(),
            files: vec!["users.csv".into()],
            row_count: 1,
            fingerprints: BTreeMap::from([(key.clone(), "f1".to_string())]),
        });
        state.entries.get_mut(&key).unwrap().claim = Some(batch.id);
        let id = batch.id;
        state.put_batch(batch);

        assert_eq!(state.release(id, Some(now())), 1);
        let entry = &state.entries[&key];
        assert_eq!(entry.claim, None);
        assert_eq!(entry.priority, Priority::Default);
        assert_eq!(entry.provisioned_at, Some(now()));
        assert_eq!(state.ledger[&key], "f1");
    }

    #[test]
    fn test_release_without_import_only_clears_claim() {
        let mut state = QueueState::default();
        state.upsert(user("A"), Priority::High, now());
        let id = BatchId::new();
        let key = user("A").natural_key().to_string();
        state.entries.get_mut(&key).unwrap().claim = Some(id);

        assert_eq!(state.release(id, None), 1);
        let entry = &state.entries[&key];
        assert_eq!(entry.claim, None);
        assert_eq!(entry.priority, Priority::High);
        assert_eq!(entry.provisioned_at, None);
        assert!(state.ledger.is_empty());
    }
}
