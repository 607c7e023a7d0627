//! Inbound port for the import queue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared_types::{
    BatchId, EntityKind, Enrollment, ImportBatch, MemberGroupLink, Priority, QueueEntry,
    QueueableEntity, User,
};

use crate::domain::apply::{ApplyOutcome, EnrollmentApplied, UserUpdate};
use crate::error::QueueError;

pub trait ImportQueueApi: Send + Sync {
    // === Claiming ===

    /// Claim up to the kind's limit of unclaimed rows at `tier` or above as
    /// one new batch. `QueueError::Empty` when nothing qualifies.
    fn queue_by_priority(&self, kind: EntityKind, tier: Priority) -> Result<ImportBatch, QueueError>;

    /// Claim unclaimed rows modified at or after `since`.
    fn queue_by_modified_since(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<ImportBatch, QueueError>;

    /// Rows claimed by `batch`, in key order.
    fn claimed(&self, batch: BatchId) -> Result<Vec<QueueEntry>, QueueError>;

    /// Release the rows of `batch`. With `imported`, mark them provisioned
    /// and record their fingerprints in the export ledger.
    fn dequeue(&self, batch: BatchId, imported: bool) -> Result<usize, QueueError>;

    // === Batch records ===

    fn save_batch(&self, batch: &ImportBatch) -> Result<(), QueueError>;

    fn batch(&self, id: BatchId) -> Result<ImportBatch, QueueError>;

    fn batches(&self) -> Result<Vec<ImportBatch>, QueueError>;

    fn delete_batch(&self, id: BatchId) -> Result<(), QueueError>;

    fn ledger(&self) -> Result<BTreeMap<String, String>, QueueError>;

    // === Application ===

    fn upsert(&self, entity: QueueableEntity, priority: Priority) -> Result<bool, QueueError>;

    fn entries(&self, kind: EntityKind) -> Result<Vec<QueueEntry>, QueueError>;

    fn apply_enrollment(&self, enrollment: Enrollment) -> Result<EnrollmentApplied, QueueError>;

    fn raise_user(&self, net_id: &str, reg_id: &str, priority: Priority) -> Result<UserUpdate, QueueError>;

    fn add_user(&self, user: User, priority: Priority) -> Result<ApplyOutcome, QueueError>;

    fn link_member_group(&self, link: MemberGroupLink) -> Result<(), QueueError>;

    fn is_known_group(&self, group_id: &str) -> Result<bool, QueueError>;

    fn raise_group(&self, group_id: &str, priority: Priority) -> Result<usize, QueueError>;

    fn delete_group(&self, group_id: &str) -> Result<usize, QueueError>;

    fn rename_group(&self, old: &str, new: &str) -> Result<usize, QueueError>;

    /// Remove `None`-priority enrollments untouched for `retention_days`.
    fn purge_expired(&self, retention_days: u32) -> Result<usize, QueueError>;
}
