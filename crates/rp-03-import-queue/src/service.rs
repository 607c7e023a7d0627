//! # Import Queue Service
//!
//! Implements [`ImportQueueApi`] over any [`QueueStorage`]. Each operation is
//! exactly one storage transaction.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use shared_types::{
    BatchId, BuildMode, EntityKind, Enrollment, ImportBatch, MemberGroupLink, Priority,
    QueueEntry, QueueableEntity, TimeSource, User,
};
use tracing::{debug, info};

use crate::domain::apply::{ApplyOutcome, EnrollmentApplied, UserUpdate};
use crate::domain::claim::ClaimRequest;
use crate::domain::limits::ImportLimits;
use crate::domain::state::QueueState;
use crate::error::QueueError;
use crate::ports::inbound::ImportQueueApi;
use crate::ports::outbound::QueueStorage;

/// Days a fully-provisioned enrollment row is kept.
pub const ENROLLMENT_RETENTION_DAYS: u32 = 180;

pub struct ImportQueue<S: QueueStorage, T: TimeSource> {
    storage: S,
    clock: T,
    limits: ImportLimits,
}

impl<S: QueueStorage, T: TimeSource> ImportQueue<S, T> {
    pub fn new(storage: S, clock: T, limits: ImportLimits) -> Self {
        Self {
            storage,
            clock,
            limits,
        }
    }

    pub fn limits(&self) -> &ImportLimits {
        &self.limits
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> Result<R, QueueError> {
        let mut f = Some(f);
        let mut out = None;
        self.storage.transaction(&mut |state| {
            if let Some(f) = f.take() {
                out = Some(f(state));
            }
        })?;
        out.ok_or(QueueError::TransactionAborted)
    }

    fn inspect<R>(&self, f: impl FnOnce(&QueueState) -> R) -> Result<R, QueueError> {
        let mut f = Some(f);
        let mut out = None;
        self.storage.read(&mut |state| {
            if let Some(f) = f.take() {
                out = Some(f(state));
            }
        })?;
        out.ok_or(QueueError::TransactionAborted)
    }

    fn claim_batch(&self, request: ClaimRequest, batch: ImportBatch) -> Result<ImportBatch, QueueError> {
        let claimed = self.mutate(|state| {
            let claimed = state.claim(&request, batch.id);
            if claimed > 0 {
                state.put_batch(batch.clone());
            }
            claimed
        })?;

        if claimed == 0 {
            debug!(kind = %request.kind, tier = %request.tier, "queue empty");
            return Err(QueueError::Empty(request.kind));
        }
        info!(
            batch_id = %batch.id,
            kind = %request.kind,
            priority = %batch.priority,
            claimed,
            "batch claimed"
        );
        Ok(batch)
    }
}

impl<S: QueueStorage, T: TimeSource> ImportQueueApi for ImportQueue<S, T> {
    fn queue_by_priority(&self, kind: EntityKind, tier: Priority) -> Result<ImportBatch, QueueError> {
        let mut batch = ImportBatch::new(kind, tier, self.clock.now());
        batch.mode = BuildMode::Delta.effective(tier);
        batch.override_sis_stickiness = kind == EntityKind::User && tier.is_urgent();

        let request = ClaimRequest {
            kind,
            tier,
            limit: self.limits.for_request(kind, tier),
            modified_since: None,
        };
        self.claim_batch(request, batch)
    }

    fn queue_by_modified_since(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<ImportBatch, QueueError> {
        let batch = ImportBatch::new(kind, Priority::Default, self.clock.now());
        let request = ClaimRequest {
            kind,
            tier: Priority::Default,
            limit: self.limits.for_request(kind, Priority::Default),
            modified_since: Some(since),
        };
        self.claim_batch(request, batch)
    }

    fn claimed(&self, batch: BatchId) -> Result<Vec<QueueEntry>, QueueError> {
        self.inspect(|state| state.claimed_by(batch))
    }

    fn dequeue(&self, batch: BatchId, imported: bool) -> Result<usize, QueueError> {
        let now = self.clock.now();
        let (released, purged) = self.mutate(|state| {
            let kind = state.batch(batch).map(|b| b.kind);
            let released = state.release(batch, imported.then_some(now));
            let purged = if imported && kind == Some(EntityKind::Enrollment) {
                state.purge_expired(now - Duration::days(i64::from(ENROLLMENT_RETENTION_DAYS)))
            } else {
                0
            };
            (released, purged)
        })?;
        info!(batch_id = %batch, imported, released, purged, "batch dequeued");
        Ok(released)
    }

    fn save_batch(&self, batch: &ImportBatch) -> Result<(), QueueError> {
        self.mutate(|state| state.put_batch(batch.clone()))
    }

    fn batch(&self, id: BatchId) -> Result<ImportBatch, QueueError> {
        self.inspect(|state| state.batch(id).cloned())?
            .ok_or(QueueError::BatchNotFound(id))
    }

    fn batches(&self) -> Result<Vec<ImportBatch>, QueueError> {
        let mut batches = self.inspect(|state| state.batches.values().cloned().collect::<Vec<_>>())?;
        batches.sort_by_key(|b| (b.created_at, b.id));
        Ok(batches)
    }

    fn delete_batch(&self, id: BatchId) -> Result<(), QueueError> {
        self.mutate(|state| state.remove_batch(id))?
            .map(|_| ())
            .ok_or(QueueError::BatchNotFound(id))
    }

    fn ledger(&self) -> Result<BTreeMap<String, String>, QueueError> {
        self.inspect(|state| state.ledger.clone())
    }

    fn upsert(&self, entity: QueueableEntity, priority: Priority) -> Result<bool, QueueError> {
        let now = self.clock.now();
        self.mutate(|state| state.upsert(entity, priority, now))
    }

    fn entries(&self, kind: EntityKind) -> Result<Vec<QueueEntry>, QueueError> {
        self.inspect(|state| state.of_kind(kind).cloned().collect())
    }

    fn apply_enrollment(&self, enrollment: Enrollment) -> Result<EnrollmentApplied, QueueError> {
        let now = self.clock.now();
        let course_id = enrollment.course_id.clone();
        let reg_id = enrollment.reg_id.clone();
        let role = enrollment.role;
        let status = enrollment.status;
        let last_modified = enrollment.last_modified;

        let applied = self.mutate(|state| state.apply_enrollment(enrollment, now))?;
        let verb = match applied.outcome {
            ApplyOutcome::Added => "ADD",
            ApplyOutcome::Updated => "UPDATE",
            ApplyOutcome::Stale => "IGNORE (stale)",
        };
        info!(
            "ENROLLMENT: {verb} {course_id}, {reg_id}, {role}, {status}, {}",
            last_modified.to_rfc3339()
        );
        if applied.course_queued {
            info!("ENROLLMENT: course {course_id} queued at high priority");
        }
        Ok(applied)
    }

    fn raise_user(&self, net_id: &str, reg_id: &str, priority: Priority) -> Result<UserUpdate, QueueError> {
        let now = self.clock.now();
        self.mutate(|state| state.raise_user(net_id, reg_id, priority, now))
    }

    fn add_user(&self, user: User, priority: Priority) -> Result<ApplyOutcome, QueueError> {
        let now = self.clock.now();
        self.mutate(|state| state.add_user(user, priority, now))
    }

    fn link_member_group(&self, link: MemberGroupLink) -> Result<(), QueueError> {
        self.mutate(|state| state.link_member_group(link))
    }

    fn is_known_group(&self, group_id: &str) -> Result<bool, QueueError> {
        self.inspect(|state| state.is_known_group(group_id))
    }

    fn raise_group(&self, group_id: &str, priority: Priority) -> Result<usize, QueueError> {
        let now = self.clock.now();
        self.mutate(|state| state.raise_group(group_id, priority, now))
    }

    fn delete_group(&self, group_id: &str) -> Result<usize, QueueError> {
        let now = self.clock.now();
        self.mutate(|state| state.delete_group(group_id, now))
    }

    fn rename_group(&self, old: &str, new: &str) -> Result<usize, QueueError> {
        let now = self.clock.now();
        self.mutate(|state| state.rename_group(old, new, now))
    }

    fn purge_expired(&self, retention_days: u32) -> Result<usize, QueueError> {
        let horizon = self.clock.now() - Duration::days(i64::from(retention_days));
        let purged = self.mutate(|state| state.purge_expired(horizon))?;
        info!(purged, retention_days, "expired enrollments purged");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file::FileQueueStorage;
    use crate::adapters::memory::InMemoryQueueStorage;
    use crate::domain::limits::TierLimits;
    use chrono::TimeZone;
    use shared_types::{EnrollmentRole, EnrollmentStatus, ManualTimeSource};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap()
    }

    fn queue() -> ImportQueue<InMemoryQueueStorage, Arc<ManualTimeSource>> {
        ImportQueue::new(
            InMemoryQueueStorage::new(),
            Arc::new(ManualTimeSource::new(t0())),
            ImportLimits::default(),
        )
    }

    fn user(i: usize) -> QueueableEntity {
        QueueableEntity::User(User {
            reg_id: format!("R{i:03}"),
            net_id: format!("u{i:03}"),
        })
    }

    fn enrollment(reg: &str) -> Enrollment {
        Enrollment {
            course_id: "2024-spring-CSE-142-A".into(),
            reg_id: reg.into(),
            role: EnrollmentRole::Student,
            status: EnrollmentStatus::Active,
            last_modified: t0(),
            request_date: None,
            primary_course_id: None,
            instructor_reg_id: None,
            duplicate_code: None,
            standby: false,
        }
    }

    #[test]
    fn test_empty_queue_is_reported() {
        let q = queue();
        let err = q.queue_by_priority(EntityKind::User, Priority::Default).unwrap_err();
        assert!(err.is_empty());
        assert!(q.batches().unwrap().is_empty());
    }

    #[test]
    fn test_immediate_request_takes_only_immediate_rows() {
        let q = queue();
        for i in 0..3 {
            q.upsert(user(i), Priority::Default).unwrap();
        }
        for i in 3..5 {
            q.upsert(user(i), Priority::Immediate).unwrap();
        }

        let batch = q.queue_by_priority(EntityKind::User, Priority::Immediate).unwrap();
        let claimed = q.claimed(batch.id).unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.iter().all(|e| e.priority == Priority::Immediate));
        assert!(batch.override_sis_stickiness);
        assert_eq!(batch.mode, BuildMode::Full);
    }

    #[test]
    fn test_default_request_orders_immediate_first_within_limit() {
        let limits = ImportLimits {
            user: TierLimits::new(3, 3),
            ..ImportLimits::default()
        };
        let q = ImportQueue::new(
            InMemoryQueueStorage::new(),
            Arc::new(ManualTimeSource::new(t0())),
            limits,
        );
        for i in 0..4 {
            q.upsert(user(i), Priority::Default).unwrap();
        }
        q.upsert(user(9), Priority::Immediate).unwrap();

        let batch = q.queue_by_priority(EntityKind::User, Priority::Default).unwrap();
        let claimed = q.claimed(batch.id).unwrap();
        assert_eq!(claimed.len(), 3);
        assert!(claimed.iter().any(|e| e.priority == Priority::Immediate));
        assert!(!batch.override_sis_stickiness);
    }

    #[test]
    fn test_dequeue_imported_enrollment_steps_down() {
        let q = queue();
        q.apply_enrollment(enrollment("AAAA")).unwrap();
        let batch = q.queue_by_priority(EntityKind::Enrollment, Priority::Default).unwrap();
        assert_eq!(q.dequeue(batch.id, true).unwrap(), 1);

        let rows = q.entries(EntityKind::Enrollment).unwrap();
        assert_eq!(rows[0].priority, Priority::None);
        assert_eq!(rows[0].claim, None);
        assert_eq!(rows[0].provisioned_at, Some(t0()));
        assert!(q.queue_by_priority(EntityKind::Enrollment, Priority::Default).is_err());
    }

    #[test]
    fn test_failed_dequeue_keeps_priority() {
        let q = queue();
        q.upsert(user(1), Priority::High).unwrap();
        let batch = q.queue_by_priority(EntityKind::User, Priority::High).unwrap();
        q.dequeue(batch.id, false).unwrap();

        let rows = q.entries(EntityKind::User).unwrap();
        assert_eq!(rows[0].priority, Priority::High);
        assert_eq!(rows[0].provisioned_at, None);
        assert!(q.queue_by_priority(EntityKind::User, Priority::High).is_ok());
    }

    #[test]
    fn test_batch_record_lifecycle() {
        let q = queue();
        q.upsert(user(1), Priority::Default).unwrap();
        let mut batch = q.queue_by_priority(EntityKind::User, Priority::Default).unwrap();
        assert_eq!(q.batch(batch.id).unwrap().id, batch.id);

        batch.remote_id = Some("42".into());
        q.save_batch(&batch).unwrap();
        assert_eq!(q.batch(batch.id).unwrap().remote_id.as_deref(), Some("42"));

        q.delete_batch(batch.id).unwrap();
        assert!(matches!(q.batch(batch.id), Err(QueueError::BatchNotFound(_))));
        assert!(q.delete_batch(batch.id).is_err());
    }

    #[test]
    fn test_concurrent_claims_never_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        let limits = ImportLimits {
            user: TierLimits::new(7, 7),
            ..ImportLimits::default()
        };
        let clock = Arc::new(ManualTimeSource::new(t0()));

        let seed = ImportQueue::new(FileQueueStorage::open(&path), clock.clone(), limits);
        for i in 0..60 {
            seed.upsert(user(i), Priority::Default).unwrap();
        }

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let path = path.clone();
                let clock = clock.clone();
                std::thread::spawn(move || {
                    let q = ImportQueue::new(FileQueueStorage::open(&path), clock, limits);
                    let mut claimed = Vec::new();
                    while let Ok(batch) = q.queue_by_priority(EntityKind::User, Priority::Default) {
                        for entry in q.claimed(batch.id).unwrap() {
                            claimed.push(entry.key().to_string());
                        }
                    }
                    claimed
                })
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(seen.insert(key), "key claimed twice");
                total += 1;
            }
        }
        assert_eq!(total, 60);
    }

    #[test]
    fn test_purge_uses_retention_horizon() {
        let clock = Arc::new(ManualTimeSource::new(t0()));
        let q = ImportQueue::new(InMemoryQueueStorage::new(), clock.clone(), ImportLimits::default());
        q.apply_enrollment(enrollment("AAAA")).unwrap();
        let batch = q.queue_by_priority(EntityKind::Enrollment, Priority::Default).unwrap();
        q.dequeue(batch.id, true).unwrap();

        assert_eq!(q.purge_expired(ENROLLMENT_RETENTION_DAYS).unwrap(), 0);
        clock.advance(Duration::days(181));
        assert_eq!(q.purge_expired(ENROLLMENT_RETENTION_DAYS).unwrap(), 1);
    }
}
