//! Claim selection.
//!
//! Candidates are unclaimed rows of one kind above `None` at or above the
//! requested tier, ordered by:
//!
//! 1. priority, highest first
//! 2. `provisioned_at`, never-provisioned first
//! 3. `added_at`
//! 4. natural key
//!
//! Group rows are claimed per course: the limit counts distinct courses and
//! every candidate row of a selected course joins the batch.

use std::cmp::{Ordering, Reverse};

use chrono::{DateTime, Utc};
use shared_types::{BatchId, EntityKind, Priority, QueueEntry, QueueableEntity};

use super::state::QueueState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimRequest {
    pub kind: EntityKind,
    pub tier: Priority,
    pub limit: usize,
    pub modified_since: Option<DateTime<Utc>>,
}

fn order(a: &(&String, &QueueEntry), b: &(&String, &QueueEntry)) -> Ordering {
    Reverse(a.1.priority)
        .cmp(&Reverse(b.1.priority))
        .then_with(|| a.1.provisioned_at.cmp(&b.1.provisioned_at))
        .then_with(|| a.1.added_at.cmp(&b.1.added_at))
        .then_with(|| a.0.cmp(b.0))
}

impl QueueState {
    /// Keys that a claim for `request` would take, in claim order.
    pub fn claimable(&self, request: &ClaimRequest) -> Vec<String> {
        let floor = request.tier.max(Priority::Default);
        let mut candidates: Vec<(&String, &QueueEntry)> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.entity.kind() == request.kind
                    && e.claim.is_none()
                    && e.priority >= floor
                    && request.modified_since.map_or(true, |ts| e.modified_at >= ts)
            })
            .collect();
        candidates.sort_by(order);

        if request.kind != EntityKind::Group {
            return candidates
                .into_iter()
                .take(request.limit)
                .map(|(k, _)| k.clone())
                .collect();
        }

        let mut courses: Vec<&str> = Vec::new();
        for (_, entry) in &candidates {
            if let QueueableEntity::Group(g) = &entry.entity {
                if !courses.contains(&g.course_id.as_str()) {
                    if courses.len() == request.limit {
                        break;
                    }
                    courses.push(&g.course_id);
                }
            }
        }
        candidates
            .into_iter()
            .filter(|(_, e)| match &e.entity {
                QueueableEntity::Group(g) => courses.contains(&g.course_id.as_str()),
                _ => false,
            })
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Stamp `batch` on every row `claimable` selects. Selection and stamp
    /// happen on the same state, so callers holding it exclusively get an
    /// atomic claim.
    pub fn claim(&mut self, request: &ClaimRequest, batch: BatchId) -> usize {
        let keys = self.claimable(request);
        for key in &keys {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.claim = Some(batch);
            }
        }
        keys.len()
    }
}
