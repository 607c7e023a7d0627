//! Per-kind batch size limits.

use serde::{Deserialize, Serialize};
use shared_types::{EntityKind, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub default: usize,
    /// Used for High and Immediate requests.
    pub high: usize,
}

impl TierLimits {
    pub const fn new(default: usize, high: usize) -> Self {
        Self { default, high }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportLimits {
    pub course: TierLimits,
    pub enrollment: TierLimits,
    pub group: TierLimits,
    pub user: TierLimits,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            course: TierLimits::new(300, 300),
            enrollment: TierLimits::new(1000, 100),
            group: TierLimits::new(500, 200),
            user: TierLimits::new(500, 200),
        }
    }
}

impl ImportLimits {
    pub fn tiers(&self, kind: EntityKind) -> TierLimits {
        match kind {
            EntityKind::Course => self.course,
            EntityKind::Enrollment => self.enrollment,
            EntityKind::Group => self.group,
            EntityKind::User => self.user,
        }
    }

    /// Batch size for a request at `tier`.
    pub fn for_request(&self, kind: EntityKind, tier: Priority) -> usize {
        let tiers = self.tiers(kind);
        if tier.is_urgent() {
            tiers.high
        } else {
            tiers.default
        }
    }

    /// Kinds with a zero limit, which could never dequeue anything.
    pub fn zero_limits(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|k| {
                let t = self.tiers(*k);
                t.default == 0 || t.high == 0
            })
            .collect()
    }
}
