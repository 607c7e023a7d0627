//! Idempotent application of normalized events to queue rows.

use chrono::{DateTime, Utc};
use shared_types::{
    Course, Enrollment, EnrollmentStatus, EntityKind, MemberGroupLink, Priority, QueueEntry,
    QueueableEntity, User,
};

use super::state::QueueState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Added,
    Updated,
    /// The stored row is newer; nothing changed.
    Stale,
}

impl ApplyOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, ApplyOutcome::Stale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentApplied {
    pub outcome: ApplyOutcome,
    /// The enrollment's course was missing or unprovisioned and has been
    /// raised to High.
    pub course_queued: bool,
}

/// What a person change did to the stored user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserUpdate {
    Unknown,
    Unchanged,
    Raised,
    /// Conflicting rows were merged into one fresh High row.
    Merged,
}

/// The course row an enrollment belongs to. Independent study sections
/// get one course per instructor.
pub fn course_for(enrollment: &Enrollment) -> Course {
    let course_id = match &enrollment.instructor_reg_id {
        Some(instructor) => format!("{}-{}", enrollment.course_id, instructor),
        None => enrollment.course_id.clone(),
    };
    let term_id = enrollment
        .course_id
        .splitn(3, '-')
        .take(2)
        .collect::<Vec<_>>()
        .join("-");
    Course {
        course_id,
        term_id,
        primary_id: enrollment.primary_course_id.clone(),
        instructor_reg_id: enrollment.instructor_reg_id.clone(),
    }
}

fn is_user_match(entry: &QueueEntry, net_id: &str, reg_id: &str) -> bool {
    matches!(&entry.entity, QueueableEntity::User(u) if u.reg_id == reg_id || u.net_id == net_id)
}

impl QueueState {
    /// Upsert an enrollment keyed by `(course_id, reg_id, role)`.
    ///
    /// An existing row changes only when the event is newer, or equally
    /// recent and active. A changed row that is claimed by an in-flight batch
    /// is raised to High so the next batch picks up the change; otherwise it
    /// returns to Default.
    pub fn apply_enrollment(&mut self, enrollment: Enrollment, now: DateTime<Utc>) -> EnrollmentApplied {
        let course_queued = self.ensure_course(course_for(&enrollment), now);

        let entity = QueueableEntity::Enrollment(enrollment);
        let key = entity.natural_key().to_string();
        let outcome = match self.entries.get_mut(&key) {
            Some(existing) => {
                let QueueableEntity::Enrollment(incoming) = &entity else {
                    return EnrollmentApplied {
                        outcome: ApplyOutcome::Stale,
                        course_queued,
                    };
                };
                let newer = match &existing.entity {
                    QueueableEntity::Enrollment(stored) => {
                        incoming.last_modified > stored.last_modified
                            || (incoming.last_modified == stored.last_modified
                                && incoming.status == EnrollmentStatus::Active)
                    }
                    _ => true,
                };
                if newer {
                    existing.priority = if existing.is_claimed() {
                        Priority::High
                    } else {
                        Priority::Default
                    };
                    existing.entity = entity;
                    existing.modified_at = now;
                    ApplyOutcome::Updated
                } else {
                    ApplyOutcome::Stale
                }
            }
            None => {
                self.entries
                    .insert(key, QueueEntry::new(entity, Priority::Default, now));
                ApplyOutcome::Added
            }
        };

        EnrollmentApplied {
            outcome,
            course_queued,
        }
    }

    /// Make sure `course` exists and, until provisioned, sits at High.
    fn ensure_course(&mut self, course: Course, now: DateTime<Utc>) -> bool {
        let entity = QueueableEntity::Course(course);
        let key = entity.natural_key().to_string();
        match self.entries.get_mut(&key) {
            Some(existing) if existing.provisioned_at.is_some() => false,
            Some(existing) if existing.priority >= Priority::High => false,
            Some(existing) => {
                existing.priority = Priority::High;
                existing.modified_at = now;
                true
            }
            None => {
                self.entries
                    .insert(key, QueueEntry::new(entity, Priority::High, now));
                true
            }
        }
    }

    /// Keys of user rows matching either identifier.
    fn user_keys(&self, net_id: &str, reg_id: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| is_user_match(e, net_id, reg_id))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Replace several conflicting user rows with one fresh High row.
    fn merge_users(&mut self, keys: &[String], user: User, now: DateTime<Utc>) {
        for key in keys {
            self.entries.remove(key);
        }
        self.upsert(QueueableEntity::User(user), Priority::High, now);
    }

    /// Set the priority of the user matching `net_id` or `reg_id`.
    pub fn raise_user(&mut self, net_id: &str, reg_id: &str, priority: Priority, now: DateTime<Utc>) -> UserUpdate {
        let keys = self.user_keys(net_id, reg_id);
        match keys.as_slice() {
            [] => UserUpdate::Unknown,
            [key] => match self.entries.get_mut(key) {
                Some(entry) if entry.priority != priority => {
                    entry.priority = priority;
                    entry.modified_at = now;
                    UserUpdate::Raised
                }
                _ => UserUpdate::Unchanged,
            },
            _ => {
                let user = User {
                    reg_id: reg_id.to_string(),
                    net_id: net_id.to_string(),
                };
                self.merge_users(&keys, user, now);
                UserUpdate::Merged
            }
        }
    }

    /// Add or refresh a user row at `priority`.
    pub fn add_user(&mut self, user: User, priority: Priority, now: DateTime<Utc>) -> ApplyOutcome {
        let keys = self.user_keys(&user.net_id, &user.reg_id);
        match keys.as_slice() {
            [] => {
                self.upsert(QueueableEntity::User(user), priority, now);
                ApplyOutcome::Added
            }
            [key] => {
                let Some(entry) = self.entries.get(key) else {
                    return ApplyOutcome::Stale;
                };
                let same = entry.priority == priority
                    && matches!(&entry.entity, QueueableEntity::User(u) if *u == user);
                if same {
                    return ApplyOutcome::Stale;
                }
                // The reg id may have changed, which changes the key.
                if let Some(mut entry) = self.entries.remove(key) {
                    entry.entity = QueueableEntity::User(user);
                    entry.priority = priority;
                    entry.modified_at = now;
                    self.entries.insert(entry.key().to_string(), entry);
                }
                ApplyOutcome::Updated
            }
            _ => {
                self.merge_users(&keys, user, now);
                ApplyOutcome::Updated
            }
        }
    }

    pub fn link_member_group(&mut self, link: MemberGroupLink) {
        let exists = self
            .member_groups
            .iter_mut()
            .find(|l| l.group_id == link.group_id && l.root_group_id == link.root_group_id);
        match exists {
            Some(l) => l.is_deleted = link.is_deleted,
            None => self.member_groups.push(link),
        }
    }

    fn active_group_keys(&self, group_id: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| {
                e.priority > Priority::None
                    && matches!(&e.entity, QueueableEntity::Group(g) if g.group_id == group_id && !g.is_deleted)
            })
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// True when an active course group row or member-group link uses
    /// `group_id`.
    pub fn is_known_group(&self, group_id: &str) -> bool {
        !self.active_group_keys(group_id).is_empty()
            || self
                .member_groups
                .iter()
                .any(|l| l.group_id == group_id && !l.is_deleted)
    }

    fn set_priority(&mut self, keys: &[String], priority: Priority, now: DateTime<Utc>) -> usize {
        let mut changed = 0;
        for key in keys {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.priority = priority;
                entry.modified_at = now;
                changed += 1;
            }
        }
        changed
    }

    fn root_groups_of(&self, group_id: &str) -> Vec<String> {
        self.member_groups
            .iter()
            .filter(|l| l.group_id == group_id && !l.is_deleted)
            .map(|l| l.root_group_id.clone())
            .collect()
    }

    /// Raise every active row for `group_id`, and for each root group that
    /// includes it as a member group.
    pub fn raise_group(&mut self, group_id: &str, priority: Priority, now: DateTime<Utc>) -> usize {
        let mut keys = self.active_group_keys(group_id);
        for root in self.root_groups_of(group_id) {
            keys.extend(self.active_group_keys(&root));
        }
        keys.sort();
        keys.dedup();
        self.set_priority(&keys, priority, now)
    }

    /// Mark `group_id` deleted at Immediate, deactivate the member-group
    /// links naming it and raise their root groups to Immediate.
    pub fn delete_group(&mut self, group_id: &str, now: DateTime<Utc>) -> usize {
        let keys = self.active_group_keys(group_id);
        for key in &keys {
            if let Some(entry) = self.entries.get_mut(key) {
                if let QueueableEntity::Group(g) = &mut entry.entity {
                    g.is_deleted = true;
                }
                entry.priority = Priority::Immediate;
                entry.modified_at = now;
            }
        }

        let roots = self.root_groups_of(group_id);
        for link in self
            .member_groups
            .iter_mut()
            .filter(|l| l.group_id == group_id)
        {
            link.is_deleted = true;
        }
        let mut root_keys = Vec::new();
        for root in roots {
            root_keys.extend(self.active_group_keys(&root));
        }
        keys.len() + self.set_priority(&root_keys, Priority::Immediate, now)
    }

    /// Rename a group everywhere it is referenced.
    pub fn rename_group(&mut self, old: &str, new: &str, now: DateTime<Utc>) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| matches!(&e.entity, QueueableEntity::Group(g) if g.group_id == old))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &keys {
            if let Some(mut entry) = self.entries.remove(key) {
                if let QueueableEntity::Group(g) = &mut entry.entity {
                    g.group_id = new.to_string();
                }
                entry.modified_at = now;
                let key = entry.key().to_string();
                match self.entries.get_mut(&key) {
                    // A row already under the new name absorbs the renamed one.
                    Some(existing) => {
                        existing.priority = existing.priority.max(entry.priority);
                        existing.claim = existing.claim.take().or(entry.claim);
                        existing.modified_at = now;
                    }
                    None => {
                        self.entries.insert(key, entry);
                    }
                }
            }
        }

        let mut links = 0;
        for link in self.member_groups.iter_mut() {
            if link.group_id == old {
                link.group_id = new.to_string();
                links += 1;
            }
            if link.root_group_id == old {
                link.root_group_id = new.to_string();
                links += 1;
            }
        }
        keys.len() + links
    }

    /// Drop enrollments at `None` last modified before `horizon`.
    pub fn purge_expired(&mut self, horizon: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| {
            !(e.priority == Priority::None
                && e.entity.kind() == EntityKind::Enrollment
                && matches!(&e.entity, QueueableEntity::Enrollment(en) if en.last_modified < horizon))
        });
        before - self.entries.len()
    }
}
