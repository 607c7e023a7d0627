//! # Queueable Entities
//!
//! The records the import queue carries between event intake and batch
//! submission.
//!
//! ## Kinds
//!
//! | Kind | Natural key |
//! |------|-------------|
//! | Course | `course_id` |
//! | Enrollment | `course_id`, `reg_id`, `role` |
//! | Group | `course_id`, `group_id`, `role` |
//! | User | `reg_id` |
//!
//! A natural key maps to at most one live row. Applying an equivalent event
//! twice updates that row in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::batch::BatchId;

// =============================================================================
// PRIORITY
// =============================================================================

/// Ordered priority tiers. `None` rows are parked and never dequeued.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    None = 0,
    #[default]
    Default = 1,
    High = 2,
    Immediate = 3,
}

impl Priority {
    /// Display label used in logs and status output.
    pub fn label(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Default => "normal",
            Priority::High => "high",
            Priority::Immediate => "immediate",
        }
    }

    /// One tier lower, saturating at `None`.
    pub fn decremented(self) -> Self {
        match self {
            Priority::Immediate => Priority::High,
            Priority::High => Priority::Default,
            Priority::Default | Priority::None => Priority::None,
        }
    }

    /// High and immediate work demands completeness over speed.
    pub fn is_urgent(self) -> bool {
        self >= Priority::High
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Priority::None),
            "default" | "normal" => Ok(Priority::Default),
            "high" => Ok(Priority::High),
            "immediate" => Ok(Priority::Immediate),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

// =============================================================================
// KINDS AND KEYS
// =============================================================================

/// The homogeneous type of a batch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Course,
    Enrollment,
    Group,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Course,
        EntityKind::Enrollment,
        EntityKind::Group,
        EntityKind::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Course => "course",
            EntityKind::Enrollment => "enrollment",
            EntityKind::Group => "group",
            EntityKind::User => "user",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "course" => Ok(EntityKind::Course),
            "enrollment" => Ok(EntityKind::Enrollment),
            "group" => Ok(EntityKind::Group),
            "user" => Ok(EntityKind::User),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Domain-unique identity of a queued row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub kind: EntityKind,
    pub id: String,
}

impl NaturalKey {
    fn compose(kind: EntityKind, parts: &[&str]) -> Self {
        Self {
            kind,
            id: parts.join("|"),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A course section as provisioned in the LMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// `2024-spring-CSE-142-A`
    pub course_id: String,
    /// `2024-spring`
    pub term_id: String,
    /// Set when this section hangs off a primary section.
    pub primary_id: Option<String>,
    /// Independent study: the instructor whose regid suffixes `course_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructor_reg_id: Option<String>,
}

impl Course {
    /// `course_id` without the independent study instructor suffix.
    pub fn base_course_id(&self) -> &str {
        self.instructor_reg_id
            .as_deref()
            .and_then(|regid| {
                self.course_id
                    .strip_suffix(regid)
                    .and_then(|rest| rest.strip_suffix('-'))
            })
            .unwrap_or(&self.course_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Deleted,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnrollmentRole {
    Student,
    Auditor,
    Teacher,
}

impl EnrollmentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentRole::Student => "Student",
            EnrollmentRole::Auditor => "Auditor",
            EnrollmentRole::Teacher => "Teacher",
        }
    }

    /// Role column value in the export format.
    pub fn import_role(self) -> &'static str {
        match self {
            EnrollmentRole::Student => "student",
            EnrollmentRole::Auditor => "Auditor",
            EnrollmentRole::Teacher => "teacher",
        }
    }
}

impl fmt::Display for EnrollmentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person's membership in a section, sourced from registration or
/// instructor events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub course_id: String,
    pub reg_id: String,
    pub role: EnrollmentRole,
    pub status: EnrollmentStatus,
    pub last_modified: DateTime<Utc>,
    pub request_date: Option<DateTime<Utc>>,
    pub primary_course_id: Option<String>,
    /// Independent study sections are keyed per instructor.
    pub instructor_reg_id: Option<String>,
    pub duplicate_code: Option<String>,
    /// Status code `S`: active, but on the standby list.
    pub standby: bool,
}

/// A group-sourced membership rule attached to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub course_id: String,
    pub group_id: String,
    pub role: String,
    pub is_deleted: bool,
}

/// A member group nested inside a course's root group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberGroupLink {
    pub group_id: String,
    pub root_group_id: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub reg_id: String,
    pub net_id: String,
}

/// Any record that can ride in an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueueableEntity {
    Course(Course),
    Enrollment(Enrollment),
    Group(GroupMembership),
    User(User),
}

impl QueueableEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            QueueableEntity::Course(_) => EntityKind::Course,
            QueueableEntity::Enrollment(_) => EntityKind::Enrollment,
            QueueableEntity::Group(_) => EntityKind::Group,
            QueueableEntity::User(_) => EntityKind::User,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        match self {
            QueueableEntity::Course(c) => NaturalKey::compose(EntityKind::Course, &[&c.course_id]),
            QueueableEntity::Enrollment(e) => NaturalKey::compose(
                EntityKind::Enrollment,
                &[&e.course_id, &e.reg_id, e.role.as_str()],
            ),
            QueueableEntity::Group(g) => {
                NaturalKey::compose(EntityKind::Group, &[&g.course_id, &g.group_id, &g.role])
            }
            QueueableEntity::User(u) => NaturalKey::compose(EntityKind::User, &[&u.reg_id]),
        }
    }
}

impl From<Course> for QueueableEntity {
    fn from(c: Course) -> Self {
        QueueableEntity::Course(c)
    }
}

impl From<Enrollment> for QueueableEntity {
    fn from(e: Enrollment) -> Self {
        QueueableEntity::Enrollment(e)
    }
}

impl From<GroupMembership> for QueueableEntity {
    fn from(g: GroupMembership) -> Self {
        QueueableEntity::Group(g)
    }
}

impl From<User> for QueueableEntity {
    fn from(u: User) -> Self {
        QueueableEntity::User(u)
    }
}

/// A live queue row: the entity plus its scheduling state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub entity: QueueableEntity,
    pub priority: Priority,
    /// Set while the row rides in an in-flight batch.
    pub claim: Option<BatchId>,
    pub provisioned_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(entity: QueueableEntity, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            entity,
            priority,
            claim: None,
            provisioned_at: None,
            added_at: now,
            modified_at: now,
        }
    }

    pub fn key(&self) -> NaturalKey {
        self.entity.natural_key()
    }

    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn enrollment(role: EnrollmentRole) -> Enrollment {
        Enrollment {
            course_id: "2024-spring-CSE-142-A".into(),
            reg_id: "ABC123".into(),
            role,
            status: EnrollmentStatus::Active,
            last_modified: Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap(),
            request_date: None,
            primary_course_id: None,
            instructor_reg_id: None,
            duplicate_code: None,
            standby: false,
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Immediate > Priority::High);
        assert!(Priority::High > Priority::Default);
        assert!(Priority::Default > Priority::None);
        assert_eq!(Priority::Default.decremented(), Priority::None);
        assert_eq!(Priority::None.decremented(), Priority::None);
    }

    #[test]
    fn test_priority_parse_accepts_labels() {
        assert_eq!("normal".parse::<Priority>().unwrap(), Priority::Default);
        assert_eq!("IMMEDIATE".parse::<Priority>().unwrap(), Priority::Immediate);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_enrollment_key_includes_role() {
        let student = QueueableEntity::from(enrollment(EnrollmentRole::Student));
        let auditor = QueueableEntity::from(enrollment(EnrollmentRole::Auditor));
        assert_ne!(student.natural_key(), auditor.natural_key());
        assert_eq!(
            student.natural_key().id,
            "2024-spring-CSE-142-A|ABC123|Student"
        );
    }

    #[test]
    fn test_key_ignores_mutable_fields() {
        let mut a = enrollment(EnrollmentRole::Student);
        let b = a.clone();
        a.status = EnrollmentStatus::Deleted;
        assert_eq!(
            QueueableEntity::from(a).natural_key(),
            QueueableEntity::from(b).natural_key()
        );
    }
}
