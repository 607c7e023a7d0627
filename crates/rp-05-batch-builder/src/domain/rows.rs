//! Export rows for each entity kind.
//!
//! | Entity     | Rows                                  |
//! |------------|---------------------------------------|
//! | Course     | `courses.csv` (primary only), `sections.csv` |
//! | Enrollment | `enrollments.csv`                     |
//! | Group      | `group_enrollments.csv`               |
//! | User       | `users.csv`                           |
//!
//! A primary section's LMS section id is its course id with a `--` suffix.
//! A secondary section keeps its own course id as section id and hangs off
//! its primary's course.

use shared_crypto::Sha256Hasher;
use shared_types::{Course, Enrollment, EnrollmentStatus, GroupMembership, User};

use super::csv::{line, ExportFile};
use crate::error::BuildError;

/// Name and contact data from the roster, used for `users.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserProfile {
    pub full_name: String,
    pub sortable_name: String,
    pub email: Option<String>,
}

/// A section the roster lists under a course, added to full course builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionListing {
    pub section_id: String,
    pub course_id: String,
    pub name: String,
    pub active: bool,
}

/// One row bound for one file. `key` deduplicates rows within the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub file: ExportFile,
    pub key: String,
    pub line: String,
}

impl ExportRow {
    fn new<S: AsRef<str>>(file: ExportFile, key: impl Into<String>, fields: &[S]) -> Self {
        Self {
            file,
            key: key.into(),
            line: line(fields),
        }
    }
}

/// SHA-256 over the rows an entity produced, in order.
pub fn fingerprint(rows: &[ExportRow]) -> String {
    let mut hasher = Sha256Hasher::new();
    for row in rows {
        hasher.update(row.file.file_name().as_bytes()).update(row.line.as_bytes());
    }
    hasher.finalize_hex()
}

/// `2024-spring-CSE-142-A` split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseIdParts<'a> {
    pub year: &'a str,
    pub quarter: &'a str,
    pub curriculum: &'a str,
    pub number: &'a str,
    pub section: &'a str,
}

impl<'a> CourseIdParts<'a> {
    pub fn parse(course_id: &'a str) -> Result<Self, BuildError> {
        let invalid = || BuildError::InvalidCourseId(course_id.to_string());
        let (year, rest) = course_id.split_once('-').ok_or_else(invalid)?;
        let (quarter, rest) = rest.split_once('-').ok_or_else(invalid)?;
        let (rest, section) = rest.rsplit_once('-').ok_or_else(invalid)?;
        let (curriculum, number) = rest.rsplit_once('-').ok_or_else(invalid)?;
        if [year, quarter, curriculum, number, section].iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        Ok(Self {
            year,
            quarter,
            curriculum,
            number,
            section,
        })
    }

    /// `CSE 142 A`
    pub fn short_name(&self) -> String {
        format!("{} {} {}", self.curriculum, self.number, self.section)
    }

    /// `CSE 142 A Spring 2024`
    pub fn long_name(&self) -> String {
        let mut quarter = self.quarter.to_string();
        if let Some(first) = quarter.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        format!("{} {quarter} {}", self.short_name(), self.year)
    }

    pub fn account_id(&self) -> String {
        format!("course:{}", self.curriculum.to_lowercase().replace(' ', "-"))
    }
}

pub fn primary_section_id(course_id: &str) -> String {
    format!("{course_id}--")
}

fn status(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "deleted"
    }
}

pub fn course_rows(course: &Course) -> Result<Vec<ExportRow>, BuildError> {
    let parts = CourseIdParts::parse(course.base_course_id())?;
    let short_name = parts.short_name();
    Ok(match &course.primary_id {
        Some(primary_id) => vec![ExportRow::new(
            ExportFile::Sections,
            &course.course_id,
            &[course.course_id.as_str(), primary_id.as_str(), short_name.as_str(), "active"],
        )],
        None => {
            let section_id = primary_section_id(&course.course_id);
            vec![
                ExportRow::new(
                    ExportFile::Courses,
                    &course.course_id,
                    &[
                        course.course_id.as_str(),
                        short_name.as_str(),
                        parts.long_name().as_str(),
                        parts.account_id().as_str(),
                        course.term_id.as_str(),
                        "active",
                    ],
                ),
                ExportRow::new(
                    ExportFile::Sections,
                    section_id.clone(),
                    &[section_id.as_str(), course.course_id.as_str(), short_name.as_str(), "active"],
                ),
            ]
        }
    })
}

pub fn section_listing_row(listing: &SectionListing) -> ExportRow {
    ExportRow::new(
        ExportFile::Sections,
        &listing.section_id,
        &[
            listing.section_id.as_str(),
            listing.course_id.as_str(),
            listing.name.as_str(),
            status(listing.active),
        ],
    )
}

/// The LMS section an enrollment lands in.
pub fn enrollment_section_id(enrollment: &Enrollment) -> String {
    match (&enrollment.instructor_reg_id, &enrollment.primary_course_id) {
        (Some(instructor), _) => primary_section_id(&format!("{}-{instructor}", enrollment.course_id)),
        (None, Some(_)) => enrollment.course_id.clone(),
        (None, None) => primary_section_id(&enrollment.course_id),
    }
}

pub fn enrollment_rows(enrollment: &Enrollment) -> Vec<ExportRow> {
    let section_id = enrollment_section_id(enrollment);
    let role = enrollment.role.import_role();
    vec![ExportRow::new(
        ExportFile::Enrollments,
        format!("{section_id}|{}|{role}", enrollment.reg_id),
        &[
            "",
            "",
            enrollment.reg_id.as_str(),
            role,
            "",
            section_id.as_str(),
            status(enrollment.status == EnrollmentStatus::Active),
            "",
        ],
    )]
}

pub fn group_rows(group: &GroupMembership) -> Vec<ExportRow> {
    vec![ExportRow::new(
        ExportFile::GroupEnrollments,
        format!("{}|{}|{}", group.course_id, group.group_id, group.role),
        &[
            group.course_id.as_str(),
            group.group_id.as_str(),
            group.role.as_str(),
            status(!group.is_deleted),
        ],
    )]
}

pub fn user_rows(user: &User, profile: Option<&UserProfile>) -> Vec<ExportRow> {
    let profile = profile.cloned().unwrap_or_default();
    let email = profile
        .email
        .unwrap_or_else(|| format!("{}@uw.edu", user.net_id));
    vec![ExportRow::new(
        ExportFile::Users,
        &user.reg_id,
        &[
            user.reg_id.as_str(),
            user.net_id.as_str(),
            profile.full_name.as_str(),
            profile.sortable_name.as_str(),
            email.as_str(),
            "active",
        ],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared_types::EnrollmentRole;

    fn course(primary_id: Option<&str>) -> Course {
        Course {
            course_id: "2024-spring-CSE-142-AA".into(),
            term_id: "2024-spring".into(),
            primary_id: primary_id.map(String::from),
            instructor_reg_id: None,
        }
    }

    fn enrollment() -> Enrollment {
        Enrollment {
            course_id: "2024-spring-CSE-142-A".into(),
            reg_id: "9136CCB8F66711D5BE060004AC494FFE".into(),
            role: EnrollmentRole::Student,
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
    fn test_course_id_parts() {
        let parts = CourseIdParts::parse("2024-spring-B E-101-A").unwrap();
        assert_eq!(parts.curriculum, "B E");
        assert_eq!(parts.long_name(), "B E 101 A Spring 2024");
        assert_eq!(parts.account_id(), "course:b-e");
        assert!(CourseIdParts::parse("2024-spring-CSE").is_err());
    }

    #[test]
    fn test_primary_course_emits_course_and_section() {
        let rows = course_rows(&course(None)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].line,
            "2024-spring-CSE-142-AA,CSE 142 AA,CSE 142 AA Spring 2024,course:cse,2024-spring,active\n"
        );
        assert_eq!(rows[1].line, "2024-spring-CSE-142-AA--,2024-spring-CSE-142-AA,CSE 142 AA,active\n");
    }

    #[test]
    fn test_secondary_course_is_a_section_of_its_primary() {
        let rows = course_rows(&course(Some("2024-spring-CSE-142-A"))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file, ExportFile::Sections);
        assert_eq!(rows[0].line, "2024-spring-CSE-142-AA,2024-spring-CSE-142-A,CSE 142 AA,active\n");
    }

    #[test]
    fn test_enrollment_rows() {
        let mut e = enrollment();
        assert_eq!(
            enrollment_rows(&e)[0].line,
            ",,9136CCB8F66711D5BE060004AC494FFE,student,,2024-spring-CSE-142-A--,active,\n"
        );
        e.status = EnrollmentStatus::Deleted;
        e.primary_course_id = Some("2024-spring-CSE-142-A".into());
        e.course_id = "2024-spring-CSE-142-AB".into();
        assert_eq!(
            enrollment_rows(&e)[0].line,
            ",,9136CCB8F66711D5BE060004AC494FFE,student,,2024-spring-CSE-142-AB,deleted,\n"
        );
    }

    #[test]
    fn test_independent_study_enrollment_lands_in_the_instructor_section() {
        let instructor = "FEDCBA9876543210FEDCBA9876543210";
        let mut e = enrollment();
        e.instructor_reg_id = Some(instructor.into());
        let course = Course {
            course_id: format!("2024-spring-CSE-142-A-{instructor}"),
            term_id: "2024-spring".into(),
            primary_id: None,
            instructor_reg_id: Some(instructor.into()),
        };

        let rows = course_rows(&course).unwrap();
        assert_eq!(
            rows[0].line,
            format!(
                "2024-spring-CSE-142-A-{instructor},CSE 142 A,CSE 142 A Spring 2024,course:cse,2024-spring,active\n"
            )
        );
        let section = rows.iter().find(|r| r.file == ExportFile::Sections).unwrap();
        assert_eq!(section.key, enrollment_section_id(&e));
        assert!(enrollment_rows(&e)[0].line.contains(&format!(",{}--,", course.course_id)));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = enrollment_rows(&enrollment());
        let mut changed = enrollment();
        changed.status = EnrollmentStatus::Deleted;
        assert_eq!(fingerprint(&a), fingerprint(&enrollment_rows(&enrollment())));
        assert_ne!(fingerprint(&a), fingerprint(&enrollment_rows(&changed)));
    }

    #[test]
    fn test_user_rows_quote_names() {
        let user = User {
            reg_id: "9136CCB8F66711D5BE060004AC494FFE".into(),
            net_id: "javerage".into(),
        };
        let profile = UserProfile {
            full_name: "Joseph Average".into(),
            sortable_name: "Average, Joseph".into(),
            email: None,
        };
        assert_eq!(
            user_rows(&user, Some(&profile))[0].line,
            "9136CCB8F66711D5BE060004AC494FFE,javerage,Joseph Average,\"Average, Joseph\",javerage@uw.edu,active\n"
        );
    }
}
