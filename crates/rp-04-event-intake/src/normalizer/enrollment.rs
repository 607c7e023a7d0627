//! Registration events (`uw-student-registration-v2`).
//!
//! A message carries a list of sub-events. Each becomes one student or
//! auditor [`Enrollment`], or is skipped on its own.
//!
//! | Action code | Status |
//! |-------------|--------|
//! | `A` | active |
//! | `S` | active, standby |
//! | `D` | deleted |

use serde::Deserialize;
use serde_json::Value;
use shared_types::{Enrollment, EnrollmentRole, EnrollmentStatus};
use tracing::{info, warn};

use crate::domain::identity::{normalize_reg_id, Quarter, SectionRef};
use crate::domain::outcome::{NormalizeOutcome, SkipReason};
use crate::domain::payload::{opt_text, parse_timestamp, text, year};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RegistrationEvent {
    section: SectionData,
    primary_section: Option<PrimarySectionData>,
    person: PersonData,
    action: ActionData,
    #[serde(deserialize_with = "text")]
    last_modified: String,
    #[serde(default, deserialize_with = "opt_text")]
    duplicate_enrollment_code: Option<String>,
    instructor: Option<InstructorData>,
    #[serde(default)]
    auditor: Option<bool>,
    #[serde(default, deserialize_with = "opt_text")]
    request_date: Option<String>,
    #[serde(rename = "EventID", default, deserialize_with = "opt_text")]
    event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SectionData {
    course: CourseData,
    #[serde(rename = "SectionID", deserialize_with = "text")]
    section_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CourseData {
    #[serde(deserialize_with = "text")]
    quarter: String,
    #[serde(deserialize_with = "year")]
    year: i32,
    #[serde(deserialize_with = "text")]
    curriculum_abbreviation: String,
    #[serde(deserialize_with = "text")]
    course_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PrimarySectionData {
    course: Option<PrimaryCourseData>,
    #[serde(rename = "SectionID", default, deserialize_with = "opt_text")]
    section_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PrimaryCourseData {
    #[serde(deserialize_with = "text")]
    curriculum_abbreviation: String,
    #[serde(deserialize_with = "text")]
    course_number: String,
}

#[derive(Debug, Deserialize)]
struct PersonData {
    #[serde(rename = "UWRegID", default, deserialize_with = "opt_text")]
    reg_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionData {
    #[serde(rename = "Code", deserialize_with = "text")]
    code: String,
}

#[derive(Debug, Deserialize)]
struct InstructorData {
    #[serde(rename = "UWRegID", default, deserialize_with = "opt_text")]
    reg_id: Option<String>,
}

fn status_for(code: &str) -> Option<(EnrollmentStatus, bool)> {
    match code.trim().to_ascii_uppercase().as_str() {
        "A" => Some((EnrollmentStatus::Active, false)),
        "S" => Some((EnrollmentStatus::Active, true)),
        "D" => Some((EnrollmentStatus::Deleted, false)),
        _ => None,
    }
}

impl RegistrationEvent {
    fn section(&self) -> Result<SectionRef, SkipReason> {
        let course = &self.section.course;
        let quarter = Quarter::parse(&course.quarter)
            .ok_or_else(|| SkipReason::Malformed(format!("quarter {}", course.quarter)))?;
        Ok(SectionRef {
            year: course.year,
            quarter,
            curriculum: course.curriculum_abbreviation.clone(),
            course_number: course.course_number.clone(),
            section_id: self.section.section_id.clone(),
        })
    }

    fn primary_course_id(&self, section: &SectionRef) -> Option<String> {
        let primary = self.primary_section.as_ref()?;
        let course = primary.course.as_ref()?;
        let primary_id = primary.section_id.as_deref()?;
        let id = section
            .sibling(&course.curriculum_abbreviation, &course.course_number, primary_id)
            .course_id();
        (id != section.course_id()).then_some(id)
    }

    fn normalize(&self, section: &SectionRef) -> Result<Enrollment, SkipReason> {
        let raw_reg_id = self.person.reg_id.clone().unwrap_or_default();
        let reg_id = normalize_reg_id(&raw_reg_id).ok_or(SkipReason::InvalidRegId(raw_reg_id))?;
        let (status, standby) = status_for(&self.action.code)
            .ok_or_else(|| SkipReason::UnhandledActionCode(self.action.code.clone()))?;
        let last_modified = parse_timestamp(&self.last_modified)
            .ok_or_else(|| SkipReason::Malformed(format!("LastModified {}", self.last_modified)))?;

        Ok(Enrollment {
            course_id: section.course_id(),
            reg_id,
            role: if self.auditor.unwrap_or(false) {
                EnrollmentRole::Auditor
            } else {
                EnrollmentRole::Student
            },
            status,
            last_modified,
            request_date: self.request_date.as_deref().and_then(parse_timestamp),
            primary_course_id: self.primary_course_id(section),
            instructor_reg_id: self
                .instructor
                .as_ref()
                .and_then(|i| i.reg_id.as_deref())
                .and_then(normalize_reg_id),
            duplicate_code: self.duplicate_enrollment_code.clone(),
            standby,
        })
    }
}

fn normalize_event(raw: &Value) -> NormalizeOutcome<Enrollment> {
    let event: RegistrationEvent = match serde_json::from_value(raw.clone()) {
        Ok(event) => event,
        Err(e) => {
            let reason = SkipReason::Malformed(e.to_string());
            warn!("ENROLLMENT: {reason}");
            return NormalizeOutcome::Skipped(reason);
        }
    };

    let result = event.section().and_then(|s| event.normalize(&s).map(|e| (s, e)));
    let section = event
        .section()
        .map(|s| s.course_id())
        .unwrap_or_default();
    let outcome = match &result {
        Ok(_) => "ACCEPT",
        Err(reason) => reason.outcome(),
    };
    info!(
        "ENROLLMENT: {outcome} code: {}, regid: {}, section: {section}, duplicate_code: {}, last_modified: {}, event_id: {}",
        event.action.code,
        event.person.reg_id.as_deref().unwrap_or_default(),
        event.duplicate_enrollment_code.as_deref().unwrap_or_default(),
        event.last_modified,
        event.event_id.as_deref().unwrap_or_default(),
    );

    match result {
        Ok((_, enrollment)) => NormalizeOutcome::Accepted(enrollment),
        Err(reason) => NormalizeOutcome::Skipped(reason),
    }
}

/// One outcome per entry of `Events`, in order.
pub fn normalize(body: &Value) -> Vec<NormalizeOutcome<Enrollment>> {
    body.get("Events")
        .and_then(Value::as_array)
        .map(|events| events.iter().map(normalize_event).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const REG_ID: &str = "9136CCB8F66711D5BE060004AC494FFE";

    fn event(code: &str, reg_id: &str) -> Value {
        json!({
            "EventID": "e-1",
            "Action": {"Code": code},
            "Person": {"UWRegID": reg_id},
            "Section": {
                "Course": {
                    "Quarter": "SPR",
                    "Year": 2024,
                    "CurriculumAbbreviation": "CSE",
                    "CourseNumber": "142"
                },
                "SectionID": "A"
            },
            "LastModified": "2024-04-01T10:00:00Z",
            "DuplicateEnrollmentCode": 0
        })
    }

    #[test]
    fn test_add_event_becomes_active_student() {
        let outcomes = normalize(&json!({"Events": [event("A", REG_ID)]}));
        assert_eq!(outcomes.len(), 1);
        let enrollment = outcomes[0].clone().accepted().unwrap();
        assert_eq!(enrollment.course_id, "2024-spring-CSE-142-A");
        assert_eq!(enrollment.reg_id, REG_ID);
        assert_eq!(enrollment.role, EnrollmentRole::Student);
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert_eq!(
            enrollment.last_modified,
            Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(enrollment.duplicate_code.as_deref(), Some("0"));
        assert!(!enrollment.standby);
    }

    #[test]
    fn test_status_codes() {
        let body = json!({"Events": [event("s", REG_ID), event("D", REG_ID)]});
        let outcomes: Vec<_> = normalize(&body).into_iter().filter_map(|o| o.accepted()).collect();
        assert_eq!(outcomes[0].status, EnrollmentStatus::Active);
        assert!(outcomes[0].standby);
        assert_eq!(outcomes[1].status, EnrollmentStatus::Deleted);
    }

    #[test]
    fn test_bad_sub_events_skip_alone() {
        let body = json!({"Events": [
            event("X", REG_ID),
            event("A", "ABC123"),
            {"Action": {"Code": "A"}},
            event("A", &REG_ID.to_lowercase()),
        ]});
        let outcomes = normalize(&body);
        assert_eq!(
            outcomes[0],
            NormalizeOutcome::Skipped(SkipReason::UnhandledActionCode("X".into()))
        );
        assert_eq!(
            outcomes[1],
            NormalizeOutcome::Skipped(SkipReason::InvalidRegId("ABC123".into()))
        );
        assert!(outcomes[2].is_skipped());
        assert_eq!(outcomes[3].clone().accepted().unwrap().reg_id, REG_ID);
    }

    #[test]
    fn test_auditor_primary_and_instructor() {
        let mut raw = event("A", REG_ID);
        raw["Auditor"] = json!(true);
        raw["Section"]["SectionID"] = json!("AB");
        raw["PrimarySection"] = json!({
            "Course": {"CurriculumAbbreviation": "CSE", "CourseNumber": "142"},
            "SectionID": "A"
        });
        raw["Instructor"] = json!({"UWRegID": "FBB38FE46A7C11D5A4AE0004AC494FFE"});
        raw["RequestDate"] = json!("2024-03-30T08:00:00Z");

        let enrollment = normalize(&json!({"Events": [raw]}))[0].clone().accepted().unwrap();
        assert_eq!(enrollment.role, EnrollmentRole::Auditor);
        assert_eq!(enrollment.course_id, "2024-spring-CSE-142-AB");
        assert_eq!(enrollment.primary_course_id.as_deref(), Some("2024-spring-CSE-142-A"));
        assert_eq!(
            enrollment.instructor_reg_id.as_deref(),
            Some("FBB38FE46A7C11D5A4AE0004AC494FFE")
        );
        assert!(enrollment.request_date.is_some());
    }

    #[test]
    fn test_missing_events_list() {
        assert!(normalize(&json!({})).is_empty());
    }
}
