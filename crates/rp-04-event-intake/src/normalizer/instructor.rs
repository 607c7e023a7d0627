//! Instructor add and drop events (`uw-instructor-add`, `uw-instructor-drop`).
//!
//! Each event carries the section as it was (`Previous`) and as it is
//! (`Current`). The instructors that changed are the set difference of the
//! two, in the direction of the event:
//!
//! ```text
//! add:  current - previous   -> Teacher, active
//! drop: previous - current   -> Teacher, deleted
//! ```
//!
//! Parsing is pure. Whether the term is active and the time schedule ready
//! is asked of the roster by the intake service before [`InstructorEvent::enrollments`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use shared_types::{Enrollment, EnrollmentRole, EnrollmentStatus};
use tracing::info;

use crate::domain::identity::{normalize_reg_id, Quarter, SectionRef};
use crate::domain::payload::{opt_text, parse_timestamp, text, year};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructorChange {
    Add,
    Drop,
}

impl InstructorChange {
    fn status(self) -> EnrollmentStatus {
        match self {
            InstructorChange::Add => EnrollmentStatus::Active,
            InstructorChange::Drop => EnrollmentStatus::Deleted,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstructorMessage {
    #[serde(deserialize_with = "text")]
    event_date: String,
    #[serde(rename = "EventID", default, deserialize_with = "opt_text")]
    event_id: Option<String>,
    previous: Option<SectionSnapshot>,
    current: Option<SectionSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SectionSnapshot {
    course: CourseData,
    term: TermData,
    #[serde(rename = "SectionID", deserialize_with = "text")]
    section_id: String,
    primary_section: Option<CourseSection>,
    #[serde(default)]
    linked_section_types: Vec<LinkedSectionType>,
    #[serde(default)]
    meetings: Vec<Meeting>,
    #[serde(default)]
    independent_study: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CourseData {
    #[serde(deserialize_with = "text")]
    curriculum_abbreviation: String,
    #[serde(deserialize_with = "text")]
    course_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TermData {
    #[serde(deserialize_with = "year")]
    year: i32,
    #[serde(deserialize_with = "text")]
    quarter: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CourseSection {
    #[serde(deserialize_with = "text")]
    curriculum_abbreviation: String,
    #[serde(deserialize_with = "text")]
    course_number: String,
    #[serde(rename = "SectionID", deserialize_with = "text")]
    section_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LinkedSectionType {
    #[serde(default)]
    linked_sections: Vec<LinkedSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LinkedSection {
    section: CourseSection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Meeting {
    #[serde(default)]
    instructors: Vec<MeetingInstructor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MeetingInstructor {
    person: Value,
}

/// A section the change applies to, with its primary when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedSection {
    pub section: SectionRef,
    pub primary_course_id: Option<String>,
}

/// A parsed instructor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorEvent {
    pub event_id: Option<String>,
    pub last_modified: DateTime<Utc>,
    /// The event's own section, from `Current` or else `Previous`.
    pub section: SectionRef,
    pub independent_study: bool,
    pub sections: Vec<AffectedSection>,
    previous: BTreeSet<String>,
    current: BTreeSet<String>,
}

fn instructors(snapshot: Option<&SectionSnapshot>, section: &SectionRef) -> BTreeSet<String> {
    let mut reg_ids = BTreeSet::new();
    let Some(snapshot) = snapshot else {
        return reg_ids;
    };
    for instructor in snapshot.meetings.iter().flat_map(|m| &m.instructors) {
        let reg_id = instructor
            .person
            .get("RegID")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty());
        match reg_id {
            Some(reg_id) => {
                reg_ids.insert(normalize_reg_id(reg_id).unwrap_or_else(|| reg_id.to_string()));
            }
            None => info!(
                "INSTRUCTOR: IGNORE (Missing regid for {}) section: {section}",
                instructor.person
            ),
        }
    }
    reg_ids
}

impl InstructorEvent {
    pub fn parse(body: &Value) -> Result<Self, String> {
        let message: InstructorMessage =
            serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;
        let snapshot = message
            .current
            .as_ref()
            .or(message.previous.as_ref())
            .ok_or("neither Current nor Previous section present")?;
        let last_modified = parse_timestamp(&message.event_date)
            .ok_or_else(|| format!("invalid EventDate {}", message.event_date))?;
        let quarter = Quarter::parse(&snapshot.term.quarter)
            .ok_or_else(|| format!("invalid quarter {}", snapshot.term.quarter))?;

        let section = SectionRef {
            year: snapshot.term.year,
            quarter,
            curriculum: snapshot.course.curriculum_abbreviation.clone(),
            course_number: snapshot.course.course_number.clone(),
            section_id: snapshot.section_id.clone(),
        };

        let primary = snapshot.primary_section.as_ref().map(|p| {
            section
                .sibling(&p.curriculum_abbreviation, &p.course_number, &p.section_id)
                .course_id()
        });
        let is_secondary = snapshot
            .primary_section
            .as_ref()
            .is_some_and(|p| p.section_id != section.section_id);

        let linked: Vec<&CourseSection> = snapshot
            .linked_section_types
            .iter()
            .flat_map(|t| &t.linked_sections)
            .map(|l| &l.section)
            .collect();

        let sections = if is_secondary {
            vec![AffectedSection {
                section: section.clone(),
                primary_course_id: primary,
            }]
        } else if !linked.is_empty() {
            linked
                .into_iter()
                .map(|l| AffectedSection {
                    section: section.sibling(&l.curriculum_abbreviation, &l.course_number, &l.section_id),
                    primary_course_id: primary.clone(),
                })
                .collect()
        } else {
            vec![AffectedSection {
                section: section.clone(),
                primary_course_id: None,
            }]
        };

        Ok(Self {
            event_id: message.event_id.clone(),
            last_modified,
            independent_study: snapshot.independent_study,
            previous: instructors(message.previous.as_ref(), &section),
            current: instructors(message.current.as_ref(), &section),
            section,
            sections,
        })
    }

    /// Reg ids the event adds or drops.
    pub fn changed(&self, change: InstructorChange) -> Vec<String> {
        let (from, to) = match change {
            InstructorChange::Add => (&self.current, &self.previous),
            InstructorChange::Drop => (&self.previous, &self.current),
        };
        from.difference(to).cloned().collect()
    }

    /// One Teacher enrollment per changed instructor per affected section.
    pub fn enrollments(&self, change: InstructorChange) -> Vec<Enrollment> {
        let reg_ids = self.changed(change);
        let mut out = Vec::new();
        for affected in &self.sections {
            for reg_id in &reg_ids {
                info!(
                    "INSTRUCTOR: ACCEPT section: {}, regid: {reg_id}, last_modified: {}, event_id: {}",
                    affected.section,
                    self.last_modified.to_rfc3339(),
                    self.event_id.as_deref().unwrap_or_default()
                );
                out.push(Enrollment {
                    course_id: affected.section.course_id(),
                    reg_id: reg_id.clone(),
                    role: EnrollmentRole::Teacher,
                    status: change.status(),
                    last_modified: self.last_modified,
                    request_date: None,
                    primary_course_id: affected.primary_course_id.clone(),
                    instructor_reg_id: self.independent_study.then(|| reg_id.clone()),
                    duplicate_code: None,
                    standby: false,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(instructors: &[&str]) -> Value {
        json!({
            "Course": {"CurriculumAbbreviation": "CSE", "CourseNumber": "142"},
            "Term": {"Year": 2024, "Quarter": "spring"},
            "SectionID": "A",
            "PrimarySection": {"CurriculumAbbreviation": "CSE", "CourseNumber": "142", "SectionID": "A"},
            "LinkedSectionTypes": [],
            "IndependentStudy": false,
            "Meetings": [{
                "Instructors": instructors
                    .iter()
                    .map(|r| json!({"Person": {"RegID": r, "Name": "X"}}))
                    .collect::<Vec<_>>()
            }]
        })
    }

    fn message(previous: Value, current: Value) -> Value {
        json!({
            "EventID": "i-1",
            "EventDate": "2024-04-02T08:00:00Z",
            "Previous": previous,
            "Current": current
        })
    }

    #[test]
    fn test_drop_when_instructor_removed() {
        let event = InstructorEvent::parse(&message(snapshot(&["X"]), snapshot(&[]))).unwrap();
        assert!(event.changed(InstructorChange::Add).is_empty());
        let dropped = event.enrollments(InstructorChange::Drop);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].reg_id, "X");
        assert_eq!(dropped[0].role, EnrollmentRole::Teacher);
        assert_eq!(dropped[0].status, EnrollmentStatus::Deleted);
        assert_eq!(dropped[0].course_id, "2024-spring-CSE-142-A");
        assert_eq!(dropped[0].last_modified, event.last_modified);
    }

    #[test]
    fn test_add_is_current_minus_previous() {
        let event =
            InstructorEvent::parse(&message(snapshot(&["X", "Y"]), snapshot(&["Y", "Z"]))).unwrap();
        assert_eq!(event.changed(InstructorChange::Add), vec!["Z"]);
        assert_eq!(event.changed(InstructorChange::Drop), vec!["X"]);
    }

    #[test]
    fn test_null_previous_and_missing_regid() {
        let mut current = snapshot(&["Z"]);
        current["Meetings"][0]["Instructors"]
            .as_array_mut()
            .unwrap()
            .push(json!({"Person": {"RegID": "", "Name": "TBA"}}));
        let event = InstructorEvent::parse(&message(Value::Null, current)).unwrap();
        assert_eq!(event.changed(InstructorChange::Add), vec!["Z"]);
    }

    #[test]
    fn test_linked_sections_expand() {
        let mut current = snapshot(&["Z"]);
        current["LinkedSectionTypes"] = json!([
            {"LinkedSections": [
                {"Section": {"CurriculumAbbreviation": "CSE", "CourseNumber": "142", "SectionID": "AA"}},
                {"Section": {"CurriculumAbbreviation": "CSE", "CourseNumber": "142", "SectionID": "AB"}}
            ]}
        ]);
        let event = InstructorEvent::parse(&message(Value::Null, current)).unwrap();
        let added = event.enrollments(InstructorChange::Add);
        let ids: Vec<_> = added.iter().map(|e| e.course_id.as_str()).collect();
        assert_eq!(ids, vec!["2024-spring-CSE-142-AA", "2024-spring-CSE-142-AB"]);
        assert!(added
            .iter()
            .all(|e| e.primary_course_id.as_deref() == Some("2024-spring-CSE-142-A")));
    }

    #[test]
    fn test_secondary_section_only_itself() {
        let mut current = snapshot(&["Z"]);
        current["SectionID"] = json!("AC");
        current["LinkedSectionTypes"] = json!([
            {"LinkedSections": [
                {"Section": {"CurriculumAbbreviation": "CSE", "CourseNumber": "142", "SectionID": "AA"}}
            ]}
        ]);
        current["IndependentStudy"] = json!(true);
        let event = InstructorEvent::parse(&message(Value::Null, current)).unwrap();
        let added = event.enrollments(InstructorChange::Add);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].course_id, "2024-spring-CSE-142-AC");
        assert_eq!(added[0].instructor_reg_id.as_deref(), Some("Z"));
    }

    #[test]
    fn test_both_sides_missing_is_malformed() {
        assert!(InstructorEvent::parse(&message(Value::Null, Value::Null)).is_err());
    }
}
