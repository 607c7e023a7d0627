//! Roster (student records) service client. Serves both event intake's
//! term, schedule and person lookups and the batch builder's profiles and
//! section listings.
//!
//! | Lookup | Request | Response |
//! |--------|---------|----------|
//! | term | `GET v1/terms/<year>/<quarter>` | `{"active": bool}` |
//! | schedule | `GET v1/sections/<course id>` | `{"time_schedule_ready": bool}` |
//! | person | `GET v1/people/login/<login>` | `{"reg_id", "net_id"}` |
//! | profile | `GET v1/people/<reg id>/profile` | `{"full_name", "sortable_name", "email"?}` |
//! | sections | `GET v1/courses/<course id>/sections` | `[{"section_id", "course_id", "name", "active"}]` |

use rp_04_event_intake::{Quarter, RosterError, RosterService, SectionRef};
use rp_05_batch_builder::{RosterSource, RosterSourceError, SectionListing, UserProfile};
use serde::Deserialize;
use shared_types::{Course, User};

use super::http::{HttpClient, HttpError};

#[derive(Debug, Deserialize)]
struct TermDocument {
    active: bool,
}

#[derive(Debug, Deserialize)]
struct SectionDocument {
    time_schedule_ready: bool,
}

#[derive(Debug, Deserialize)]
struct PersonDocument {
    reg_id: String,
    net_id: String,
}

#[derive(Debug, Deserialize)]
struct ProfileDocument {
    full_name: String,
    sortable_name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SectionListingDocument {
    section_id: String,
    course_id: String,
    name: String,
    active: bool,
}

fn roster_error(what: String) -> impl FnOnce(HttpError) -> RosterError {
    move |e| {
        if e.is_not_found() {
            RosterError::NotFound(what)
        } else {
            RosterError::Request(e.to_string())
        }
    }
}

/// `Ok(None)` for a 404, so "no such person" is not an error.
fn optional<T>(result: Result<T, HttpError>) -> Result<Option<T>, HttpError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct HttpRoster {
    http: HttpClient,
}

impl HttpRoster {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl RosterService for HttpRoster {
    async fn is_active_term(&self, year: i32, quarter: Quarter) -> Result<bool, RosterError> {
        let term = format!("{year} {}", quarter.as_str());
        self.http
            .get_json::<TermDocument>(&format!("v1/terms/{year}/{}", quarter.as_str()))
            .await
            .map(|doc| doc.active)
            .map_err(roster_error(term))
    }

    async fn is_time_schedule_ready(&self, section: &SectionRef) -> Result<bool, RosterError> {
        let course_id = section.course_id();
        self.http
            .get_json::<SectionDocument>(&format!("v1/sections/{course_id}"))
            .await
            .map(|doc| doc.time_schedule_ready)
            .map_err(roster_error(course_id))
    }

    async fn person_by_login(&self, login_id: &str) -> Result<Option<User>, RosterError> {
        let person = optional(
            self.http
                .get_json::<PersonDocument>(&format!("v1/people/login/{login_id}"))
                .await,
        )
        .map_err(|e| RosterError::Request(e.to_string()))?;
        Ok(person.map(|p| User {
            reg_id: p.reg_id,
            net_id: p.net_id,
        }))
    }

    /// A 404 on the member resource means not a member.
    async fn is_group_member(&self, group_id: &str, login_id: &str) -> Result<bool, RosterError> {
        optional(
            self.http
                .get_json::<serde_json::Value>(&format!("v1/groups/{group_id}/members/{login_id}"))
                .await,
        )
        .map(|member| member.is_some())
        .map_err(|e| RosterError::Request(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RosterSource for HttpRoster {
    async fn user_profile(&self, user: &User) -> Result<Option<UserProfile>, RosterSourceError> {
        let profile = optional(
            self.http
                .get_json::<ProfileDocument>(&format!("v1/people/{}/profile", user.reg_id))
                .await,
        )
        .map_err(|e| RosterSourceError(e.to_string()))?;
        Ok(profile.map(|p| UserProfile {
            full_name: p.full_name,
            sortable_name: p.sortable_name,
            email: p.email,
        }))
    }

    async fn course_sections(&self, course: &Course) -> Result<Vec<SectionListing>, RosterSourceError> {
        let listings = optional(
            self.http
                .get_json::<Vec<SectionListingDocument>>(&format!(
                    "v1/courses/{}/sections",
                    course.course_id
                ))
                .await,
        )
        .map_err(|e| RosterSourceError(e.to_string()))?;
        Ok(listings
            .unwrap_or_default()
            .into_iter()
            .map(|l| SectionListing {
                section_id: l.section_id,
                course_id: l.course_id,
                name: l.name,
                active: l.active,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_decode() {
        let profile: ProfileDocument =
            serde_json::from_str(r#"{"full_name": "Jo Average", "sortable_name": "Average, Jo"}"#).unwrap();
        assert_eq!(profile.email, None);

        let listings: Vec<SectionListingDocument> = serde_json::from_str(
            r#"[{"section_id": "2024-spring-CSE-142-AA", "course_id": "2024-spring-CSE-142-A", "name": "CSE 142 AA", "active": true}]"#,
        )
        .unwrap();
        assert_eq!(listings[0].section_id, "2024-spring-CSE-142-AA");

        let person: PersonDocument =
            serde_json::from_str(r#"{"reg_id": "9136CCB8F66711D5BE060004AC494FFE", "net_id": "javerage"}"#).unwrap();
        assert_eq!(person.net_id, "javerage");
    }
}
