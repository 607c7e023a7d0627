//! Group service events (`gws`).
//!
//! The outer envelope names an action and a group. The group name picks one
//! route, first match wins:
//!
//! 1. the student login group
//! 2. the sponsored login group
//! 3. the affiliate login group
//! 4. a group the queue already knows
//! 5. a course group, `course_2024spr-cse142a`
//!
//! A group matching none of them is acknowledged and ignored. Bodies are
//! JSON documents:
//!
//! ```text
//! { "name": "uw_group",
//!   "add-members":    ["javerage", {"name": "jdoe", "type": "uwnetid"}],
//!   "delete-members": [...],
//!   "subject": {"old-name": "uw_old", "new-name": "uw_new"} }
//! ```

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::domain::identity::course_group_id;

/// Login group names that gate who may have an account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginGroups {
    pub student: String,
    pub sponsored: String,
    pub affiliate: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRoute {
    StudentLogin,
    SponsoredLogin,
    AffiliateLogin,
    Known,
    Course { course_id: String },
}

impl fmt::Display for GroupRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRoute::StudentLogin => f.write_str("student login group"),
            GroupRoute::SponsoredLogin => f.write_str("sponsored login group"),
            GroupRoute::AffiliateLogin => f.write_str("affiliate login group"),
            GroupRoute::Known => f.write_str("uw group"),
            GroupRoute::Course { course_id } => write!(f, "course group {course_id}"),
        }
    }
}

/// Pick the route for `group`.
pub fn route(group: &str, login: &LoginGroups, is_known: bool) -> Option<GroupRoute> {
    if !login.student.is_empty() && group == login.student {
        return Some(GroupRoute::StudentLogin);
    }
    if !login.sponsored.is_empty() && group == login.sponsored {
        return Some(GroupRoute::SponsoredLogin);
    }
    if !login.affiliate.is_empty() && group == login.affiliate {
        return Some(GroupRoute::AffiliateLogin);
    }
    if is_known {
        return Some(GroupRoute::Known);
    }
    course_group_id(group).map(|course_id| GroupRoute::Course { course_id })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupAction {
    UpdateMembers,
    PutGroup,
    DeleteGroup,
    PutMembers,
    ChangeSubjectName,
    NoAction,
    Unknown(String),
}

impl GroupAction {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "update-members" => GroupAction::UpdateMembers,
            "put-group" => GroupAction::PutGroup,
            "delete-group" => GroupAction::DeleteGroup,
            "put-members" => GroupAction::PutMembers,
            "change-subject-name" => GroupAction::ChangeSubjectName,
            "no-action" => GroupAction::NoAction,
            other => GroupAction::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for GroupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GroupAction::UpdateMembers => "update-members",
            GroupAction::PutGroup => "put-group",
            GroupAction::DeleteGroup => "delete-group",
            GroupAction::PutMembers => "put-members",
            GroupAction::ChangeSubjectName => "change-subject-name",
            GroupAction::NoAction => "no-action",
            GroupAction::Unknown(other) => other,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum MemberRef {
    Login(String),
    Entity { name: String },
}

impl MemberRef {
    fn into_name(self) -> String {
        match self {
            MemberRef::Login(name) | MemberRef::Entity { name } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubjectChange {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawGroupDocument {
    name: Option<String>,
    #[serde(default)]
    add_members: Vec<MemberRef>,
    #[serde(default)]
    delete_members: Vec<MemberRef>,
    subject: Option<SubjectChange>,
}

/// A decoded group event body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDocument {
    pub name: Option<String>,
    pub add_members: Vec<String>,
    pub delete_members: Vec<String>,
    pub subject: Option<SubjectChange>,
}

impl GroupDocument {
    pub fn parse(body: &Value) -> Result<Self, String> {
        let raw: RawGroupDocument = serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;
        Ok(Self {
            name: raw.name,
            add_members: raw.add_members.into_iter().map(MemberRef::into_name).collect(),
            delete_members: raw.delete_members.into_iter().map(MemberRef::into_name).collect(),
            subject: raw.subject,
        })
    }

    /// The group the body names, or `fallback` from the envelope context.
    pub fn group_id<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn login() -> LoginGroups {
        LoginGroups {
            student: "uw_student".into(),
            sponsored: "uw_sponsored".into(),
            affiliate: "uw_affiliate".into(),
        }
    }

    #[test]
    fn test_login_groups_win_before_known() {
        assert_eq!(route("uw_student", &login(), true), Some(GroupRoute::StudentLogin));
        assert_eq!(route("uw_sponsored", &login(), true), Some(GroupRoute::SponsoredLogin));
        assert_eq!(route("uw_affiliate", &login(), true), Some(GroupRoute::AffiliateLogin));
        assert_eq!(route("uw_other", &login(), true), Some(GroupRoute::Known));
    }

    #[test]
    fn test_course_groups_and_unrouted() {
        assert_eq!(
            route("course_2024spr-cse142a", &login(), false),
            Some(GroupRoute::Course {
                course_id: "2024-spring-CSE-142-A".into()
            })
        );
        assert_eq!(route("uw_other", &login(), false), None);
    }

    #[test]
    fn test_empty_login_names_never_match() {
        assert_eq!(route("", &LoginGroups::default(), false), None);
    }

    #[test]
    fn test_actions() {
        assert_eq!(GroupAction::parse("delete-group"), GroupAction::DeleteGroup);
        assert_eq!(GroupAction::parse("rename"), GroupAction::Unknown("rename".into()));
        assert_eq!(GroupAction::ChangeSubjectName.to_string(), "change-subject-name");
    }

    #[test]
    fn test_document_members_and_subject() {
        let doc = GroupDocument::parse(&json!({
            "name": "uw_group",
            "add-members": ["javerage", {"name": "jdoe", "type": "uwnetid"}],
            "subject": {"old-name": "uw_a", "new-name": "uw_b"}
        }))
        .unwrap();
        assert_eq!(doc.add_members, vec!["javerage", "jdoe"]);
        assert!(doc.delete_members.is_empty());
        assert_eq!(doc.subject.unwrap().new_name, "uw_b");
        assert_eq!(GroupDocument::default().group_id("ctx"), "ctx");
    }
}
