//! In-memory roster.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use shared_types::User;

use crate::domain::identity::{Quarter, SectionRef};
use crate::ports::outbound::{RosterError, RosterService};

/// Every term is active and every schedule ready unless marked otherwise.
#[derive(Debug, Default)]
pub struct InMemoryRoster {
    inactive_terms: RwLock<HashSet<(i32, Quarter)>>,
    unready_sections: RwLock<HashSet<String>>,
    people: RwLock<HashMap<String, User>>,
    members: RwLock<HashSet<(String, String)>>,
}

impl InMemoryRoster {
    pub fn deactivate_term(&self, year: i32, quarter: Quarter) {
        self.inactive_terms.write().insert((year, quarter));
    }

    pub fn mark_unready(&self, course_id: &str) {
        self.unready_sections.write().insert(course_id.to_string());
    }

    pub fn add_person(&self, login_id: &str, user: User) {
        self.people.write().insert(login_id.to_string(), user);
    }

    pub fn add_member(&self, group_id: &str, login_id: &str) {
        self.members
            .write()
            .insert((group_id.to_string(), login_id.to_string()));
    }
}

#[async_trait::async_trait]
impl RosterService for InMemoryRoster {
    async fn is_active_term(&self, year: i32, quarter: Quarter) -> Result<bool, RosterError> {
        Ok(!self.inactive_terms.read().contains(&(year, quarter)))
    }

    async fn is_time_schedule_ready(&self, section: &SectionRef) -> Result<bool, RosterError> {
        Ok(!self.unready_sections.read().contains(&section.course_id()))
    }

    async fn person_by_login(&self, login_id: &str) -> Result<Option<User>, RosterError> {
        Ok(self.people.read().get(login_id).cloned())
    }

    async fn is_group_member(&self, group_id: &str, login_id: &str) -> Result<bool, RosterError> {
        Ok(self
            .members
            .read()
            .contains(&(group_id.to_string(), login_id.to_string())))
    }
}
