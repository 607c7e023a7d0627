//! Person change events (`uw-person-change-v1`).

use serde::Deserialize;
use serde_json::Value;

use crate::domain::payload::opt_text;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersonSnapshot {
    #[serde(rename = "UWNetID", default, deserialize_with = "opt_text")]
    pub net_id: Option<String>,
    #[serde(rename = "RegID", default, deserialize_with = "opt_text")]
    pub reg_id: Option<String>,
    #[serde(rename = "StudentName", default, deserialize_with = "opt_text")]
    pub student_name: Option<String>,
    #[serde(rename = "FirstName", default, deserialize_with = "opt_text")]
    pub first_name: Option<String>,
    #[serde(rename = "LastName", default, deserialize_with = "opt_text")]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PersonMessage {
    current: Option<PersonSnapshot>,
    previous: Option<PersonSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonChange {
    /// No net id on either side; nothing to match a user by.
    MissingNetId { reg_id: String },
    Unchanged,
    /// Name or identifiers changed; the user should be re-provisioned.
    Changed { net_id: String, reg_id: String },
}

pub fn normalize(body: &Value) -> Result<PersonChange, String> {
    let message: PersonMessage = serde_json::from_value(body.clone()).map_err(|e| e.to_string())?;
    let latest = message
        .current
        .as_ref()
        .or(message.previous.as_ref())
        .ok_or("neither Current nor Previous person present")?;

    let reg_id = latest.reg_id.clone().unwrap_or_default();
    let Some(net_id) = latest.net_id.clone().filter(|n| !n.is_empty()) else {
        return Ok(PersonChange::MissingNetId { reg_id });
    };

    let changed = match (&message.current, &message.previous) {
        // Snapshots hold only the name and identifier fields.
        (Some(current), Some(previous)) => current != previous,
        _ => true,
    };
    Ok(if changed {
        PersonChange::Changed { net_id, reg_id }
    } else {
        PersonChange::Unchanged
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(net_id: &str, last: &str) -> Value {
        json!({
            "UWNetID": net_id,
            "RegID": "9136CCB8F66711D5BE060004AC494FFE",
            "StudentName": "Average,Joseph",
            "FirstName": "Joseph",
            "LastName": last
        })
    }

    #[test]
    fn test_name_change_is_reported() {
        let body = json!({"Current": person("javerage", "Avg"), "Previous": person("javerage", "Average")});
        assert_eq!(
            normalize(&body).unwrap(),
            PersonChange::Changed {
                net_id: "javerage".into(),
                reg_id: "9136CCB8F66711D5BE060004AC494FFE".into()
            }
        );
    }

    #[test]
    fn test_identical_snapshots_are_unchanged() {
        let body = json!({"Current": person("javerage", "Average"), "Previous": person("javerage", "Average")});
        assert_eq!(normalize(&body).unwrap(), PersonChange::Unchanged);
    }

    #[test]
    fn test_new_person_counts_as_change() {
        let body = json!({"Current": person("javerage", "Average"), "Previous": null});
        assert!(matches!(normalize(&body).unwrap(), PersonChange::Changed { .. }));
    }

    #[test]
    fn test_missing_net_id_is_ignored() {
        let body = json!({"Current": person("", "Average"), "Previous": null});
        assert!(matches!(normalize(&body).unwrap(), PersonChange::MissingNetId { .. }));
        assert!(normalize(&json!({"Current": null, "Previous": null})).is_err());
    }
}
