//! # Runtime Configuration
//!
//! Assembled in three layers: built-in defaults, an optional TOML file, then
//! environment overrides. Every section has sane defaults so a file only
//! needs the keys it changes.
//!
//! ```toml
//! [paths]
//! data_dir = "/var/lib/rp"
//!
//! [queues.enrollment]
//! acceptable_silence_minutes = 120
//!
//! [import_limits.user]
//! default = 250
//! high = 100
//!
//! [remote]
//! lms_url = "https://lms.example.edu"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;
use rp_03_import_queue::ImportLimits;
use rp_04_event_intake::{EventFamily, GatherOptions, LoginGroups};
use rp_06_import_monitor::MonitorPolicy;
use serde::Deserialize;
use shared_crypto::AesKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub paths: PathsConfig,
    pub queues: QueuesConfig,
    pub import_limits: ImportLimits,
    pub monitor: MonitorConfig,
    pub groups: GroupsConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Queue store and frequency logs.
    pub data_dir: PathBuf,
    /// Built artifacts, one directory per batch.
    pub artifact_root: PathBuf,
    /// Job pidfiles.
    pub lock_dir: PathBuf,
    /// Message spool, one directory per family.
    pub spool_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            artifact_root: PathBuf::from("./data/artifacts"),
            lock_dir: PathBuf::from("./data/locks"),
            spool_root: PathBuf::from("./data/spool"),
        }
    }
}

impl PathsConfig {
    pub fn queue_store(&self) -> PathBuf {
        self.data_dir.join("import-queue.json")
    }

    pub fn health_store(&self) -> PathBuf {
        self.data_dir.join("event-health.json")
    }
}

/// Message queue settings for one event family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub max_messages: usize,
    pub visibility_timeout_secs: i64,
    pub acceptable_silence_minutes: i64,
    pub prune_after_days: u32,
}

impl QueueSettings {
    const fn with_silence(acceptable_silence_minutes: i64) -> Self {
        Self {
            max_messages: 10,
            visibility_timeout_secs: 300,
            acceptable_silence_minutes,
            prune_after_days: 7,
        }
    }

    pub fn gather_options(&self) -> GatherOptions {
        GatherOptions {
            max_messages: self.max_messages,
            visibility_timeout: Duration::seconds(self.visibility_timeout_secs),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::with_silence(360)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueuesConfig {
    pub enrollment: QueueSettings,
    /// Shared by the instructor add and drop queues.
    pub instructor: QueueSettings,
    pub group: QueueSettings,
    pub person: QueueSettings,
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            enrollment: QueueSettings::with_silence(360),
            instructor: QueueSettings::with_silence(1440),
            group: QueueSettings::with_silence(1440),
            person: QueueSettings::with_silence(360),
        }
    }
}

impl QueuesConfig {
    pub fn for_family(&self, family: EventFamily) -> &QueueSettings {
        match family {
            EventFamily::Enrollment => &self.enrollment,
            EventFamily::InstructorAdd | EventFamily::InstructorDrop => &self.instructor,
            EventFamily::Group => &self.group,
            EventFamily::Person => &self.person,
        }
    }

    fn all(&self) -> [(&'static str, &QueueSettings); 4] {
        [
            ("enrollment", &self.enrollment),
            ("instructor", &self.instructor),
            ("group", &self.group),
            ("person", &self.person),
        ]
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: i64,
    pub max_monitoring_window_secs: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            max_monitoring_window_secs: 86_400,
        }
    }
}

impl MonitorConfig {
    pub fn policy(&self) -> MonitorPolicy {
        MonitorPolicy {
            poll_interval: Duration::seconds(self.poll_interval_secs),
            max_monitoring_window: Duration::seconds(self.max_monitoring_window_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GroupsConfig {
    pub student: String,
    pub affiliate: String,
    pub sponsored: String,
    /// Group message body keys, base64, by key id.
    pub body_keys: BTreeMap<String, String>,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            student: "uw_affiliation_student".to_string(),
            affiliate: "uw_affiliation_affiliate".to_string(),
            sponsored: "uw_affiliation_sponsored".to_string(),
            body_keys: BTreeMap::new(),
        }
    }
}

impl GroupsConfig {
    pub fn login_groups(&self) -> LoginGroups {
        LoginGroups {
            student: self.student.clone(),
            sponsored: self.sponsored.clone(),
            affiliate: self.affiliate.clone(),
        }
    }

    pub fn decoded_body_keys(&self) -> Result<std::collections::HashMap<String, AesKey>, ConfigError> {
        self.body_keys
            .iter()
            .map(|(id, encoded)| {
                AesKey::from_base64(encoded)
                    .map(|key| (id.clone(), key))
                    .map_err(|e| ConfigError::Invalid(format!("groups.body_keys.{id}: {e}")))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub key_service_url: String,
    pub roster_url: String,
    pub lms_url: String,
    /// LMS account that receives SIS imports.
    pub lms_account: String,
    pub lms_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            key_service_url: "http://localhost:8081".to_string(),
            roster_url: "http://localhost:8082".to_string(),
            lms_url: "http://localhost:8083".to_string(),
            lms_account: "1".to_string(),
            lms_token: None,
            request_timeout_secs: 30,
        }
    }
}

impl RuntimeConfig {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `RP_*` overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("RP_DATA_DIR") {
            let dir = PathBuf::from(dir);
            self.paths.artifact_root = dir.join("artifacts");
            self.paths.lock_dir = dir.join("locks");
            self.paths.spool_root = dir.join("spool");
            self.paths.data_dir = dir;
        }
        if let Some(url) = lookup("RP_KEY_SERVICE_URL") {
            self.remote.key_service_url = url;
        }
        if let Some(url) = lookup("RP_ROSTER_URL") {
            self.remote.roster_url = url;
        }
        if let Some(url) = lookup("RP_LMS_URL") {
            self.remote.lms_url = url;
        }
        if let Some(token) = lookup("RP_LMS_TOKEN") {
            self.remote.lms_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (family, settings) in self.queues.all() {
            if settings.max_messages == 0 {
                return Err(ConfigError::Invalid(format!("queues.{family}.max_messages is zero")));
            }
            if settings.visibility_timeout_secs <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "queues.{family}.visibility_timeout_secs must be positive"
                )));
            }
        }
        if let Some(kind) = self.import_limits.zero_limits().first() {
            return Err(ConfigError::Invalid(format!("import_limits.{kind} has a zero limit")));
        }
        if self.monitor.poll_interval_secs < 0 || self.monitor.max_monitoring_window_secs <= 0 {
            return Err(ConfigError::Invalid("monitor intervals must be positive".into()));
        }
        for (name, url) in [
            ("key_service_url", &self.remote.key_service_url),
            ("roster_url", &self.remote.roster_url),
            ("lms_url", &self.remote.lms_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("remote.{name} is empty")));
            }
        }
        self.groups.decoded_body_keys()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.queues.instructor.acceptable_silence_minutes, 1440);
        assert_eq!(config.import_limits.enrollment.high, 100);
        assert_eq!(config.monitor.policy(), MonitorPolicy::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [queues.enrollment]
            acceptable_silence_minutes = 120

            [import_limits.user]
            default = 250
            high = 100

            [groups.body_keys]
            gws-1 = "AAECAwQFBgcICQoLDA0ODw=="
            "#,
        )
        .unwrap();

        assert_eq!(config.queues.enrollment.acceptable_silence_minutes, 120);
        assert_eq!(config.queues.enrollment.max_messages, 10);
        assert_eq!(config.import_limits.user.default, 250);
        assert_eq!(config.import_limits.course.default, 300);
        assert_eq!(config.groups.decoded_body_keys().unwrap().len(), 1);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RuntimeConfig::default();
        config.apply_env(|name| match name {
            "RP_DATA_DIR" => Some("/srv/rp".into()),
            "RP_LMS_URL" => Some("https://lms.example.edu".into()),
            "RP_LMS_TOKEN" => Some("secret".into()),
            _ => None,
        });
        assert_eq!(config.paths.queue_store(), PathBuf::from("/srv/rp/import-queue.json"));
        assert_eq!(config.paths.lock_dir, PathBuf::from("/srv/rp/locks"));
        assert_eq!(config.remote.lms_url, "https://lms.example.edu");
        assert_eq!(config.remote.lms_token.as_deref(), Some("secret"));
        assert_eq!(config.remote.roster_url, RemoteConfig::default().roster_url);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RuntimeConfig::default();
        config.queues.group.max_messages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = RuntimeConfig::default();
        config.queues.person.visibility_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.import_limits.group.high = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.remote.roster_url = " ".into();
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.groups.body_keys.insert("gws-1".into(), "not base64!".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_and_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RuntimeConfig::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[paths\n").unwrap();
        assert!(matches!(RuntimeConfig::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_instructor_families_share_settings() {
        let config = RuntimeConfig::default();
        assert_eq!(
            config.queues.for_family(EventFamily::InstructorAdd),
            config.queues.for_family(EventFamily::InstructorDrop)
        );
    }
}
