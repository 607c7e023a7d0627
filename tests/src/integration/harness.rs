//! A whole pipeline wired the way `rp-jobs` wires it, with the remote
//! collaborators replaced by in-memory ones and a manual clock.
//!
//! Intake and monitor each own an `ImportQueue` over the same queue file,
//! just as separate job processes do.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rp_01_message_envelope::testing::{raw, EnvelopeFixture, KeyRef};
use rp_01_message_envelope::{CachingKeyService, EnvelopeProcessor, InMemoryCertificates, InMemoryKeyMaterial};
use rp_02_event_health::{FileHealthStore, HealthMonitor, RecordingAlertSink};
use rp_03_import_queue::{FileQueueStorage, ImportLimits, ImportQueue};
use rp_04_event_intake::{EventFamily, EventIntake, InMemoryMessageQueue, InMemoryRoster, LoginGroups};
use rp_05_batch_builder::{BatchBuilder, DirectoryArtifactStore, InMemoryRosterSource};
use rp_06_import_monitor::{ImportMonitor, InMemoryLms, MonitorPolicy};
use serde_json::{json, Value};
use shared_crypto::AesKey;
use shared_types::ManualTimeSource;
use tempfile::TempDir;

pub const REG_ID: &str = "9136CCB8F66711D5BE060004AC494FFE";
pub const REGISTRATION_TYPE: &str = "uw-student-registration-v2";

pub type Clock = Arc<ManualTimeSource>;
pub type Queue = ImportQueue<FileQueueStorage, Clock>;
pub type Processor = EnvelopeProcessor<CachingKeyService<InMemoryKeyMaterial>, InMemoryCertificates>;
pub type Health = HealthMonitor<FileHealthStore, RecordingAlertSink, Clock>;
pub type Intake = EventIntake<Processor, Queue, Health, InMemoryRoster>;
pub type Monitor = ImportMonitor<Queue, BatchBuilder<InMemoryRosterSource, DirectoryArtifactStore>, InMemoryLms, Clock>;

pub struct Pipeline {
    pub dir: TempDir,
    pub clock: Clock,
    pub fixture: EnvelopeFixture,
    pub registration_key: AesKey,
    pub intake: Intake,
    pub monitor: Monitor,
    pub messages: InMemoryMessageQueue<Clock>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_keys(|keys, current| keys.push_current(REGISTRATION_TYPE, "k1", current))
    }

    /// `load` fills the key service; it gets the key registration bodies
    /// are encrypted with.
    pub fn with_keys(load: impl FnOnce(&InMemoryKeyMaterial, &AesKey)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock: Clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 4, 1, 10, 5, 0).unwrap(),
        ));
        let fixture = EnvelopeFixture::new(11);
        let registration_key = AesKey::from_bytes([3; 16]);

        let keys = InMemoryKeyMaterial::default();
        load(&keys, &registration_key);
        let envelopes = EnvelopeProcessor::new(CachingKeyService::new(keys), fixture.certificates());

        let queue_file = dir.path().join("import-queue.json");
        let queue = || ImportQueue::new(FileQueueStorage::open(&queue_file), clock.clone(), ImportLimits::default());
        let health = HealthMonitor::new(
            FileHealthStore::open(dir.path().join("event-health.json")),
            RecordingAlertSink::default(),
            clock.clone(),
        );
        let intake = EventIntake::new(envelopes, queue(), health, InMemoryRoster::default())
            .with_login_groups(LoginGroups {
                student: "uw_affiliation_student".into(),
                affiliate: "uw_affiliation_affiliate".into(),
                sponsored: "uw_affiliation_sponsored".into(),
            });
        let monitor = ImportMonitor::new(
            queue(),
            BatchBuilder::new(
                InMemoryRosterSource::default(),
                DirectoryArtifactStore::new(dir.path().join("artifacts")),
            ),
            InMemoryLms::default(),
            clock.clone(),
            MonitorPolicy::default(),
        );
        let messages = InMemoryMessageQueue::new(clock.clone());

        Self {
            dir,
            clock,
            fixture,
            registration_key,
            intake,
            monitor,
            messages,
        }
    }

    /// An encrypted registration message for `reg_id`, keyed by the current
    /// key.
    pub fn registration(&self, code: &str, reg_id: &str, section: &str) -> String {
        raw(&self.fixture.standard_encrypted(
            REGISTRATION_TYPE,
            "2",
            &registration_body(code, reg_id, section),
            &self.registration_key,
            KeyRef::Current,
        ))
    }

    pub fn instructor_drop(&self, previous: &[&str], current: &[&str]) -> String {
        raw(&self.fixture.standard(
            EventFamily::InstructorDrop.profile().message_type,
            "1",
            &instructor_body(previous, current),
        ))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

pub fn registration_body(code: &str, reg_id: &str, section: &str) -> String {
    json!({"Events": [{
        "EventID": format!("e-{reg_id}"),
        "Action": {"Code": code},
        "Person": {"UWRegID": reg_id},
        "Section": {
            "Course": {
                "Quarter": "SPR",
                "Year": 2024,
                "CurriculumAbbreviation": "CSE",
                "CourseNumber": "142"
            },
            "SectionID": section
        },
        "LastModified": "2024-04-01T10:00:00Z"
    }]})
    .to_string()
}

fn instructor_snapshot(instructors: &[&str]) -> Value {
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
                .map(|r| json!({"Person": {"RegID": r, "Name": "Instructor"}}))
                .collect::<Vec<_>>()
        }]
    })
}

pub fn instructor_body(previous: &[&str], current: &[&str]) -> String {
    json!({
        "EventID": "i-1",
        "EventDate": "2024-04-02T08:00:00Z",
        "Previous": instructor_snapshot(previous),
        "Current": instructor_snapshot(current)
    })
    .to_string()
}
