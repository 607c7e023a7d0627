//! # Event Intake Subsystem (RP-04)
//!
//! Drains the per-family message queues, turns each verified message into
//! canonical enrollment, user and group changes, and applies them to the
//! import queue.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): event families, identifier rules, skip
//!   reasons, gather reports.
//! - **Normalizers** (`normalizer/`): one per family, pure functions from a
//!   decrypted body to canonical records.
//! - **Ports Layer** (`ports/`): `EventIntakeApi` (inbound), `MessageQueue` and
//!   `RosterService` (outbound).
//! - **Service Layer** (`service.rs`): `EventIntake`.
//! - **Adapters** (`adapters/`): in-memory queue and roster, spool-directory
//!   queue.
//!
//! ## Message Flow
//!
//! ```text
//!  MessageQueue ──receive──▶ Envelope::parse ──▶ EnvelopeApi::validate
//!       ▲                                               │
//!       │ delete (only on Ok)                           ▼
//!       │                                      EnvelopeApi::decrypt
//!       │                                               │
//!       │                                               ▼
//!       └──────── record_events ◀── ImportQueueApi ◀── normalizer
//! ```
//!
//! ## Families
//!
//! | Family          | Message type                 | Frequency log |
//! |-----------------|------------------------------|---------------|
//! | enrollment      | uw-student-registration-v2/2 | enrollment    |
//! | instructor-add  | uw-instructor-add/1          | instructor    |
//! | instructor-drop | uw-instructor-drop/1         | instructor    |
//! | group           | gws/UWIT-1                   | group         |
//! | person          | uw-person-change-v1/1        | person        |
//!
//! A message that fails is never deleted; the queue redelivers it once its
//! visibility timeout lapses.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod normalizer;
pub mod ports;
pub mod service;

pub use adapters::memory_queue::InMemoryMessageQueue;
pub use adapters::memory_roster::InMemoryRoster;
pub use adapters::spool::SpoolMessageQueue;
pub use domain::family::EventFamily;
pub use domain::identity::{
    course_group_id, is_valid_login_id, is_valid_net_id, normalize_reg_id, Quarter, SectionRef,
};
pub use domain::outcome::{NormalizeOutcome, SkipReason};
pub use domain::report::{GatherOptions, GatherReport, MessageOutcome};
pub use error::IntakeError;
pub use normalizer::group::{GroupAction, GroupDocument, GroupRoute, LoginGroups};
pub use normalizer::instructor::{InstructorChange, InstructorEvent};
pub use normalizer::person::PersonChange;
pub use ports::inbound::EventIntakeApi;
pub use ports::outbound::{MessageQueue, ReceivedMessage, RosterError, RosterService, TransportError};
pub use service::EventIntake;
