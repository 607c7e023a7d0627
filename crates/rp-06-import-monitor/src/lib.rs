//! # Import Monitor Subsystem (RP-06)
//!
//! Drives one import batch from a fresh claim to a terminal state: build the
//! artifact, submit it to the LMS, then poll the remote import until it
//! finishes or the monitoring window runs out.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): monitoring policy, remote status
//!   interpretation, submit and poll outcomes.
//! - **Ports Layer** (`ports/`): `ImportMonitorApi` (inbound), `LmsImportApi`
//!   (outbound).
//! - **Service Layer** (`service.rs`): `ImportMonitor`.
//! - **Adapters** (`adapters/`): scripted in-memory LMS.
//!
//! ## Batch States
//!
//! ```text
//!  [queued] ──▶ [building] ──┬── nothing changed ──▶ (released, deleted)
//!                            │
//!                            ├── build error ──────▶ [built + build_error]
//!                            │
//!                            └──▶ [built] ──submit──┬──▶ [submitted]
//!                                                   └──▶ [failed]
//!
//!  [submitted|monitoring] ──poll──┬── pending / fetch error ──▶ [monitoring]
//!                                 ├── imported ──────────────▶ [complete]
//!                                 └── failed / window over ──▶ [failed]
//! ```
//!
//! A complete batch releases its rows as provisioned and records their
//! fingerprints in the export ledger. Its record is deleted when the import
//! carried no relevant warnings or errors, and kept otherwise. A failed batch
//! keeps its rows claimed until an operator releases them.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::memory::InMemoryLms;
pub use domain::policy::MonitorPolicy;
pub use domain::remote::{RemoteImport, RemoteOutcome, RemoteStatus, IGNORED_WARNING_CODE};
pub use domain::report::{MonitorReport, PollOutcome, SubmitOutcome};
pub use error::MonitorError;
pub use ports::inbound::ImportMonitorApi;
pub use ports::outbound::{LmsError, LmsImportApi};
pub use service::{ImportMonitor, MONITORING_WINDOW_EXCEEDED};
