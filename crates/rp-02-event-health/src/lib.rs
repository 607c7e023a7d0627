//! # Event Health Subsystem (RP-02)
//!
//! Tracks how many events each family applied per minute and flags a family
//! whose queue has gone quiet for longer than it should.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `FrequencyLog` minute buckets, `HealthAlert`,
//!   per-job alert bookkeeping.
//! - **Ports Layer** (`ports/`): `EventHealthApi` (inbound), `HealthStore` and
//!   `AlertSink` (outbound).
//! - **Service Layer** (`service.rs`): `HealthMonitor`.
//! - **Adapters** (`adapters/`): in-memory and snapshot-file stores, log and
//!   recording alert sinks.
//!
//! ## Buckets
//!
//! ```text
//! minute = floor(unix_seconds / 60)
//!
//! record(n):  buckets[minute] += n
//!             if buckets[minute] <= 5: drop buckets older than prune_after_days
//! ```
//!
//! Pruning only runs on quiet minutes, so a burst never loses its history.
//!
//! ## Alerts
//!
//! A silence longer than the family's threshold produces a `HealthAlert`.
//! Alerts never fail the job. The sink is called at most once per hour per
//! job; suppressed alerts are still logged.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::file::FileHealthStore;
pub use adapters::log_sink::LogAlertSink;
pub use adapters::memory::{InMemoryHealthStore, RecordingAlertSink};
pub use domain::frequency::{minute_of, FrequencyLog, PRUNE_THRESHOLD};
pub use domain::health::{HealthAlert, HealthState, HealthStatus, JobHealth, ALERT_THROTTLE};
pub use error::HealthError;
pub use ports::inbound::EventHealthApi;
pub use ports::outbound::{AlertSink, HealthStore};
pub use service::HealthMonitor;
