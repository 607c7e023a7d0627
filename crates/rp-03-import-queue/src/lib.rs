//! # Import Queue Subsystem (RP-03)
//!
//! Holds one row per provisionable entity (course, enrollment, group
//! membership, user), each with a priority tier, and hands rows out to import
//! batches without ever giving the same row to two batches at once.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): `QueueState` document, claim selection,
//!   entity application rules, per-kind limits.
//! - **Ports Layer** (`ports/`): `ImportQueueApi` (inbound), `QueueStorage`
//!   (outbound).
//! - **Service Layer** (`service.rs`): `ImportQueue`.
//! - **Adapters** (`adapters/`): in-memory and locked-snapshot storage.
//!
//! ## Row Lifecycle
//!
//! ```text
//!             apply / upsert                 queue_by_priority
//!   (event) ─────────────────▶ [unclaimed] ─────────────────────▶ [claimed: batch]
//!                                   ▲                                    │
//!                                   │  dequeue(imported = false)         │
//!                                   ├────────────────────────────────────┤
//!                                   │  dequeue(imported = true)          │
//!                                   │  provisioned_at = now              │
//!                                   └─ enrollment: tier - 1 ◀────────────┘
//!                                      others:     Default
//! ```
//!
//! ## Priority Tiers
//!
//! | Tier      | Claimed by requests at       |
//! |-----------|------------------------------|
//! | None      | never                        |
//! | Default   | Default                      |
//! | High      | Default, High                |
//! | Immediate | Default, High, Immediate     |
//!
//! ## Atomicity
//!
//! Selection and claim stamping run inside one `QueueStorage::transaction`.
//! The file adapter holds an exclusive lock for the whole cycle, so two
//! processes claiming the same kind always receive disjoint rows.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::file::FileQueueStorage;
pub use adapters::memory::InMemoryQueueStorage;
pub use domain::apply::{course_for, ApplyOutcome, EnrollmentApplied, UserUpdate};
pub use domain::claim::ClaimRequest;
pub use domain::limits::{ImportLimits, TierLimits};
pub use domain::state::QueueState;
pub use error::QueueError;
pub use ports::inbound::ImportQueueApi;
pub use ports::outbound::QueueStorage;
pub use service::{ImportQueue, ENROLLMENT_RETENTION_DAYS};
