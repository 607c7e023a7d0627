//! # Batch Builder Subsystem (RP-05)
//!
//! Turns the rows an import batch claimed into a deterministic export
//! artifact: a set of CSV files with fixed headers, sorted rows and a
//! SHA-256 digest.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): CSV encoding, per-kind rows and
//!   fingerprints, the deduplicating collector.
//! - **Ports Layer** (`ports/`): `BatchBuilderApi` (inbound), `RosterSource`
//!   and `ArtifactStore` (outbound).
//! - **Service Layer** (`service.rs`): `BatchBuilder`.
//! - **Adapters** (`adapters/`): directory and in-memory artifact stores,
//!   in-memory roster.
//!
//! ## Modes
//!
//! | Mode  | Rows written                                              |
//! |-------|-----------------------------------------------------------|
//! | Full  | every claimed entity; course builds add roster sections   |
//! | Delta | entities whose fingerprint differs from the export ledger |
//!
//! High and Immediate batches always build in full. A build that writes no
//! rows returns `BuildError::MissingArtifact` and stores nothing.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::directory::DirectoryArtifactStore;
pub use adapters::memory::{InMemoryArtifactStore, InMemoryRosterSource};
pub use domain::collector::{Collector, RenderedFile};
pub use domain::csv::ExportFile;
pub use domain::rows::{fingerprint, ExportRow, SectionListing, UserProfile};
pub use error::BuildError;
pub use ports::inbound::BatchBuilderApi;
pub use ports::outbound::{ArtifactStore, RosterSource, RosterSourceError};
pub use service::{artifact_digest, BatchBuilder};
