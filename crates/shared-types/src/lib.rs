//! # Shared Types Crate
//!
//! Record shapes shared by every stage of the provisioning pipeline:
//!
//! ```text
//! message queue -> envelope -> normalizer -> [QueueEntry] -> ImportBatch -> LMS
//! ```
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: entity and batch types are defined here and
//!   nowhere else.
//! - **Natural Keys**: every [`QueueableEntity`] exposes a [`NaturalKey`];
//!   stores key rows by it so an entity maps to at most one live row.
//! - **Explicit Time**: nothing reads the wall clock directly; a
//!   [`TimeSource`] is injected.

pub mod batch;
pub mod clock;
pub mod entities;
pub mod errors;
pub mod snapshot;

pub use batch::*;
pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use entities::*;
pub use errors::*;
pub use snapshot::SnapshotFile;
