//! # Execution Guard Subsystem (RP-07)
//!
//! Keeps two invocations of the same scheduled job from overlapping. A run
//! that finds the job already running is skipped, not queued and not failed.
//!
//! ## Architecture
//!
//! - **Ports Layer** (`ports/`): `ProcessProbe` (outbound liveness check).
//! - **Service Layer** (`service.rs`): `ExecutionGuard`, `Acquisition`,
//!   `JobLock`.
//! - **Adapters** (`adapters/`): operating-system process liveness check.
//!
//! ## Acquisition
//!
//! ```text
//! try_lock_exclusive(<lock_dir>/<job>.lock)
//!   ├─ held elsewhere ──▶ Busy { pid from <job>.pid }
//!   └─ locked ──▶ <job>.pid names a live process?
//!                   ├─ yes ──▶ unlock, Busy { pid }
//!                   └─ no  ──▶ write own PID ──▶ Acquired(JobLock)
//! ```
//!
//! The lock file is never removed. The pidfile is removed when the
//! `JobLock` is dropped, before the lock is released.

pub mod adapters;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::proc::OsProcessProbe;
pub use error::GuardError;
pub use ports::outbound::ProcessProbe;
pub use service::{Acquisition, ExecutionGuard, JobLock};
