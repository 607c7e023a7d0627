//! # Roster-Provisioner Test Suite
//!
//! Scenarios that cross subsystem boundaries. Unit tests live next to the
//! code in each crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs             # Full pipeline over file-backed stores
//!     ├── intake_flows.rs        # Envelopes through normalizers to the queue
//!     ├── provisioning_flows.rs  # Claim, build, submit, monitor
//!     └── guard_flows.rs         # Job locking through the runner
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rp-tests
//! cargo test -p rp-tests integration::provisioning_flows::
//! ```

pub mod integration;
