//! # Job Runtime
//!
//! The `rp-jobs` binary and everything it needs to run the provisioning
//! pipeline against real collaborators.
//!
//! ## Modular Structure
//!
//! - `config` - layered [`RuntimeConfig`] (defaults, TOML file, environment)
//! - `adapters/` - `reqwest` implementations of the key service, certificate,
//!   roster and LMS ports
//! - `container` - concrete subsystem stacks per job
//! - `jobs` - one entry point per subcommand
//! - `runner` - job lock, dispatch and metrics output
//!
//! ## Exit Codes
//!
//! | Run | Exit |
//! |-----|------|
//! | completed, including absorbed build or LMS errors | 0 |
//! | skipped because another run holds the lock | 0 |
//! | messages rejected by envelope checks | 1 |
//! | messages or batches left behind by an unexpected error | 1 |
//! | configuration, store or other unexpected error | 1 |

pub mod adapters;
pub mod cli;
pub mod config;
pub mod container;
pub mod jobs;
pub mod runner;
pub mod status;

pub use cli::{Cli, Command};
pub use config::{ConfigError, RuntimeConfig};
pub use container::{ContainerError, ServiceContainer};
pub use runner::{run, run_with, write_metrics};
pub use status::RunStatus;
