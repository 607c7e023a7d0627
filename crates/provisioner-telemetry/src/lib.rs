//! # Provisioner Telemetry
//!
//! Logging and metrics shared by every `rp-jobs` entry point.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use provisioner_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env().for_job("gather-enrollment");
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RP_LOG_LEVEL` | `info` | Log filter |
//! | `RUST_LOG` | unset | Log filter, wins over `RP_LOG_LEVEL` |
//! | `RP_LOG_JSON` | `false` | JSON log lines |
//! | `RP_SERVICE_NAME` | `roster-provisioner` | Service name |

mod config;
mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, DEFAULT_SERVICE_NAME};
pub use logging::{build_filter, init_logging};
pub use metrics::{
    gather_metrics, record_batch, record_events, record_rejected, register_metrics,
    BATCHES_TOTAL, EVENT_COUNT, MESSAGES_REJECTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Failed to install log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics, then install the log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
