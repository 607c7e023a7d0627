//! Error types for the event health subsystem.

use shared_types::SnapshotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Health store error: {0}")]
    Store(#[from] SnapshotError),

    #[error("Alert delivery failed: {0}")]
    AlertDelivery(String),
}
