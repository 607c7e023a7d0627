//! # Error Types
//!
//! Errors shared by the file-backed stores.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing a JSON snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exists but does not hold the expected document.
    #[error("Corrupt snapshot {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}
