//! Error types for the import queue.

use shared_types::{BatchId, EntityKind, SnapshotError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// No work available. A normal outcome, not a failure.
    #[error("No {0} entities available to import")]
    Empty(EntityKind),

    #[error("Import batch not found: {0}")]
    BatchNotFound(BatchId),

    #[error("Queue store error: {0}")]
    Store(#[from] SnapshotError),

    #[error("Queue transaction did not run")]
    TransactionAborted,
}

impl QueueError {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueError::Empty(_))
    }
}
