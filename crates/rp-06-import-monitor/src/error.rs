//! Error types for the import monitor.

use rp_03_import_queue::QueueError;
use shared_types::BatchId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Batch {id} is {state}, expected {expected}")]
    InvalidState {
        id: BatchId,
        state: shared_types::BatchState,
        expected: &'static str,
    },

    #[error("Batch {0} has no remote import id")]
    MissingRemoteId(BatchId),
}
