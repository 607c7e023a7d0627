//! Inbound port for the import monitor.

use shared_types::ImportBatch;

use crate::domain::report::{MonitorReport, PollOutcome, SubmitOutcome};
use crate::error::MonitorError;

#[async_trait::async_trait]
pub trait ImportMonitorApi: Send + Sync {
    /// Build and submit a batch fresh from the queue.
    async fn submit(&self, batch: ImportBatch) -> Result<SubmitOutcome, MonitorError>;

    /// Poll one submitted or monitoring batch.
    async fn poll(&self, batch: ImportBatch) -> Result<PollOutcome, MonitorError>;

    /// Poll every batch awaiting a remote result.
    async fn monitor_imports(&self) -> Result<MonitorReport, MonitorError>;
}
