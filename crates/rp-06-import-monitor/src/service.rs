//! # Import Monitor Service
//!
//! Implements [`ImportMonitorApi`] on top of the import queue (batch records,
//! claims, ledger), the batch builder and the LMS.

use rp_03_import_queue::ImportQueueApi;
use rp_05_batch_builder::{BatchBuilderApi, BuildError};
use shared_types::{BatchId, BatchState, ImportBatch, QueueableEntity, TimeSource};
use tracing::{error, info, warn};

use crate::domain::policy::MonitorPolicy;
use crate::domain::remote::RemoteOutcome;
use crate::domain::report::{MonitorReport, PollOutcome, SubmitOutcome};
use crate::error::MonitorError;
use crate::ports::inbound::ImportMonitorApi;
use crate::ports::outbound::LmsImportApi;

pub const MONITORING_WINDOW_EXCEEDED: &str = "monitoring window exceeded";

pub struct ImportMonitor<Q, B, L, T>
where
    Q: ImportQueueApi,
    B: BatchBuilderApi,
    L: LmsImportApi,
    T: TimeSource,
{
    queue: Q,
    builder: B,
    lms: L,
    clock: T,
    policy: MonitorPolicy,
}

impl<Q, B, L, T> ImportMonitor<Q, B, L, T>
where
    Q: ImportQueueApi,
    B: BatchBuilderApi,
    L: LmsImportApi,
    T: TimeSource,
{
    pub fn new(queue: Q, builder: B, lms: L, clock: T, policy: MonitorPolicy) -> Self {
        Self {
            queue,
            builder,
            lms,
            clock,
            policy,
        }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn lms(&self) -> &L {
        &self.lms
    }

    fn transition(&self, batch: &mut ImportBatch, state: BatchState) -> Result<(), MonitorError> {
        batch.state = state;
        self.queue.save_batch(batch)?;
        Ok(())
    }

    /// Build the artifact. `None` when the batch is finished without one.
    async fn build(&self, batch: &mut ImportBatch) -> Result<Option<SubmitOutcome>, MonitorError> {
        self.transition(batch, BatchState::Building)?;
        let entities: Vec<QueueableEntity> = self
            .queue
            .claimed(batch.id)?
            .into_iter()
            .map(|entry| entry.entity)
            .collect();
        let ledger = self.queue.ledger()?;

        match self.builder.build(batch, &entities, &ledger).await {
            Ok(artifact) => {
                batch.artifact = Some(artifact);
                self.transition(batch, BatchState::Built)?;
                Ok(None)
            }
            Err(BuildError::MissingArtifact) => {
                // Every claimed row already matches what the LMS holds.
                self.queue.dequeue(batch.id, true)?;
                self.queue.delete_batch(batch.id)?;
                info!(batch_id = %batch.id, kind = %batch.kind, "no changes to send, batch removed");
                Ok(Some(SubmitOutcome::NothingToSend))
            }
            Err(e) => {
                error!(batch_id = %batch.id, kind = %batch.kind, "build failed: {e}");
                batch.build_error = Some(e.to_string());
                self.transition(batch, BatchState::Built)?;
                Ok(Some(SubmitOutcome::BuildFailed(e.to_string())))
            }
        }
    }

    /// Keep a poll error on the batch record for operators. Repeats of the
    /// last recorded error are not added again.
    fn note_error(&self, id: BatchId, message: &str) {
        let noted = self.queue.batch(id).and_then(|mut batch| {
            if batch.errors.last().map(String::as_str) == Some(message) {
                return Ok(());
            }
            batch.errors.push(message.to_string());
            self.queue.save_batch(&batch)
        });
        if let Err(e) = noted {
            warn!(batch_id = %id, "could not record poll error: {e}");
        }
    }

    fn fail(&self, batch: &mut ImportBatch, reason: &str) -> Result<PollOutcome, MonitorError> {
        warn!(batch_id = %batch.id, kind = %batch.kind, "import failed: {reason}");
        batch.errors.push(reason.to_string());
        self.transition(batch, BatchState::Failed)?;
        Ok(PollOutcome::Failed)
    }
}

#[async_trait::async_trait]
impl<Q, B, L, T> ImportMonitorApi for ImportMonitor<Q, B, L, T>
where
    Q: ImportQueueApi,
    B: BatchBuilderApi,
    L: LmsImportApi,
    T: TimeSource,
{
    async fn submit(&self, mut batch: ImportBatch) -> Result<SubmitOutcome, MonitorError> {
        if batch.state != BatchState::Queued {
            return Err(MonitorError::InvalidState {
                id: batch.id,
                state: batch.state,
                expected: "queued",
            });
        }
        if let Some(finished) = self.build(&mut batch).await? {
            return Ok(finished);
        }
        let Some(artifact) = batch.artifact.clone() else {
            return Ok(SubmitOutcome::NothingToSend);
        };

        match self.lms.submit(&artifact, batch.override_sis_stickiness).await {
            Ok(remote) => {
                batch.post_status = Some(200);
                batch.remote_id = Some(remote.id.clone());
                batch.remote_state = Some(remote.workflow_state);
                batch.submitted_at = Some(self.clock.now());
                self.transition(&mut batch, BatchState::Submitted)?;
                info!(
                    batch_id = %batch.id,
                    kind = %batch.kind,
                    priority = %batch.priority,
                    remote_id = %remote.id,
                    rows = artifact.row_count,
                    "batch submitted"
                );
                Ok(SubmitOutcome::Submitted { remote_id: remote.id })
            }
            Err(e) => {
                error!(batch_id = %batch.id, kind = %batch.kind, "submission failed: {e}");
                batch.post_status = Some(e.status());
                batch.errors.push(e.to_string());
                self.transition(&mut batch, BatchState::Failed)?;
                Ok(SubmitOutcome::Rejected {
                    status: e.status(),
                    message: e.to_string(),
                })
            }
        }
    }

    async fn poll(&self, mut batch: ImportBatch) -> Result<PollOutcome, MonitorError> {
        if !matches!(batch.state, BatchState::Submitted | BatchState::Monitoring) {
            return Err(MonitorError::InvalidState {
                id: batch.id,
                state: batch.state,
                expected: "submitted or monitoring",
            });
        }
        let now = self.clock.now();
        if batch
            .last_polled_at
            .is_some_and(|last| now - last < self.policy.poll_interval)
        {
            return Ok(PollOutcome::Skipped);
        }
        if batch
            .submitted_at
            .is_some_and(|at| now - at > self.policy.max_monitoring_window)
        {
            return self.fail(&mut batch, MONITORING_WINDOW_EXCEEDED);
        }
        let remote_id = batch
            .remote_id
            .clone()
            .ok_or(MonitorError::MissingRemoteId(batch.id))?;

        batch.last_polled_at = Some(now);
        batch.poll_count += 1;
        let status = match self.lms.status(&remote_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(batch_id = %batch.id, remote_id = %remote_id, "status fetch failed: {e}");
                self.transition(&mut batch, BatchState::Monitoring)?;
                return Ok(PollOutcome::Pending);
            }
        };

        batch.remote_state = Some(status.workflow_state.clone());
        batch.progress = status.progress;
        batch.warnings = status.relevant_warnings();
        batch.errors = status.errors.clone();

        match status.outcome() {
            RemoteOutcome::Pending => {
                self.transition(&mut batch, BatchState::Monitoring)?;
                Ok(PollOutcome::Pending)
            }
            RemoteOutcome::Failed => {
                warn!(
                    batch_id = %batch.id,
                    remote_state = %status.workflow_state,
                    errors = batch.errors.len(),
                    "remote import failed"
                );
                self.transition(&mut batch, BatchState::Failed)?;
                Ok(PollOutcome::Failed)
            }
            RemoteOutcome::Complete => {
                self.transition(&mut batch, BatchState::Complete)?;
                let released = self.queue.dequeue(batch.id, true)?;
                let clean = batch.warnings.is_empty() && batch.errors.is_empty();
                if clean {
                    self.queue.delete_batch(batch.id)?;
                }
                info!(
                    batch_id = %batch.id,
                    kind = %batch.kind,
                    remote_state = %status.workflow_state,
                    released,
                    clean,
                    "import complete"
                );
                Ok(PollOutcome::Complete { clean })
            }
        }
    }

    async fn monitor_imports(&self) -> Result<MonitorReport, MonitorError> {
        let mut report = MonitorReport::default();
        for batch in self.queue.batches()? {
            if !matches!(batch.state, BatchState::Submitted | BatchState::Monitoring) {
                continue;
            }
            let (id, kind) = (batch.id, batch.kind);
            match self.poll(batch).await {
                Ok(outcome) => report.record(kind, outcome),
                Err(e) => {
                    error!(batch_id = %id, kind = %kind, "poll failed: {e}");
                    self.note_error(id, &e.to_string());
                    report.errored += 1;
                }
            }
        }
        info!(
            polled = report.polled(),
            skipped = report.skipped,
            completed = report.completed,
            failed = report.failed,
            errored = report.errored,
            "monitor pass complete"
        );
        Ok(report)
    }
}
