//! Results of the submit and monitor entry points.

use std::fmt;

use shared_types::EntityKind;

/// What happened to a freshly claimed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { remote_id: String },
    /// Nothing changed since the last export. The batch was released and
    /// deleted.
    NothingToSend,
    /// The build failed. The batch is kept for inspection and not submitted.
    BuildFailed(String),
    /// The LMS refused the submission. The batch is failed.
    Rejected { status: u16, message: String },
}

impl SubmitOutcome {
    /// Label for the batches counter.
    pub fn label(&self) -> &'static str {
        match self {
            SubmitOutcome::Submitted { .. } => "submitted",
            SubmitOutcome::NothingToSend => "empty",
            SubmitOutcome::BuildFailed(_) => "build_failed",
            SubmitOutcome::Rejected { .. } => "rejected",
        }
    }
}

/// What one monitoring pass did with one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Polled too recently.
    Skipped,
    /// Still processing remotely, or the status fetch failed.
    Pending,
    Complete { clean: bool },
    Failed,
}

impl PollOutcome {
    pub fn label(self) -> &'static str {
        match self {
            PollOutcome::Skipped => "skipped",
            PollOutcome::Pending => "pending",
            PollOutcome::Complete { clean: true } => "complete",
            PollOutcome::Complete { clean: false } => "complete_with_messages",
            PollOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub skipped: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    /// Batches whose poll raised an error. The error is kept on the batch
    /// and the pass moves on.
    pub errored: usize,
    /// Every polled batch's kind and outcome, in poll order.
    pub outcomes: Vec<(EntityKind, PollOutcome)>,
}

impl MonitorReport {
    pub fn record(&mut self, kind: EntityKind, outcome: PollOutcome) {
        self.outcomes.push((kind, outcome));
        match outcome {
            PollOutcome::Skipped => self.skipped += 1,
            PollOutcome::Pending => self.pending += 1,
            PollOutcome::Complete { .. } => self.completed += 1,
            PollOutcome::Failed => self.failed += 1,
        }
    }

    pub fn polled(&self) -> usize {
        self.pending + self.completed + self.failed
    }
}
