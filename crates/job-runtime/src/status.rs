//! How a job run ended, and the exit code the scheduler sees.

use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Another run of the same job holds the lock.
    Skipped { holder: Option<u32> },
    /// Messages failed envelope checks and were left on the queue.
    ProtocolRejected(usize),
    /// Messages or batches hit an unexpected error (store, roster, LMS
    /// record) and were left for the next run.
    Failed(usize),
}

impl RunStatus {
    /// Overlapping runs and absorbed errors are not failures. Rejected
    /// messages and unexpected errors are.
    pub fn is_failure(self) -> bool {
        matches!(self, RunStatus::ProtocolRejected(n) | RunStatus::Failed(n) if n > 0)
    }

    pub fn exit_code(self) -> ExitCode {
        if self.is_failure() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_and_unexpected_errors_fail_the_run() {
        assert!(!RunStatus::Completed.is_failure());
        assert!(!RunStatus::Skipped { holder: Some(4242) }.is_failure());
        assert!(!RunStatus::ProtocolRejected(0).is_failure());
        assert!(RunStatus::ProtocolRejected(2).is_failure());
        assert!(RunStatus::Failed(1).is_failure());
        assert!(!RunStatus::Failed(0).is_failure());
    }
}
