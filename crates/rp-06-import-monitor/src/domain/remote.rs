//! Remote import states.
//!
//! | Remote state                                         | Result     |
//! |------------------------------------------------------|------------|
//! | `imported`, `imported_with_messages`, `partially_restored` at 100% | complete |
//! | `failed`, `failed_with_messages`, `aborted`          | failed     |
//! | anything else                                        | monitoring |

/// Warnings carrying this code are expected noise and dropped.
pub const IGNORED_WARNING_CODE: &str = "-MSIS-550-";

/// What the LMS reports for one submitted import.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteStatus {
    pub workflow_state: String,
    pub progress: u8,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// The LMS acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImport {
    pub id: String,
    pub workflow_state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Complete,
    Failed,
    Pending,
}

impl RemoteStatus {
    pub fn outcome(&self) -> RemoteOutcome {
        match self.workflow_state.as_str() {
            "imported" | "imported_with_messages" | "partially_restored" if self.progress >= 100 => {
                RemoteOutcome::Complete
            }
            "failed" | "failed_with_messages" | "aborted" => RemoteOutcome::Failed,
            _ => RemoteOutcome::Pending,
        }
    }

    pub fn relevant_warnings(&self) -> Vec<String> {
        self.warnings
            .iter()
            .filter(|w| !w.contains(IGNORED_WARNING_CODE))
            .cloned()
            .collect()
    }
}
