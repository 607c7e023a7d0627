//! Error types for the execution guard.

use std::io;
use std::path::PathBuf;

/// Failures that stop a job from deciding whether it may run. A lock held
/// by another live run is not an error; see `Acquisition::Busy`.
#[derive(Debug)]
pub enum GuardError {
    /// Job names become file names and must not contain path separators.
    InvalidJobName(String),
    /// The lock directory could not be created.
    LockDir { path: PathBuf, source: io::Error },
    /// The pidfile could not be created, written or removed.
    Pidfile { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for GuardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardError::InvalidJobName(name) => write!(f, "Invalid job name: {name:?}"),
            GuardError::LockDir { path, source } => {
                write!(f, "Failed to create lock directory {}: {}", path.display(), source)
            }
            GuardError::Pidfile { path, source } => {
                write!(f, "Pidfile error at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for GuardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GuardError::InvalidJobName(_) => None,
            GuardError::LockDir { source, .. } | GuardError::Pidfile { source, .. } => Some(source),
        }
    }
}

pub(crate) fn pidfile_error(path: &std::path::Path) -> impl FnOnce(io::Error) -> GuardError + '_ {
    move |source| GuardError::Pidfile {
        path: path.to_path_buf(),
        source,
    }
}
