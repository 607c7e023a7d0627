//! Queue storage in a locked JSON snapshot.
//!
//! Every transaction holds an exclusive `fs2` lock for its whole
//! read-mutate-write cycle, so claims from separate processes serialize.

use std::path::{Path, PathBuf};

use shared_types::SnapshotFile;

use crate::domain::state::QueueState;
use crate::error::QueueError;
use crate::ports::outbound::QueueStorage;

#[derive(Debug)]
pub struct FileQueueStorage {
    file: SnapshotFile<QueueState>,
}

impl FileQueueStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: SnapshotFile::new(path),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

impl QueueStorage for FileQueueStorage {
    fn transaction(&self, f: &mut dyn FnMut(&mut QueueState)) -> Result<(), QueueError> {
        self.file.transaction(|state| f(state))?;
        Ok(())
    }

    fn read(&self, f: &mut dyn FnMut(&QueueState)) -> Result<(), QueueError> {
        self.file.read(|state| f(state))?;
        Ok(())
    }
}
