//! Health state in a JSON snapshot file.

use std::path::Path;

use shared_types::SnapshotFile;

use crate::domain::health::HealthState;
use crate::error::HealthError;
use crate::ports::outbound::HealthStore;

#[derive(Debug)]
pub struct FileHealthStore {
    file: SnapshotFile<HealthState>,
}

impl FileHealthStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: SnapshotFile::new(path),
        }
    }

    pub fn snapshot(&self) -> Result<HealthState, HealthError> {
        Ok(self.file.read(|state| state.clone())?)
    }
}

impl HealthStore for FileHealthStore {
    fn transaction(&self, f: &mut dyn FnMut(&mut HealthState)) -> Result<(), HealthError> {
        self.file.transaction(|state| f(state))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event_health.json");

        FileHealthStore::open(&path)
            .transaction(&mut |state| {
                state.logs.entry("group".into()).or_default().record(10, 2, 7);
            })
            .unwrap();

        let state = FileHealthStore::open(&path).snapshot().unwrap();
        assert_eq!(state.logs["group"].count_at(10), 2);
    }
}
