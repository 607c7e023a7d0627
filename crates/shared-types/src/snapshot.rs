//! # JSON Snapshot Store
//!
//! A whole-document store: one JSON file holds the full state, and every
//! mutation runs as `lock -> read -> mutate -> write -> unlock`. The lock is
//! an `fs2` exclusive lock on a sibling `.lock` file, so two processes
//! mutating the same snapshot serialize instead of racing.
//!
//! Writes go to a temp file that is fsynced and renamed over the target.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::SnapshotError;

/// A JSON document on disk, mutated under an exclusive file lock.
#[derive(Debug)]
pub struct SnapshotFile<T> {
    path: PathBuf,
    lock_path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SnapshotFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let lock_path = path.with_extension("lock");
        Self {
            path,
            lock_path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the current document and persist the result.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, SnapshotError> {
        let _lock = self.lock()?;
        let mut state = self.read_unlocked()?;
        let out = f(&mut state);
        self.write_unlocked(&state)?;
        Ok(out)
    }

    /// Read-only access under the same lock.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, SnapshotError> {
        let state = {
            let _lock = self.lock()?;
            self.read_unlocked()?
        };
        Ok(f(&state))
    }

    fn lock(&self) -> Result<SnapshotLock<'_>, SnapshotError> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| SnapshotError::Io {
                path: self.lock_path.clone(),
                source,
            })?;
        FileExt::lock_exclusive(&file).map_err(|source| SnapshotError::Io {
            path: self.lock_path.clone(),
            source,
        })?;
        Ok(SnapshotLock {
            file,
            path: &self.lock_path,
        })
    }

    fn read_unlocked(&self) -> Result<T, SnapshotError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(T::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(source) => Err(SnapshotError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_unlocked(&self, state: &T) -> Result<(), SnapshotError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| SnapshotError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let temp_path = self.path.with_extension("tmp");
        let io_err = |source| SnapshotError::Io {
            path: temp_path.clone(),
            source,
        };
        let mut file = File::create(&temp_path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        std::fs::rename(&temp_path, &self.path).map_err(|source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

/// Held for the span of one read or transaction, error paths included.
struct SnapshotLock<'a> {
    file: File,
    path: &'a Path,
}

impl Drop for SnapshotLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), "cannot unlock snapshot: {e}");
        }
    }
}
