//! Artifacts as directories of CSV files.
//!
//! ```text
//! <root>/<batch-id>/users.csv
//! <root>/<batch-id>/enrollments.csv
//! ```
//!
//! Files are first written to `<root>/.<batch-id>.tmp/` and the directory is
//! renamed into place, so a reader never sees half an artifact.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use shared_types::BatchId;

use crate::domain::collector::RenderedFile;
use crate::error::BuildError;
use crate::ports::outbound::ArtifactStore;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryArtifactStore {
    root: PathBuf,
}

impl DirectoryArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, batch: BatchId) -> PathBuf {
        self.root.join(batch.to_string())
    }

    fn remove_dir(path: &Path) -> Result<(), BuildError> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path)(e)),
        }
    }
}

impl ArtifactStore for DirectoryArtifactStore {
    fn write(&self, batch: BatchId, files: &[RenderedFile]) -> Result<PathBuf, BuildError> {
        let staging = self.root.join(format!(".{batch}.tmp"));
        let target = self.path_for(batch);

        Self::remove_dir(&staging)?;
        std::fs::create_dir_all(&staging).map_err(io_error(&staging))?;
        for rendered in files {
            let path = staging.join(rendered.file.file_name());
            let mut file = std::fs::File::create(&path).map_err(io_error(&path))?;
            file.write_all(rendered.contents.as_bytes())
                .map_err(io_error(&path))?;
            file.sync_all().map_err(io_error(&path))?;
        }

        Self::remove_dir(&target)?;
        std::fs::rename(&staging, &target).map_err(io_error(&target))?;
        Ok(target)
    }

    fn remove(&self, batch: BatchId) -> Result<(), BuildError> {
        Self::remove_dir(&self.path_for(batch))
    }
}
