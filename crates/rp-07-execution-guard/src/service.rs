//! # Execution Guard
//!
//! Two files per job under the lock directory:
//!
//! - `<job>.lock` is never removed. Its `fs2` exclusive lock is the mutex,
//!   and the kernel drops it when the owning process dies.
//! - `<job>.pid` holds the owner's PID. It is read and written only while
//!   the lock is held, and removed when the [`JobLock`] drops.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::adapters::proc::OsProcessProbe;
use crate::error::{pidfile_error, GuardError};
use crate::ports::outbound::ProcessProbe;

/// Result of trying to start a job.
#[must_use]
#[derive(Debug)]
pub enum Acquisition {
    Acquired(JobLock),
    /// Another live run holds the lock. The caller skips this run.
    Busy { pid: Option<u32> },
}

impl Acquisition {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Acquisition::Acquired(_))
    }
}

/// A held job lock. Dropping it removes the pidfile, then releases the lock.
#[derive(Debug)]
pub struct JobLock {
    lock: File,
    path: PathBuf,
    pid: u32,
}

impl JobLock {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// The pidfile.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for JobLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to remove pidfile: {e}");
            }
        }
        if let Err(e) = FileExt::unlock(&self.lock) {
            warn!(path = %self.path.display(), "failed to release job lock: {e}");
        }
        debug!(path = %self.path.display(), "job lock released");
    }
}

pub struct ExecutionGuard<P: ProcessProbe = OsProcessProbe> {
    lock_dir: PathBuf,
    probe: P,
}

impl ExecutionGuard<OsProcessProbe> {
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self::with_probe(lock_dir, OsProcessProbe)
    }
}

impl<P: ProcessProbe> ExecutionGuard<P> {
    pub fn with_probe(lock_dir: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            probe,
        }
    }

    pub fn pidfile(&self, job: &str) -> PathBuf {
        self.lock_dir.join(format!("{job}.pid"))
    }

    pub fn lockfile(&self, job: &str) -> PathBuf {
        self.lock_dir.join(format!("{job}.lock"))
    }

    /// Try to take the lock for `job` without waiting.
    ///
    /// A held lock, or a pidfile naming a live process, reports `Busy`. A
    /// pidfile left by a dead owner is overwritten.
    pub fn acquire(&self, job: &str) -> Result<Acquisition, GuardError> {
        if job.is_empty() || job.contains(['/', '\\']) || job.starts_with('.') {
            return Err(GuardError::InvalidJobName(job.to_string()));
        }
        fs::create_dir_all(&self.lock_dir).map_err(|source| GuardError::LockDir {
            path: self.lock_dir.clone(),
            source,
        })?;

        let lock_path = self.lockfile(job);
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(pidfile_error(&lock_path))?;
        let path = self.pidfile(job);
        if FileExt::try_lock_exclusive(&lock).is_err() {
            let holder = read_pid(&path);
            info!(job, pid = ?holder, "job already running, skipping");
            return Ok(Acquisition::Busy { pid: holder });
        }

        let pid = std::process::id();
        if let Some(holder) = read_pid(&path) {
            if holder != pid && self.probe.is_alive(holder) {
                info!(job, pid = holder, "pidfile names a live process, skipping");
                if let Err(e) = FileExt::unlock(&lock) {
                    warn!(job, "failed to release job lock: {e}");
                }
                return Ok(Acquisition::Busy { pid: Some(holder) });
            }
            warn!(job, pid = holder, "replacing stale pidfile");
        }

        // Unlocks through drop on error.
        let claimed = JobLock { lock, path, pid };
        fs::write(&claimed.path, format!("{pid}\n")).map_err(pidfile_error(&claimed.path))?;
        info!(job, pid, "job lock acquired");
        Ok(Acquisition::Acquired(claimed))
    }

    /// PID recorded for `job`, if its pidfile exists and is readable.
    pub fn holder(&self, job: &str) -> Option<u32> {
        read_pid(&self.pidfile(job))
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Only the listed PIDs are alive.
    struct LivePids(HashSet<u32>);

    impl ProcessProbe for LivePids {
        fn is_alive(&self, pid: u32) -> bool {
            self.0.contains(&pid)
        }
    }

    fn guard(dir: &Path) -> ExecutionGuard<LivePids> {
        ExecutionGuard::with_probe(dir, LivePids(HashSet::from([std::process::id()])))
    }

    #[test]
    fn test_second_run_is_busy_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        let first = guard.acquire("gather-enrollment").unwrap();
        assert!(first.is_acquired());
        assert_eq!(guard.holder("gather-enrollment"), Some(std::process::id()));

        match guard.acquire("gather-enrollment").unwrap() {
            Acquisition::Busy { pid } => assert_eq!(pid, Some(std::process::id())),
            Acquisition::Acquired(_) => panic!("lock acquired twice"),
        }

        drop(first);
        assert!(!guard.pidfile("gather-enrollment").exists());
        assert!(guard.lockfile("gather-enrollment").exists());
        assert!(guard.acquire("gather-enrollment").unwrap().is_acquired());
    }

    #[test]
    fn test_starter_without_a_pid_yet_keeps_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        // Another starter has locked but not written its PID.
        let other = File::create(guard.lockfile("monitor-imports")).unwrap();
        FileExt::try_lock_exclusive(&other).unwrap();
        fs::write(guard.pidfile("monitor-imports"), "").unwrap();

        assert!(matches!(
            guard.acquire("monitor-imports").unwrap(),
            Acquisition::Busy { pid: None }
        ));
        assert!(guard.pidfile("monitor-imports").exists());

        FileExt::unlock(&other).unwrap();
        drop(other);
        assert!(guard.acquire("monitor-imports").unwrap().is_acquired());
    }

    #[test]
    fn test_releasing_one_run_leaves_the_next_runs_pidfile() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        let first = guard.acquire("gather-group").unwrap();
        assert!(!guard.acquire("gather-group").unwrap().is_acquired());
        drop(first);

        let second = guard.acquire("gather-group").unwrap();
        assert!(second.is_acquired());
        assert_eq!(guard.holder("gather-group"), Some(std::process::id()));
        assert!(!guard.acquire("gather-group").unwrap().is_acquired());
    }

    #[test]
    fn test_jobs_lock_independently() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        let _a = guard.acquire("gather-enrollment").unwrap();
        assert!(guard.acquire("gather-person").unwrap().is_acquired());
    }

    #[test]
    fn test_stale_pidfile_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        fs::write(guard.pidfile("monitor-imports"), "424242\n").unwrap();

        match guard.acquire("monitor-imports").unwrap() {
            Acquisition::Acquired(lock) => assert_eq!(lock.pid(), std::process::id()),
            Acquisition::Busy { .. } => panic!("stale pidfile not reclaimed"),
        }
    }

    #[test]
    fn test_live_unlocked_pidfile_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let live = LivePids(HashSet::from([4242]));
        let guard = ExecutionGuard::with_probe(dir.path(), live);
        fs::write(guard.pidfile("monitor-imports"), "4242\n").unwrap();

        assert!(matches!(
            guard.acquire("monitor-imports").unwrap(),
            Acquisition::Busy { pid: Some(4242) }
        ));
        assert!(guard.pidfile("monitor-imports").exists());
    }

    #[test]
    fn test_garbage_pidfile_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        fs::write(guard.pidfile("purge-enrollments"), "not a pid").unwrap();
        assert!(guard.acquire("purge-enrollments").unwrap().is_acquired());
    }

    #[test]
    fn test_job_names_cannot_escape_the_lock_dir() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        for name in ["", "../etc/passwd", "a/b", ".hidden"] {
            assert!(matches!(guard.acquire(name), Err(GuardError::InvalidJobName(_))));
        }
    }

    #[test]
    fn test_lock_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("run").join("locks");
        let guard = guard(&nested);
        let lock = guard.acquire("gather-group").unwrap();
        assert!(lock.is_acquired());
        assert!(nested.join("gather-group.pid").exists());
    }
}
