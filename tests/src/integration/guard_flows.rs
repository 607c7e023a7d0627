//! # Guard Flows
//!
//! Job locking as the runner applies it: an overlapping run leaves no trace,
//! and a released or orphaned lock lets the next run start.

#[cfg(test)]
mod tests {
    use std::path::Path;

    use job_runtime::{run_with, Command, RunStatus, RuntimeConfig, ServiceContainer};
    use rp_03_import_queue::ImportQueueApi;
    use rp_07_execution_guard::Acquisition;
    use shared_types::{EntityKind, Priority, QueueableEntity, User};

    fn container(dir: &Path) -> ServiceContainer {
        let mut config = RuntimeConfig::default();
        config.apply_env(|name| (name == "RP_DATA_DIR").then(|| dir.display().to_string()));
        ServiceContainer::new(config)
    }

    fn queue_user(container: &ServiceContainer) {
        let user = User {
            reg_id: "9136CCB8F66711D5BE060004AC494FFE".into(),
            net_id: "javerage".into(),
        };
        container
            .import_queue()
            .upsert(QueueableEntity::User(user), Priority::Default)
            .unwrap();
    }

    #[tokio::test]
    async fn test_overlapping_run_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let first = container(dir.path());
        queue_user(&first);
        let command = Command::QueueByPriority {
            kind: EntityKind::User,
            tier: Priority::Default,
        };

        let Acquisition::Acquired(lock) = first.guard().acquire(&command.job_name()).unwrap() else {
            panic!("first run should take the lock");
        };

        let second = container(dir.path());
        let status = run_with(second, &command).await.unwrap();
        assert_eq!(
            status,
            RunStatus::Skipped {
                holder: Some(lock.pid())
            }
        );

        let queue = first.import_queue();
        assert!(queue.batches().unwrap().is_empty());
        assert!(queue
            .entries(EntityKind::User)
            .unwrap()
            .iter()
            .all(|e| e.claim.is_none()));
    }

    #[tokio::test]
    async fn test_released_lock_lets_the_next_run_start() {
        let dir = tempfile::tempdir().unwrap();
        let first = container(dir.path());
        let lock = first.guard().acquire("purge-enrollments").unwrap();
        assert!(lock.is_acquired());
        drop(lock);

        let status = run_with(container(dir.path()), &Command::PurgeEnrollments)
            .await
            .unwrap();
        assert_eq!(status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_orphaned_pidfile_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let locks = dir.path().join("locks");
        std::fs::create_dir_all(&locks).unwrap();
        // Above any pid_max, so no such process.
        std::fs::write(locks.join("purge-enrollments.pid"), "999999999\n").unwrap();

        let status = run_with(container(dir.path()), &Command::PurgeEnrollments)
            .await
            .unwrap();
        assert_eq!(status, RunStatus::Completed);
        assert!(!locks.join("purge-enrollments.pid").exists());
    }
}
