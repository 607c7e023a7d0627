//! # Provisioning Flows
//!
//! Queued rows through claim, artifact build, submission and monitoring,
//! with the queue, ledger and artifacts on disk.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use job_runtime::{jobs, RunStatus};
    use chrono::{TimeZone, Utc};
    use rp_03_import_queue::{
        course_for, FileQueueStorage, ImportLimits, ImportQueue, ImportQueueApi, TierLimits,
    };
    use rp_04_event_intake::{EventFamily, EventIntakeApi, GatherOptions};
    use rp_05_batch_builder::BatchBuilderApi;
    use rp_06_import_monitor::{ImportMonitorApi, RemoteStatus};
    use shared_types::{
        BatchState, Enrollment, EnrollmentRole, EnrollmentStatus, EntityKind, ImportBatch, Priority,
        QueueableEntity, TimeSource, User,
    };

    use crate::integration::harness::Pipeline;

    const STUDENTS: [&str; 3] = [
        "0000000000000000000000000000000C",
        "0000000000000000000000000000000A",
        "0000000000000000000000000000000B",
    ];

    fn user(i: usize) -> QueueableEntity {
        QueueableEntity::User(User {
            reg_id: format!("{i:032X}"),
            net_id: format!("user{i}"),
        })
    }

    async fn gather_students(p: &Pipeline) {
        for reg_id in STUDENTS {
            p.messages.push(p.registration("A", reg_id, "A"));
        }
        let report = p
            .intake
            .gather(EventFamily::Enrollment, &p.messages, GatherOptions::default())
            .await
            .unwrap();
        assert_eq!(report.acknowledged, STUDENTS.len());
    }

    // =========================================================================
    // PRIORITY ORDERING
    // =========================================================================

    #[test]
    fn test_urgent_claim_takes_urgent_rows_first_up_to_the_limit() {
        let p = Pipeline::new();
        let limits = ImportLimits {
            user: TierLimits::new(10, 2),
            ..ImportLimits::default()
        };
        let queue = ImportQueue::new(
            FileQueueStorage::open(p.dir.path().join("import-queue.json")),
            p.clock.clone(),
            limits,
        );
        for i in 0..3 {
            queue.upsert(user(i), Priority::Default).unwrap();
        }
        for i in 3..6 {
            queue.upsert(user(i), Priority::Immediate).unwrap();
        }

        let urgent = queue.queue_by_priority(EntityKind::User, Priority::Immediate).unwrap();
        let claimed = queue.claimed(urgent.id).unwrap();
        assert_eq!(claimed.len(), 2);
        assert!(claimed.iter().all(|e| e.priority == Priority::Immediate));

        let rest = queue.queue_by_priority(EntityKind::User, Priority::Default).unwrap();
        let claimed = queue.claimed(rest.id).unwrap();
        assert_eq!(claimed.len(), 4);
        assert_eq!(
            claimed.iter().filter(|e| e.priority == Priority::Immediate).count(),
            1
        );

        assert!(queue
            .queue_by_priority(EntityKind::User, Priority::Default)
            .unwrap_err()
            .is_empty());
    }

    // =========================================================================
    // DETERMINISTIC BUILD
    // =========================================================================

    #[tokio::test]
    async fn test_same_claim_builds_byte_identical_files() {
        let p = Pipeline::new();
        gather_students(&p).await;
        let mut entities: Vec<QueueableEntity> = p
            .monitor
            .queue()
            .entries(EntityKind::Enrollment)
            .unwrap()
            .into_iter()
            .map(|e| e.entity)
            .collect();
        let ledger = BTreeMap::new();

        let first = ImportBatch::new(EntityKind::Enrollment, Priority::Default, p.clock.now());
        let a = p.monitor.builder().build(&first, &entities, &ledger).await.unwrap();
        entities.reverse();
        let second = ImportBatch::new(EntityKind::Enrollment, Priority::Default, p.clock.now());
        let b = p.monitor.builder().build(&second, &entities, &ledger).await.unwrap();

        assert_ne!(a.path, b.path);
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.files, b.files);
        for name in &a.files {
            assert_eq!(
                std::fs::read(a.path.join(name)).unwrap(),
                std::fs::read(b.path.join(name)).unwrap()
            );
        }
    }

    #[tokio::test]
    async fn test_independent_study_enrollment_targets_an_exported_section() {
        let p = Pipeline::new();
        let instructor = "FEDCBA9876543210FEDCBA9876543210";
        let enrollment = Enrollment {
            course_id: "2024-spring-CSE-499-A".into(),
            reg_id: STUDENTS[0].into(),
            role: EnrollmentRole::Student,
            status: EnrollmentStatus::Active,
            last_modified: Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap(),
            request_date: None,
            primary_course_id: None,
            instructor_reg_id: Some(instructor.into()),
            duplicate_code: None,
            standby: false,
        };
        let course = QueueableEntity::Course(course_for(&enrollment));
        let ledger = BTreeMap::new();
        let builder = p.monitor.builder();

        let courses = ImportBatch::new(EntityKind::Course, Priority::High, p.clock.now());
        let course_artifact = builder.build(&courses, &[course], &ledger).await.unwrap();
        let enrollments = ImportBatch::new(EntityKind::Enrollment, Priority::Default, p.clock.now());
        let enrollment_artifact = builder
            .build(&enrollments, &[QueueableEntity::Enrollment(enrollment)], &ledger)
            .await
            .unwrap();

        let courses_csv = std::fs::read_to_string(course_artifact.path.join("courses.csv")).unwrap();
        assert!(courses_csv.contains(",CSE 499 A,CSE 499 A Spring 2024,course:cse,"));
        let sections = std::fs::read_to_string(course_artifact.path.join("sections.csv")).unwrap();
        let section_ids: Vec<&str> = sections
            .lines()
            .skip(1)
            .filter_map(|l| l.split(',').next())
            .collect();
        let enrolled = std::fs::read_to_string(enrollment_artifact.path.join("enrollments.csv")).unwrap();
        let target = enrolled.lines().nth(1).unwrap().split(',').nth(5).unwrap();
        assert_eq!(target, format!("2024-spring-CSE-499-A-{instructor}--"));
        assert!(section_ids.contains(&target));
    }

    // =========================================================================
    // END TO END
    // =========================================================================

    #[tokio::test]
    async fn test_registrations_reach_the_lms_and_complete() {
        let p = Pipeline::new();
        gather_students(&p).await;
        let queue = p.monitor.queue();

        let status = jobs::queue_by_priority(queue, &p.monitor, EntityKind::Enrollment, Priority::Default)
            .await
            .unwrap();
        assert_eq!(status, RunStatus::Completed);

        let batches = queue.batches().unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.state, BatchState::Submitted);
        let artifact = batch.artifact.clone().unwrap();
        assert_eq!(artifact.row_count, 3);

        let submissions = p.monitor.lms().submissions();
        assert_eq!(submissions, vec![(artifact.path.clone(), false)]);
        let csv = std::fs::read_to_string(artifact.path.join("enrollments.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(STUDENTS[1]));
        assert!(lines[2].contains(STUDENTS[0]));

        p.monitor.lms().set_status(
            batch.remote_id.as_deref().unwrap(),
            Ok(RemoteStatus {
                workflow_state: "imported".into(),
                progress: 100,
                ..RemoteStatus::default()
            }),
        );
        jobs::monitor_imports(&p.monitor).await.unwrap();

        assert!(queue.batches().unwrap().is_empty());
        let rows = queue.entries(EntityKind::Enrollment).unwrap();
        assert!(rows.iter().all(|e| e.claim.is_none() && e.provisioned_at.is_some()));
        assert_eq!(queue.ledger().unwrap().len(), 3);

        // The intake side sees the same store.
        assert_eq!(p.intake.queue().ledger().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unchanged_rows_are_not_resubmitted() {
        let p = Pipeline::new();
        gather_students(&p).await;
        let queue = p.monitor.queue();

        jobs::queue_by_priority(queue, &p.monitor, EntityKind::Enrollment, Priority::Default)
            .await
            .unwrap();
        let batch = queue.batches().unwrap().remove(0);
        p.monitor.lms().set_status(
            batch.remote_id.as_deref().unwrap(),
            Ok(RemoteStatus {
                workflow_state: "imported".into(),
                progress: 100,
                ..RemoteStatus::default()
            }),
        );
        p.monitor.poll(batch).await.unwrap();

        for entry in queue.entries(EntityKind::Enrollment).unwrap() {
            queue.upsert(entry.entity, Priority::Default).unwrap();
        }
        jobs::queue_by_priority(queue, &p.monitor, EntityKind::Enrollment, Priority::Default)
            .await
            .unwrap();

        assert_eq!(p.monitor.lms().submissions().len(), 1);
        assert!(queue.batches().unwrap().is_empty());
        assert!(queue
            .entries(EntityKind::Enrollment)
            .unwrap()
            .iter()
            .all(|e| e.claim.is_none()));
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_rows_claimed() {
        let p = Pipeline::new();
        gather_students(&p).await;
        let queue = p.monitor.queue();

        jobs::queue_by_priority(queue, &p.monitor, EntityKind::Enrollment, Priority::Default)
            .await
            .unwrap();
        let batch = queue.batches().unwrap().remove(0);
        p.monitor.lms().set_status(
            batch.remote_id.as_deref().unwrap(),
            Ok(RemoteStatus {
                workflow_state: "failed_with_messages".into(),
                progress: 100,
                errors: vec!["enrollments.csv: unknown section".into()],
                ..RemoteStatus::default()
            }),
        );
        jobs::monitor_imports(&p.monitor).await.unwrap();

        let failed = queue.batch(batch.id).unwrap();
        assert_eq!(failed.state, BatchState::Failed);
        assert_eq!(failed.errors, vec!["enrollments.csv: unknown section"]);
        assert_eq!(queue.claimed(batch.id).unwrap().len(), 3);
    }
}
