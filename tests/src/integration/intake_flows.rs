//! # Intake Flows
//!
//! Messages on a queue, through envelope checks and normalizers, into the
//! import queue and the frequency log.

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use job_runtime::config::QueueSettings;
    use job_runtime::{jobs, RunStatus};
    use rp_01_message_envelope::testing::raw;
    use rp_01_message_envelope::Body;
    use rp_03_import_queue::ImportQueueApi;
    use rp_04_event_intake::{EventFamily, EventIntakeApi, GatherOptions};
    use shared_crypto::AesKey;
    use shared_types::{EnrollmentRole, EnrollmentStatus, EntityKind, Priority, QueueableEntity};

    use crate::integration::harness::{registration_body, Pipeline, REGISTRATION_TYPE, REG_ID};

    fn enrollments(p: &Pipeline) -> Vec<(shared_types::Enrollment, Priority)> {
        p.intake
            .queue()
            .entries(EntityKind::Enrollment)
            .unwrap()
            .into_iter()
            .filter_map(|e| match e.entity {
                QueueableEntity::Enrollment(enrollment) => Some((enrollment, e.priority)),
                _ => None,
            })
            .collect()
    }

    async fn gather(p: &Pipeline, family: EventFamily) -> rp_04_event_intake::GatherReport {
        p.intake
            .gather(family, &p.messages, GatherOptions::default())
            .await
            .unwrap()
    }

    // =========================================================================
    // ENROLLMENT ADD
    // =========================================================================

    #[tokio::test]
    async fn test_enrollment_add_queues_one_active_student() {
        let p = Pipeline::new();
        p.messages.push(p.registration("A", REG_ID, "A"));

        let report = gather(&p, EventFamily::Enrollment).await;
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.events, 1);
        assert!(p.messages.is_empty());

        let rows = enrollments(&p);
        assert_eq!(rows.len(), 1);
        let (enrollment, priority) = &rows[0];
        assert_eq!(enrollment.course_id, "2024-spring-CSE-142-A");
        assert_eq!(enrollment.reg_id, REG_ID);
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert_eq!(enrollment.role, EnrollmentRole::Student);
        assert_eq!(*priority, Priority::Default);
    }

    #[tokio::test]
    async fn test_redelivered_enrollment_is_applied_once() {
        let p = Pipeline::new();
        let message = p.registration("A", REG_ID, "A");
        p.messages.push(message.clone());
        p.messages.push(message);

        let report = gather(&p, EventFamily::Enrollment).await;
        assert_eq!(report.acknowledged, 2);
        assert_eq!(enrollments(&p).len(), 1);
        assert_eq!(p.intake.queue().entries(EntityKind::Course).unwrap().len(), 1);
    }

    // =========================================================================
    // ENVELOPE CHECKS
    // =========================================================================

    #[tokio::test]
    async fn test_tampered_body_is_never_normalized() {
        let p = Pipeline::new();
        let mut envelope = p.fixture.standard(REGISTRATION_TYPE, "2", &registration_body("A", REG_ID, "A"));
        envelope.body = Body::Text(registration_body("D", REG_ID, "A"));
        p.messages.push(raw(&envelope));

        let report = gather(&p, EventFamily::Enrollment).await;
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.acknowledged, 0);
        assert_eq!(p.messages.len(), 1);
        assert!(enrollments(&p).is_empty());
    }

    #[tokio::test]
    async fn test_stale_current_key_is_refreshed_once() {
        let stale = AesKey::from_bytes([1; 16]);
        let p = Pipeline::with_keys(|keys, current| {
            keys.push_current(REGISTRATION_TYPE, "old", &stale);
            keys.push_current(REGISTRATION_TYPE, "new", current);
        });
        p.messages.push(p.registration("A", REG_ID, "A"));

        let report = gather(&p, EventFamily::Enrollment).await;
        assert_eq!(report.acknowledged, 1);
        assert_eq!(enrollments(&p).len(), 1);
        assert_eq!(p.intake.envelopes().keys().invalidations(), 1);
    }

    #[tokio::test]
    async fn test_current_key_still_stale_after_refresh_is_rejected() {
        let p = Pipeline::with_keys(|keys, _| {
            keys.push_current(REGISTRATION_TYPE, "old", &AesKey::from_bytes([1; 16]));
        });
        p.messages.push(p.registration("A", REG_ID, "A"));

        let report = gather(&p, EventFamily::Enrollment).await;
        assert_eq!(report.rejected.len(), 1);
        assert!(enrollments(&p).is_empty());
        assert_eq!(p.intake.envelopes().keys().invalidations(), 1);
    }

    // =========================================================================
    // INSTRUCTOR DROP
    // =========================================================================

    #[tokio::test]
    async fn test_instructor_drop_deletes_the_teacher() {
        let p = Pipeline::new();
        p.messages.push(p.instructor_drop(&["X"], &[]));

        let report = gather(&p, EventFamily::InstructorDrop).await;
        assert_eq!(report.events, 1);

        let rows = enrollments(&p);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.reg_id, "X");
        assert_eq!(rows[0].0.status, EnrollmentStatus::Deleted);
        assert_eq!(rows[0].0.role, EnrollmentRole::Teacher);
    }

    // =========================================================================
    // STALENESS
    // =========================================================================

    #[tokio::test]
    async fn test_silent_family_alerts_and_the_job_still_completes() {
        let p = Pipeline::new();
        let settings = QueueSettings {
            acceptable_silence_minutes: 360,
            ..QueueSettings::default()
        };
        p.messages.push(p.registration("A", REG_ID, "A"));
        let job = "gather-events-enrollment";

        let first = jobs::gather_events(job, EventFamily::Enrollment, &p.intake, p.intake.health(), &p.messages, &settings)
            .await
            .unwrap();
        assert_eq!(first, RunStatus::Completed);
        assert!(p.intake.health().sink().sent().is_empty());

        p.clock.advance(Duration::hours(7));
        let second = jobs::gather_events(job, EventFamily::Enrollment, &p.intake, p.intake.health(), &p.messages, &settings)
            .await
            .unwrap();
        assert_eq!(second, RunStatus::Completed);

        let sent = p.intake.health().sink().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, job);
        assert!(sent[0].1.to_string().contains("7 hours and 0 minutes"));
    }

    #[tokio::test]
    async fn test_rejections_fail_the_gather_job() {
        let p = Pipeline::new();
        p.messages.push("not an envelope".to_string());
        let status = jobs::gather_events(
            "gather-events-enrollment",
            EventFamily::Enrollment,
            &p.intake,
            p.intake.health(),
            &p.messages,
            &QueueSettings::default(),
        )
        .await
        .unwrap();
        assert_eq!(status, RunStatus::ProtocolRejected(1));
        assert!(status.is_failure());
    }
}
