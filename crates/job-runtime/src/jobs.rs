//! # Scheduled Jobs
//!
//! One function per `rp-jobs` subcommand. Each takes the subsystem ports it
//! drives, so the binary passes the file and HTTP backed stacks and tests
//! pass in-memory ones. Locking happens in the caller.
//!
//! | Job | Drives | Counters |
//! |-----|--------|----------|
//! | `gather_events` | intake, then the family health check | `rp_event_count`, `rp_messages_rejected` |
//! | `queue_by_priority` | claim, build, submit | `rp_batches_total` |
//! | `queue_modified_since` | claim, build, submit | `rp_batches_total` |
//! | `monitor_imports` | poll every in-flight batch | `rp_batches_total` |
//! | `purge_enrollments` | retention sweep | |

use chrono::{DateTime, Utc};
use provisioner_telemetry::metrics;
use rp_02_event_health::{EventHealthApi, HealthStatus};
use rp_03_import_queue::{ImportQueueApi, QueueError, ENROLLMENT_RETENTION_DAYS};
use rp_04_event_intake::{EventFamily, EventIntakeApi, MessageQueue};
use rp_06_import_monitor::{ImportMonitorApi, PollOutcome};
use shared_types::{EntityKind, ImportBatch, Priority};
use tracing::{info, warn};

use crate::config::QueueSettings;
use crate::status::RunStatus;

/// Drain one family's queue, then check how long it has been quiet.
pub async fn gather_events<I, H>(
    job: &str,
    family: EventFamily,
    intake: &I,
    health: &H,
    queue: &dyn MessageQueue,
    settings: &QueueSettings,
) -> anyhow::Result<RunStatus>
where
    I: EventIntakeApi,
    H: EventHealthApi,
{
    let report = intake.gather(family, queue, settings.gather_options()).await?;
    let source = family.log_source();
    metrics::record_events(source, usize::try_from(report.events).unwrap_or(usize::MAX));
    metrics::record_rejected(source, report.rejected.len());
    if !report.failed.is_empty() {
        warn!(family = %family, failed = report.failed.len(), "messages left for redelivery");
    }

    match health
        .check_health(job, source, settings.acceptable_silence_minutes)
        .await?
    {
        HealthStatus::Healthy => {}
        HealthStatus::Alerted(alert) | HealthStatus::Suppressed(alert) => {
            warn!(job, family = %family, "{alert}");
        }
    }

    Ok(match (report.rejected.len(), report.failed.len()) {
        (0, 0) => RunStatus::Completed,
        (0, n) => RunStatus::Failed(n),
        (n, _) => RunStatus::ProtocolRejected(n),
    })
}

/// Claim the next batch at `tier` or above, then build and submit it.
pub async fn queue_by_priority<Q, M>(
    queue: &Q,
    monitor: &M,
    kind: EntityKind,
    tier: Priority,
) -> anyhow::Result<RunStatus>
where
    Q: ImportQueueApi,
    M: ImportMonitorApi,
{
    submit_claim(monitor, kind, queue.queue_by_priority(kind, tier)).await
}

/// Claim rows of `kind` changed since `since`, then build and submit them.
pub async fn queue_modified_since<Q, M>(
    queue: &Q,
    monitor: &M,
    kind: EntityKind,
    since: DateTime<Utc>,
) -> anyhow::Result<RunStatus>
where
    Q: ImportQueueApi,
    M: ImportMonitorApi,
{
    submit_claim(monitor, kind, queue.queue_by_modified_since(kind, since)).await
}

async fn submit_claim<M: ImportMonitorApi>(
    monitor: &M,
    kind: EntityKind,
    claim: Result<ImportBatch, QueueError>,
) -> anyhow::Result<RunStatus> {
    let batch = match claim {
        Ok(batch) => batch,
        Err(e) if e.is_empty() => {
            info!(kind = %kind, "nothing queued");
            return Ok(RunStatus::Completed);
        }
        Err(e) => return Err(e.into()),
    };
    let batch_id = batch.id;
    let outcome = monitor.submit(batch).await?;
    metrics::record_batch(kind.as_str(), outcome.label());
    info!(batch_id = %batch_id, kind = %kind, outcome = outcome.label(), "batch handled");
    Ok(RunStatus::Completed)
}

pub async fn monitor_imports<M: ImportMonitorApi>(monitor: &M) -> anyhow::Result<RunStatus> {
    let report = monitor.monitor_imports().await?;
    for (kind, outcome) in &report.outcomes {
        if *outcome != PollOutcome::Skipped {
            metrics::record_batch(kind.as_str(), outcome.label());
        }
    }
    info!(
        polled = report.polled(),
        skipped = report.skipped,
        completed = report.completed,
        failed = report.failed,
        errored = report.errored,
        "imports monitored"
    );
    Ok(match report.errored {
        0 => RunStatus::Completed,
        n => RunStatus::Failed(n),
    })
}

pub fn purge_enrollments<Q: ImportQueueApi>(queue: &Q) -> anyhow::Result<RunStatus> {
    let purged = queue.purge_expired(ENROLLMENT_RETENTION_DAYS)?;
    info!(purged, retention_days = ENROLLMENT_RETENTION_DAYS, "enrollments purged");
    Ok(RunStatus::Completed)
}
