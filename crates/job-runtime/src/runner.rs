//! Runs one parsed command under its job lock.

use std::path::Path;

use anyhow::Context;
use provisioner_telemetry::gather_metrics;
use rp_07_execution_guard::Acquisition;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::config::RuntimeConfig;
use crate::container::ServiceContainer;
use crate::jobs;
use crate::status::RunStatus;

/// Load configuration, take the job lock and run the job. The lock is
/// released when this returns, on success or error.
pub async fn run(cli: &Cli) -> anyhow::Result<RunStatus> {
    let config = RuntimeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    run_with(ServiceContainer::new(config), &cli.command).await
}

pub async fn run_with(container: ServiceContainer, command: &Command) -> anyhow::Result<RunStatus> {
    let job = command.job_name();
    let _lock = match container.guard().acquire(&job)? {
        Acquisition::Acquired(lock) => lock,
        Acquisition::Busy { pid } => {
            info!(job = %job, holder = ?pid, "previous run still active, skipping");
            return Ok(RunStatus::Skipped { holder: pid });
        }
    };
    info!(job = %job, "job started");

    let status = match command {
        Command::GatherEvents { family } => {
            let intake = container.event_intake(*family)?;
            let queue = container.message_queue(*family);
            let settings = container.config().queues.for_family(*family);
            jobs::gather_events(&job, *family, &intake, intake.health(), &queue, settings).await?
        }
        Command::QueueByPriority { kind, tier } => {
            let monitor = container.import_monitor()?;
            jobs::queue_by_priority(monitor.queue(), &monitor, *kind, *tier).await?
        }
        Command::QueueModifiedSince { kind, since } => {
            let monitor = container.import_monitor()?;
            jobs::queue_modified_since(monitor.queue(), &monitor, *kind, *since).await?
        }
        Command::MonitorImports => jobs::monitor_imports(&container.import_monitor()?).await?,
        Command::PurgeEnrollments => jobs::purge_enrollments(&container.import_queue())?,
    };
    info!(job = %job, status = ?status, "job finished");
    Ok(status)
}

/// Render the counters in the Prometheus text format to `path`, for a
/// node exporter textfile collector.
pub fn write_metrics(path: &Path) -> anyhow::Result<()> {
    let text = gather_metrics()?;
    std::fs::write(path, text).with_context(|| format!("writing metrics to {}", path.display()))
}
