//! `rp-jobs`: one scheduled provisioning job per invocation.

use std::process::ExitCode;

use clap::Parser;
use job_runtime::{run, write_metrics, Cli};
use provisioner_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let job = cli.command.job_name();

    if let Err(e) = init_telemetry(&TelemetryConfig::from_env().for_job(&job)) {
        eprintln!("rp-jobs: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(&cli).await;

    if let Some(path) = &cli.metrics_file {
        if let Err(e) = write_metrics(path) {
            warn!(job = %job, "{e:#}");
        }
    }

    match result {
        Ok(status) => status.exit_code(),
        Err(e) => {
            error!(job = %job, "job failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
