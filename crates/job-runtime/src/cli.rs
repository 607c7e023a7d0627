//! Command line for `rp-jobs`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rp_04_event_intake::EventFamily;
use shared_types::{EntityKind, Priority};

/// rp-jobs: scheduled provisioning jobs
#[derive(Parser, Debug)]
#[command(name = "rp-jobs")]
#[command(about = "Event intake, batch submission and import monitoring jobs")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "RP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write Prometheus counters here when the job ends
    #[arg(long, env = "RP_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drain one event family's queue, then check its event frequency
    GatherEvents {
        /// enrollment, instructor-add, instructor-drop, group or person
        family: EventFamily,
    },
    /// Claim, build and submit the next batch at or above a priority tier
    QueueByPriority {
        kind: EntityKind,
        /// default, high or immediate
        #[arg(default_value = "default")]
        tier: Priority,
    },
    /// Claim, build and submit rows modified since a timestamp
    QueueModifiedSince {
        kind: EntityKind,
        /// RFC 3339 timestamp
        since: DateTime<Utc>,
    },
    /// Poll every submitted import
    MonitorImports,
    /// Remove long-deleted enrollment rows
    PurgeEnrollments,
}

impl Command {
    /// Lock and telemetry name. Runs with different arguments lock
    /// independently.
    pub fn job_name(&self) -> String {
        match self {
            Command::GatherEvents { family } => format!("gather-events-{family}"),
            Command::QueueByPriority { kind, tier } => format!("queue-by-priority-{kind}-{tier}"),
            Command::QueueModifiedSince { kind, .. } => format!("queue-modified-since-{kind}"),
            Command::MonitorImports => "monitor-imports".to_string(),
            Command::PurgeEnrollments => "purge-enrollments".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("rp-jobs").chain(args.iter().copied()))
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = parse(&["gather-events", "instructor-add"]).unwrap();
        assert_eq!(
            cli.command,
            Command::GatherEvents {
                family: EventFamily::InstructorAdd
            }
        );
        assert_eq!(cli.command.job_name(), "gather-events-instructor-add");

        let cli = parse(&["--config", "/etc/rp.toml", "queue-by-priority", "user", "high"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/rp.toml")));
        assert_eq!(cli.command.job_name(), "queue-by-priority-user-high");

        let cli = parse(&["queue-by-priority", "enrollment"]).unwrap();
        assert_eq!(
            cli.command,
            Command::QueueByPriority {
                kind: EntityKind::Enrollment,
                tier: Priority::Default
            }
        );

        let cli = parse(&["queue-modified-since", "course", "2024-04-01T08:00:00Z"]).unwrap();
        assert_eq!(
            cli.command,
            Command::QueueModifiedSince {
                kind: EntityKind::Course,
                since: Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap()
            }
        );

        assert_eq!(parse(&["monitor-imports"]).unwrap().command.job_name(), "monitor-imports");
    }

    #[test]
    fn test_bad_arguments_are_rejected() {
        assert!(parse(&["gather-events", "payroll"]).is_err());
        assert!(parse(&["queue-by-priority", "widget"]).is_err());
        assert!(parse(&["queue-modified-since", "user", "yesterday"]).is_err());
        assert!(parse(&[]).is_err());
    }
}
