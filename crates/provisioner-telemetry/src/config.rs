//! Telemetry configuration from environment variables.

use std::env;

pub const DEFAULT_SERVICE_NAME: &str = "roster-provisioner";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name reported when logging starts
    pub service_name: String,

    /// `EnvFilter` directive (trace, debug, info, warn, error, or per-target)
    pub log_level: String,

    /// JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RUST_LOG` or `RP_LOG_LEVEL`: Log filter (default: info)
    /// - `RP_LOG_JSON`: `true` or `1` selects JSON output (default: false)
    /// - `RP_SERVICE_NAME`: Service name (default: roster-provisioner)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("RP_SERVICE_NAME")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.service_name),

            log_level: lookup("RUST_LOG")
                .or_else(|| lookup("RP_LOG_LEVEL"))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.log_level),

            json_logs: lookup("RP_LOG_JSON")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.json_logs),
        }
    }

    /// Service name for one job, e.g. `roster-provisioner-gather-events-enrollment`.
    pub fn for_job(mut self, job: &str) -> Self {
        self.service_name = format!("{}-{job}", self.service_name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TelemetryConfig::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_rust_log_wins_over_rp_log_level() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RP_LOG_LEVEL", "debug"),
            ("RUST_LOG", "warn,rp_04_event_intake=debug"),
        ]));
        assert_eq!(config.log_level, "warn,rp_04_event_intake=debug");

        let config = TelemetryConfig::from_lookup(lookup(&[("RP_LOG_LEVEL", "debug")]));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_json_and_service_name() {
        let config = TelemetryConfig::from_lookup(lookup(&[
            ("RP_LOG_JSON", "TRUE"),
            ("RP_SERVICE_NAME", "provisioner-prod"),
        ]));
        assert!(config.json_logs);
        assert_eq!(config.for_job("monitor-imports").service_name, "provisioner-prod-monitor-imports");
    }
}
