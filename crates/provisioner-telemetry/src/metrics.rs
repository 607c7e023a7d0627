//! Prometheus counters for the provisioning jobs.
//!
//! All metrics follow the naming convention: `rp_<metric>`
//!
//! | Metric | Labels | Meaning |
//! |--------|--------|---------|
//! | `rp_event_count` | `source` | events applied, per family |
//! | `rp_messages_rejected` | `source` | messages left for redelivery |
//! | `rp_batches_total` | `kind`, `outcome` | import batch results |

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Events applied per family, counted alongside the frequency log
    pub static ref EVENT_COUNT: IntCounterVec = IntCounterVec::new(
        Opts::new("rp_event_count", "Events applied per source family"),
        &["source"]
    ).expect("static metric definition");

    /// Messages that failed envelope processing
    pub static ref MESSAGES_REJECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("rp_messages_rejected", "Messages rejected and left for redelivery"),
        &["source"]
    ).expect("static metric definition");

    /// Batch results: submitted, empty, build_failed, rejected, complete, failed ...
    pub static ref BATCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("rp_batches_total", "Import batch outcomes by entity kind"),
        &["kind", "outcome"]
    ).expect("static metric definition");
}

/// Register every counter with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(EVENT_COUNT.clone()),
        Box::new(MESSAGES_REJECTED.clone()),
        Box::new(BATCHES_TOTAL.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

pub fn record_events(source: &str, count: usize) {
    if count > 0 {
        EVENT_COUNT
            .with_label_values(&[source])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }
}

pub fn record_rejected(source: &str, count: usize) {
    if count > 0 {
        MESSAGES_REJECTED
            .with_label_values(&[source])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }
}

pub fn record_batch(kind: &str, outcome: &str) {
    BATCHES_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Render all registered metrics in the Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    register_metrics()?;
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
