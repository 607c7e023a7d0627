//! # Service Container
//!
//! Builds the concrete subsystem stacks each job needs from a
//! [`RuntimeConfig`]. A job run is a short-lived process, so every job gets
//! its own instances; state is shared only through the stores on disk.
//!
//! ```text
//! gather-events        EventIntake ── EnvelopeProcessor ── key service, certs
//!                                  ├─ ImportQueue ─────── queue store
//!                                  ├─ HealthMonitor ───── health store
//!                                  └─ HttpRoster
//! queue-* / monitor    ImportMonitor ── ImportQueue
//!                                    ├─ BatchBuilder ─── HttpRoster, artifacts
//!                                    └─ HttpLms
//! ```

use std::time::Duration;

use rp_01_message_envelope::{CachingKeyService, EnvelopeProcessor};
use rp_02_event_health::{FileHealthStore, HealthMonitor, LogAlertSink};
use rp_03_import_queue::{FileQueueStorage, ImportQueue};
use rp_04_event_intake::{EventFamily, EventIntake, SpoolMessageQueue};
use rp_05_batch_builder::{BatchBuilder, DirectoryArtifactStore};
use rp_06_import_monitor::ImportMonitor;
use rp_07_execution_guard::ExecutionGuard;
use shared_types::SystemTimeSource;
use tracing::debug;

use crate::adapters::{HttpCertificates, HttpClient, HttpError, HttpKeyMaterial, HttpLms, HttpRoster};
use crate::config::{ConfigError, RuntimeConfig};

pub type ConcreteImportQueue = ImportQueue<FileQueueStorage, SystemTimeSource>;

pub type ConcreteHealthMonitor = HealthMonitor<FileHealthStore, LogAlertSink, SystemTimeSource>;

pub type ConcreteEnvelopes = EnvelopeProcessor<CachingKeyService<HttpKeyMaterial>, HttpCertificates>;

pub type ConcreteEventIntake =
    EventIntake<ConcreteEnvelopes, ConcreteImportQueue, ConcreteHealthMonitor, HttpRoster>;

pub type ConcreteBatchBuilder = BatchBuilder<HttpRoster, DirectoryArtifactStore>;

pub type ConcreteImportMonitor =
    ImportMonitor<ConcreteImportQueue, ConcreteBatchBuilder, HttpLms, SystemTimeSource>;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot build HTTP client: {0}")]
    Http(#[from] HttpError),
}

pub struct ServiceContainer {
    config: RuntimeConfig,
}

impl ServiceContainer {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn http(&self, base_url: &str, token: Option<String>) -> Result<HttpClient, HttpError> {
        HttpClient::new(
            base_url,
            Duration::from_secs(self.config.remote.request_timeout_secs),
            token,
        )
    }

    fn roster(&self) -> Result<HttpRoster, HttpError> {
        Ok(HttpRoster::new(self.http(&self.config.remote.roster_url, None)?))
    }

    pub fn guard(&self) -> ExecutionGuard {
        ExecutionGuard::new(&self.config.paths.lock_dir)
    }

    pub fn import_queue(&self) -> ConcreteImportQueue {
        ImportQueue::new(
            FileQueueStorage::open(self.config.paths.queue_store()),
            SystemTimeSource,
            self.config.import_limits,
        )
    }

    pub fn health_monitor(&self, family: EventFamily) -> ConcreteHealthMonitor {
        HealthMonitor::new(
            FileHealthStore::open(self.config.paths.health_store()),
            LogAlertSink,
            SystemTimeSource,
        )
        .with_prune_after_days(self.config.queues.for_family(family).prune_after_days)
    }

    pub fn message_queue(&self, family: EventFamily) -> SpoolMessageQueue<SystemTimeSource> {
        SpoolMessageQueue::new(&self.config.paths.spool_root, family.queue_name(), SystemTimeSource)
    }

    pub fn event_intake(&self, family: EventFamily) -> Result<ConcreteEventIntake, ContainerError> {
        let key_http = self.http(&self.config.remote.key_service_url, None)?;
        let keys = CachingKeyService::new(HttpKeyMaterial::new(key_http.clone()));
        let envelopes = EnvelopeProcessor::new(keys, HttpCertificates::new(key_http))
            .with_body_keys(self.config.groups.decoded_body_keys()?);
        debug!(family = %family, "event intake assembled");

        Ok(EventIntake::new(
            envelopes,
            self.import_queue(),
            self.health_monitor(family),
            self.roster()?,
        )
        .with_login_groups(self.config.groups.login_groups()))
    }

    pub fn import_monitor(&self) -> Result<ConcreteImportMonitor, ContainerError> {
        let remote = &self.config.remote;
        let lms = HttpLms::new(
            self.http(&remote.lms_url, remote.lms_token.clone())?,
            remote.lms_account.clone(),
        );
        let builder = BatchBuilder::new(
            self.roster()?,
            DirectoryArtifactStore::new(&self.config.paths.artifact_root),
        );
        Ok(ImportMonitor::new(
            self.import_queue(),
            builder,
            lms,
            SystemTimeSource,
            self.config.monitor.policy(),
        ))
    }
}
