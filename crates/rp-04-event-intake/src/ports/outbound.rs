//! # Outbound Ports (Driven Ports / SPI)
//!
//! The message queue and the roster service are external collaborators.

use std::path::PathBuf;

use chrono::Duration;
use shared_types::User;
use thiserror::Error;

use crate::domain::identity::{Quarter, SectionRef};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Queue I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The receipt's lease expired or the message was already deleted.
    #[error("Unknown receipt: {0}")]
    UnknownReceipt(String),

    #[error("Queue request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("Not found in roster: {0}")]
    NotFound(String),

    #[error("Roster request failed: {0}")]
    Request(String),
}

/// A message handed out by [`MessageQueue::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Handle for [`MessageQueue::delete`]; valid until the lease expires.
    pub receipt: String,
    pub body: String,
}

/// At-least-once message delivery.
///
/// A received message stays invisible to other consumers until it is
/// deleted or `visibility_timeout` passes.
#[async_trait::async_trait]
pub trait MessageQueue: Send + Sync {
    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, TransportError>;

    async fn delete(&self, receipt: &str) -> Result<(), TransportError>;
}

/// Term, section and person lookups.
#[async_trait::async_trait]
pub trait RosterService: Send + Sync {
    async fn is_active_term(&self, year: i32, quarter: Quarter) -> Result<bool, RosterError>;

    async fn is_time_schedule_ready(&self, section: &SectionRef) -> Result<bool, RosterError>;

    /// The person behind a login id, if one exists.
    async fn person_by_login(&self, login_id: &str) -> Result<Option<User>, RosterError>;

    async fn is_group_member(&self, group_id: &str, login_id: &str) -> Result<bool, RosterError>;
}
