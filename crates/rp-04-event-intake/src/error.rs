//! Error types for event intake.

use rp_01_message_envelope::ProtocolError;
use rp_02_event_health::HealthError;
use rp_03_import_queue::QueueError;
use thiserror::Error;

use crate::ports::outbound::{RosterError, TransportError};

/// Anything that leaves a message unacknowledged.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The body decrypted and parsed but does not have the family's shape.
    #[error("Malformed payload: {0}")]
    Payload(String),

    #[error("Import queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Frequency log error: {0}")]
    Health(#[from] HealthError),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("Message queue error: {0}")]
    Transport(#[from] TransportError),
}

impl IntakeError {
    pub fn is_protocol(&self) -> bool {
        matches!(self, IntakeError::Protocol(_))
    }
}
