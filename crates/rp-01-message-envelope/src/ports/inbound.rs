//! # Inbound Ports (Driving Ports / API)

use crate::domain::envelope::{Envelope, EnvelopeProfile, PlainBody, ValidatedEnvelope};
use crate::domain::errors::ProtocolError;

/// Primary envelope API.
///
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait::async_trait]
pub trait EnvelopeApi: Send + Sync {
    /// Check message type and version against `profile`, then verify the
    /// signature against the certificate named in the header.
    ///
    /// # Errors
    /// * `ProtocolError::UnknownMessageType` / `UnknownVersion` - wrong processor
    /// * `ProtocolError::Signature` - certificate or signature problem
    async fn validate(
        &self,
        envelope: Envelope,
        profile: &EnvelopeProfile,
    ) -> Result<ValidatedEnvelope, ProtocolError>;

    /// Decrypt (if the header declares an encoding) and parse the body.
    ///
    /// A body that decrypts cleanly but is not a JSON object yields
    /// `PlainBody::Empty` rather than an error.
    async fn decrypt(&self, envelope: &ValidatedEnvelope) -> Result<PlainBody, ProtocolError>;
}
