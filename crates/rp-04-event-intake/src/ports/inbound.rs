//! # Inbound Ports (Driving Ports / API)

use crate::domain::family::EventFamily;
use crate::domain::report::{GatherOptions, GatherReport, MessageOutcome};
use crate::error::IntakeError;
use crate::ports::outbound::MessageQueue;

/// Primary event intake API.
#[async_trait::async_trait]
pub trait EventIntakeApi: Send + Sync {
    /// Validate, decrypt, normalize and apply one raw message.
    ///
    /// Applying the same message twice leaves the queue as one application
    /// did.
    ///
    /// # Errors
    /// Any error means the message must not be acknowledged.
    async fn process(&self, family: EventFamily, raw: &str) -> Result<MessageOutcome, IntakeError>;

    /// Drain `queue`, acknowledging each message only after `process`
    /// succeeds for it. Per-message failures are reported, not returned.
    ///
    /// # Errors
    /// Only when the queue itself cannot be read.
    async fn gather(
        &self,
        family: EventFamily,
        queue: &dyn MessageQueue,
        options: GatherOptions,
    ) -> Result<GatherReport, IntakeError>;
}
