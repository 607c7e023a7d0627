//! # Protocol Errors
//!
//! Anything that makes a message untrustworthy or unreadable. A message that
//! fails with a `ProtocolError` is never applied and never acknowledged, so
//! the queue redelivers or dead-letters it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Not a JSON envelope in either header style.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// A header field the active profile needs is absent.
    #[error("Missing header field: {0}")]
    MissingField(&'static str),

    #[error("Unknown Message Type: {actual} (expected {expected})")]
    UnknownMessageType { expected: String, actual: String },

    #[error("Unknown Version: {actual} (expected {expected})")]
    UnknownVersion { expected: String, actual: String },

    /// Certificate fetch, certificate decode, signature decode or mismatch.
    #[error("Invalid signature: {0}")]
    Signature(String),

    #[error("Unknown encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Key resolution failed: {0}")]
    KeyResolution(String),

    /// Ciphertext, IV or padding is malformed.
    #[error("Cannot decrypt: {0}")]
    Decryption(String),

    /// The current key still produced garbage after one refresh.
    #[error("Current key for {message_type} is stale after refresh")]
    StaleCurrentKey { message_type: String },

    /// The base64 group message context could not be read.
    #[error("Invalid message context: {0}")]
    Context(String),
}
