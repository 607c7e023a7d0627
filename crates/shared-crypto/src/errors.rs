//! Errors raised while decrypting bodies or checking envelope signatures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Bad padding, wrong key or a truncated block.
    #[error("body decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("IV must be {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    #[error("not base64: {0}")]
    InvalidEncoding(String),

    #[error("unreadable signing certificate: {0}")]
    InvalidCertificate(String),

    #[error("signature does not match")]
    SignatureVerificationFailed,

    #[error("malformed public key")]
    InvalidPublicKey,

    #[error("malformed private key")]
    InvalidPrivateKey,

    #[error("malformed signature")]
    InvalidSignature,
}
