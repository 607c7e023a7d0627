//! # Outbound Ports (Driven Ports / SPI)
//!
//! Key material and signing certificates live in external services. These
//! traits are the only way the envelope layer reaches them.

use shared_crypto::AesKey;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyServiceError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Key service request failed: {0}")]
    Request(String),

    /// Material was served but is not a usable AES-128 key.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CertificateError {
    #[error("Certificate not found: {0}")]
    NotFound(String),

    #[error("Certificate request failed: {0}")]
    Request(String),
}

/// Raw key material as served by the key service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub key_id: String,
    /// Base64 key bytes.
    pub encoded: String,
}

/// Fetches key material. No caching.
#[async_trait::async_trait]
pub trait KeyMaterialSource: Send + Sync {
    async fn fetch_by_url(&self, url: &str) -> Result<KeyMaterial, KeyServiceError>;

    async fn fetch_by_id(&self, key_id: &str) -> Result<KeyMaterial, KeyServiceError>;

    /// The key currently used to encrypt `message_type`.
    async fn fetch_current(&self, message_type: &str) -> Result<KeyMaterial, KeyServiceError>;
}

/// Resolves decryption keys, caching the current key per message type.
#[async_trait::async_trait]
pub trait KeyService: Send + Sync {
    async fn key_by_url(&self, url: &str) -> Result<AesKey, KeyServiceError>;

    async fn key_by_id(&self, key_id: &str) -> Result<AesKey, KeyServiceError>;

    async fn current_key(&self, message_type: &str) -> Result<AesKey, KeyServiceError>;

    /// Drop the cached current key so the next lookup refetches it.
    fn invalidate_current_key(&self, message_type: &str);
}

/// Fetches signing certificate documents (PEM text) by URL.
#[async_trait::async_trait]
pub trait CertificateSource: Send + Sync {
    async fn fetch_certificate(&self, url: &str) -> Result<String, CertificateError>;
}
