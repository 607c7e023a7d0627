//! # Envelope Processor
//!
//! Application service implementing [`EnvelopeApi`].
//!
//! ## Architecture
//!
//! - Implements the inbound port (`EnvelopeApi`)
//! - Uses the outbound ports `KeyService` and `CertificateSource`
//! - Delegates string building and salvage to the domain layer
//!
//! Fetched certificates are cached per URL for the life of the processor.

use std::collections::HashMap;

use parking_lot::Mutex;
use shared_crypto::{decode_base64, decrypt_aes128_cbc, AesKey, Iv, SigningCertificate};
use tracing::{debug, warn};

use crate::domain::canonical::canonical_string;
use crate::domain::envelope::{
    Body, Envelope, EnvelopeProfile, HeaderStyle, PlainBody, ValidatedEnvelope,
};
use crate::domain::errors::ProtocolError;
use crate::domain::lenient::{looks_structured, parse_lenient};
use crate::ports::inbound::EnvelopeApi;
use crate::ports::outbound::{CertificateSource, KeyService, KeyServiceError};

/// The only supported body encoding.
pub const ENCODING_BASE64: &str = "base64";

/// Algorithm assumed when the header omits one.
pub const DEFAULT_ALGORITHM: &str = "aes128cbc";

pub struct EnvelopeProcessor<K: KeyService, C: CertificateSource> {
    keys: K,
    certificates: C,
    certificate_cache: Mutex<HashMap<String, SigningCertificate>>,
    /// Per-sender body keys for group envelopes, by key id.
    body_keys: HashMap<String, AesKey>,
}

impl<K: KeyService, C: CertificateSource> EnvelopeProcessor<K, C> {
    pub fn new(keys: K, certificates: C) -> Self {
        Self {
            keys,
            certificates,
            certificate_cache: Mutex::new(HashMap::new()),
            body_keys: HashMap::new(),
        }
    }

    pub fn with_body_keys(mut self, body_keys: HashMap<String, AesKey>) -> Self {
        self.body_keys = body_keys;
        self
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn certificates(&self) -> &C {
        &self.certificates
    }

    fn check_profile(envelope: &Envelope, profile: &EnvelopeProfile) -> Result<(), ProtocolError> {
        if envelope.style != profile.style {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "expected {:?} header style",
                profile.style
            )));
        }
        if envelope.header.message_type != profile.message_type {
            return Err(ProtocolError::UnknownMessageType {
                expected: profile.message_type.to_string(),
                actual: envelope.header.message_type.clone(),
            });
        }
        if envelope.header.version != profile.version {
            return Err(ProtocolError::UnknownVersion {
                expected: profile.version.to_string(),
                actual: envelope.header.version.clone(),
            });
        }
        Ok(())
    }

    async fn certificate(&self, url: &str) -> Result<SigningCertificate, ProtocolError> {
        if let Some(cert) = self.certificate_cache.lock().get(url).copied() {
            return Ok(cert);
        }

        let pem = self
            .certificates
            .fetch_certificate(url)
            .await
            .map_err(|e| ProtocolError::Signature(e.to_string()))?;
        let cert =
            SigningCertificate::from_pem(&pem).map_err(|e| ProtocolError::Signature(e.to_string()))?;

        debug!(url, algorithm = cert.algorithm(), "signing certificate cached");
        self.certificate_cache.lock().insert(url.to_string(), cert);
        Ok(cert)
    }

    async fn verify_signature(&self, envelope: &Envelope) -> Result<(), ProtocolError> {
        let header = &envelope.header;
        let canonical =
            canonical_string(envelope).map_err(|e| ProtocolError::Signature(e.to_string()))?;

        let encoded = header
            .signature
            .as_deref()
            .ok_or_else(|| ProtocolError::Signature("missing signature".into()))?;
        let signature = decode_base64(encoded)
            .map_err(|e| ProtocolError::Signature(format!("cannot decode signature: {e}")))?;

        let url = header
            .signing_cert_url
            .as_deref()
            .ok_or_else(|| ProtocolError::Signature("missing signing certificate URL".into()))?;
        let cert = self.certificate(url).await?;

        cert.verify(canonical.as_bytes(), &signature)
            .map_err(|e| ProtocolError::Signature(e.to_string()))
    }

    async fn decrypt_standard(&self, envelope: &Envelope) -> Result<PlainBody, ProtocolError> {
        let header = &envelope.header;

        let Some(encoding) = header.encoding.as_deref() else {
            return Ok(match &envelope.body {
                Body::Structured(v) => PlainBody::Json(v.clone()),
                Body::Text(t) => parse_body_text(t),
            });
        };

        if !encoding.eq_ignore_ascii_case(ENCODING_BASE64) {
            return Err(ProtocolError::UnsupportedEncoding(encoding.to_string()));
        }
        let algorithm = header.algorithm.as_deref().unwrap_or(DEFAULT_ALGORITHM);
        if !algorithm.eq_ignore_ascii_case(DEFAULT_ALGORITHM) {
            return Err(ProtocolError::UnsupportedAlgorithm(algorithm.to_string()));
        }

        let iv = header.iv.as_deref().ok_or(ProtocolError::MissingField("IV"))?;
        let iv = Iv::from_base64(iv).map_err(|e| ProtocolError::Decryption(e.to_string()))?;
        let ciphertext = encrypted_bytes(&envelope.body)?;

        let text = if let Some(url) = header.key_url.as_deref() {
            let key = self.keys.key_by_url(url).await.map_err(key_error)?;
            decrypt_text(&key, &iv, &ciphertext)?
        } else if let Some(key_id) = header.key_id.as_deref() {
            let key = self.keys.key_by_id(key_id).await.map_err(key_error)?;
            decrypt_text(&key, &iv, &ciphertext)?
        } else {
            self.decrypt_with_current_key(&header.message_type, &iv, &ciphertext)
                .await?
        };

        Ok(parse_body_text(&text))
    }

    /// One refresh of the cached current key, then give up.
    async fn decrypt_with_current_key(
        &self,
        message_type: &str,
        iv: &Iv,
        ciphertext: &[u8],
    ) -> Result<String, ProtocolError> {
        let key = self.keys.current_key(message_type).await.map_err(key_error)?;
        match decrypt_text(&key, iv, ciphertext) {
            Ok(text) if looks_structured(&text) => return Ok(text),
            Ok(_) => warn!(message_type, "current key produced unstructured output, refreshing"),
            Err(e) => warn!(message_type, error = %e, "current key failed, refreshing"),
        }

        self.keys.invalidate_current_key(message_type);
        let key = self.keys.current_key(message_type).await.map_err(key_error)?;
        match decrypt_text(&key, iv, ciphertext) {
            Ok(text) if looks_structured(&text) => Ok(text),
            _ => Err(ProtocolError::StaleCurrentKey {
                message_type: message_type.to_string(),
            }),
        }
    }

    fn decrypt_group(&self, envelope: &Envelope) -> Result<PlainBody, ProtocolError> {
        let header = &envelope.header;
        let text = match (header.key_id.as_deref(), header.iv.as_deref()) {
            (Some(key_id), Some(iv)) => {
                let key = self
                    .body_keys
                    .get(key_id)
                    .ok_or_else(|| ProtocolError::KeyResolution(format!("Invalid keyId: {key_id}")))?;
                let iv = Iv::from_base64(iv).map_err(|e| ProtocolError::Decryption(e.to_string()))?;
                decrypt_text(key, &iv, &encrypted_bytes(&envelope.body)?)?
            }
            _ => match &envelope.body {
                Body::Text(t) => t.clone(),
                Body::Structured(v) => return Ok(PlainBody::Json(v.clone())),
            },
        };
        Ok(parse_body_text(&text))
    }
}

fn key_error(e: KeyServiceError) -> ProtocolError {
    ProtocolError::KeyResolution(e.to_string())
}

fn encrypted_bytes(body: &Body) -> Result<Vec<u8>, ProtocolError> {
    match body {
        Body::Text(t) => decode_base64(t).map_err(|e| ProtocolError::Decryption(e.to_string())),
        Body::Structured(_) => Err(ProtocolError::Decryption(
            "encrypted body is not a string".into(),
        )),
    }
}

fn decrypt_text(key: &AesKey, iv: &Iv, ciphertext: &[u8]) -> Result<String, ProtocolError> {
    let bytes =
        decrypt_aes128_cbc(key, iv, ciphertext).map_err(|e| ProtocolError::Decryption(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| ProtocolError::Decryption("plaintext is not UTF-8".into()))
}

fn parse_body_text(text: &str) -> PlainBody {
    match parse_lenient(text) {
        Some(v) => PlainBody::Json(v),
        None => {
            warn!(len = text.len(), "body is not a JSON object, skipping");
            PlainBody::Empty
        }
    }
}

#[async_trait::async_trait]
impl<K: KeyService, C: CertificateSource> EnvelopeApi for EnvelopeProcessor<K, C> {
    async fn validate(
        &self,
        envelope: Envelope,
        profile: &EnvelopeProfile,
    ) -> Result<ValidatedEnvelope, ProtocolError> {
        Self::check_profile(&envelope, profile)?;
        self.verify_signature(&envelope).await?;
        Ok(ValidatedEnvelope::new(envelope))
    }

    async fn decrypt(&self, envelope: &ValidatedEnvelope) -> Result<PlainBody, ProtocolError> {
        let envelope = envelope.envelope();
        match envelope.style {
            HeaderStyle::Standard => self.decrypt_standard(envelope).await,
            HeaderStyle::Group => self.decrypt_group(envelope),
        }
    }
}
