//! Envelope builders for tests.
//!
//! Produces envelopes that are signed exactly the way producers sign them,
//! optionally with an AES-128-CBC body. Enabled for this crate's own tests
//! and, through the `test-utils` feature, for downstream crates.

use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use shared_crypto::{encrypt_aes128_cbc, AesKey, Ed25519KeyPair, Iv, SigningCertificate};

use crate::adapters::memory::InMemoryCertificates;
use crate::domain::canonical::canonical_string;
use crate::domain::envelope::{Body, Envelope, EnvelopeHeader, HeaderStyle};

pub const FIXTURE_TIMESTAMP: &str = "2024-04-01T10:00:00.000Z";

/// How an encrypted standard envelope names its key.
#[derive(Debug, Clone)]
pub enum KeyRef {
    Url(String),
    Id(String),
    /// No key header; the receiver uses the current key for the type.
    Current,
}

pub struct EnvelopeFixture {
    keypair: Ed25519KeyPair,
    cert_url: String,
    next_id: AtomicU64,
}

impl EnvelopeFixture {
    pub fn new(seed: u8) -> Self {
        Self {
            keypair: Ed25519KeyPair::from_seed([seed; 32]),
            cert_url: format!("https://certs.example/signing-{seed}.pem"),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn cert_url(&self) -> &str {
        &self.cert_url
    }

    pub fn certificate_pem(&self) -> String {
        SigningCertificate::Ed25519(self.keypair.public_key()).to_pem()
    }

    /// A certificate source that serves this fixture's certificate.
    pub fn certificates(&self) -> InMemoryCertificates {
        let certs = InMemoryCertificates::default();
        certs.insert(&self.cert_url, &self.certificate_pem());
        certs
    }

    fn message_id(&self) -> String {
        format!("msg-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn sign(&self, mut envelope: Envelope) -> Envelope {
        let canonical = canonical_string(&envelope).expect("fixture header is complete");
        let signature = self.keypair.sign(canonical.as_bytes());
        envelope.header.signature = Some(STANDARD.encode(signature));
        envelope
    }

    /// A signed standard envelope with a plaintext body.
    pub fn standard(&self, message_type: &str, version: &str, body: &str) -> Envelope {
        self.sign(Envelope {
            style: HeaderStyle::Standard,
            header: EnvelopeHeader {
                message_type: message_type.to_string(),
                version: version.to_string(),
                message_id: Some(self.message_id()),
                timestamp: Some(FIXTURE_TIMESTAMP.to_string()),
                signing_cert_url: Some(self.cert_url.clone()),
                ..EnvelopeHeader::default()
            },
            body: Body::Text(body.to_string()),
        })
    }

    /// A signed standard envelope whose body is encrypted with `key`.
    pub fn standard_encrypted(
        &self,
        message_type: &str,
        version: &str,
        plaintext: &str,
        key: &AesKey,
        key_ref: KeyRef,
    ) -> Envelope {
        let iv = Iv::generate();
        let ciphertext = encrypt_aes128_cbc(key, &iv, plaintext.as_bytes());
        let (key_url, key_id) = match key_ref {
            KeyRef::Url(url) => (Some(url), None),
            KeyRef::Id(id) => (None, Some(id)),
            KeyRef::Current => (None, None),
        };
        self.sign(Envelope {
            style: HeaderStyle::Standard,
            header: EnvelopeHeader {
                message_type: message_type.to_string(),
                version: version.to_string(),
                message_id: Some(self.message_id()),
                timestamp: Some(FIXTURE_TIMESTAMP.to_string()),
                signing_cert_url: Some(self.cert_url.clone()),
                encoding: Some("base64".into()),
                algorithm: Some("aes128cbc".into()),
                key_url,
                key_id,
                iv: Some(iv.to_base64()),
                ..EnvelopeHeader::default()
            },
            body: Body::Text(STANDARD.encode(ciphertext)),
        })
    }

    /// A signed group envelope. With `body_key`, the body is encrypted and
    /// the header carries `keyId` and `iv`.
    pub fn group(
        &self,
        action: &str,
        group: &str,
        body: &str,
        body_key: Option<(&str, &AesKey)>,
    ) -> Envelope {
        let context = STANDARD.encode(json!({"action": action, "group": group}).to_string());
        let (key_id, iv, body) = match body_key {
            Some((key_id, key)) => {
                let iv = Iv::generate();
                let ciphertext = encrypt_aes128_cbc(key, &iv, body.as_bytes());
                (
                    Some(key_id.to_string()),
                    Some(iv.to_base64()),
                    STANDARD.encode(ciphertext),
                )
            }
            None => (None, None, body.to_string()),
        };
        self.sign(Envelope {
            style: HeaderStyle::Group,
            header: EnvelopeHeader {
                message_type: "gws".into(),
                version: "UWIT-1".into(),
                message_id: Some(self.message_id()),
                timestamp: Some(FIXTURE_TIMESTAMP.to_string()),
                signing_cert_url: Some(self.cert_url.clone()),
                content_type: Some("json".into()),
                message_context: Some(context),
                sender: Some("gws".into()),
                key_id,
                iv,
                ..EnvelopeHeader::default()
            },
            body: Body::Text(body),
        })
    }
}

/// Wire text for a queue message.
pub fn raw(envelope: &Envelope) -> String {
    envelope.to_value().to_string()
}
