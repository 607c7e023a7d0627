//! # Envelope Model
//!
//! Two header styles arrive on the queues:
//!
//! | Style | Keys | Used by |
//! |-------|------|---------|
//! | `Standard` | `Header.MessageType`, `Header.SigningCertURL`, ... | enrollment, instructor, person |
//! | `Group` | `header.messageType`, `header.signingCertUrl`, ... | group events |
//!
//! Both normalise into one [`EnvelopeHeader`]. The body stays opaque until
//! decryption.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;

use super::errors::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderStyle {
    Standard,
    Group,
}

/// The expected message type and version for one processor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeProfile {
    pub message_type: &'static str,
    pub version: &'static str,
    pub style: HeaderStyle,
}

/// Header fields, normalised across both styles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub message_type: String,
    pub version: String,
    pub message_id: Option<String>,
    pub timestamp: Option<String>,
    pub signature: Option<String>,
    pub signing_cert_url: Option<String>,
    pub encoding: Option<String>,
    pub algorithm: Option<String>,
    pub key_url: Option<String>,
    pub key_id: Option<String>,
    pub iv: Option<String>,
    // Group style only.
    pub content_type: Option<String>,
    pub message_context: Option<String>,
    pub sender: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Structured(Value),
}

impl Body {
    /// Text form as it appears in the signed canonical string.
    pub fn as_signed_text(&self) -> String {
        match self {
            Body::Text(t) => t.clone(),
            Body::Structured(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub style: HeaderStyle,
    pub header: EnvelopeHeader,
    pub body: Body,
}

/// An envelope whose type, version and signature have been checked.
///
/// Only `EnvelopeApi::validate` constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEnvelope {
    envelope: Envelope,
}

impl ValidatedEnvelope {
    pub(crate) fn new(envelope: Envelope) -> Self {
        Self { envelope }
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn header(&self) -> &EnvelopeHeader {
        &self.envelope.header
    }

    pub fn into_inner(self) -> Envelope {
        self.envelope
    }
}

/// A decrypted, parsed body.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainBody {
    Json(Value),
    /// Decryption succeeded but the text was not a JSON object. The caller
    /// acknowledges and skips the message.
    Empty,
}

impl PlainBody {
    pub fn json(&self) -> Option<&Value> {
        match self {
            PlainBody::Json(v) => Some(v),
            PlainBody::Empty => None,
        }
    }
}

/// The base64 `messageContext` of a group envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupContext {
    pub action: String,
    pub group: String,
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct RawStandard {
    #[serde(rename = "Header")]
    header: RawStandardHeader,
    #[serde(rename = "Body")]
    body: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawStandardHeader {
    message_type: Option<String>,
    version: Option<Value>,
    message_id: Option<String>,
    time_stamp: Option<String>,
    signature: Option<String>,
    #[serde(rename = "SigningCertURL")]
    signing_cert_url: Option<String>,
    encoding: Option<String>,
    algorithm: Option<String>,
    #[serde(rename = "KeyURL")]
    key_url: Option<String>,
    key_id: Option<String>,
    #[serde(rename = "IV")]
    iv: Option<String>,
}

#[derive(Deserialize)]
struct RawGroup {
    header: RawGroupHeader,
    body: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroupHeader {
    message_type: Option<String>,
    version: Option<Value>,
    message_id: Option<String>,
    timestamp: Option<String>,
    signature: Option<String>,
    signing_cert_url: Option<String>,
    content_type: Option<String>,
    message_context: Option<String>,
    sender: Option<String>,
    key_id: Option<String>,
    iv: Option<String>,
}

/// Versions arrive as `"2"` or `2`; compare them as text.
fn version_text(v: Option<Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn body_from(value: Value) -> Result<Body, ProtocolError> {
    match value {
        Value::String(s) => Ok(Body::Text(s)),
        v @ Value::Object(_) => Ok(Body::Structured(v)),
        other => Err(ProtocolError::MalformedEnvelope(format!(
            "unsupported body type: {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Envelope {
    /// Parse raw message text in either header style.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        if value.get("Header").is_some() {
            let raw: RawStandard = serde_json::from_value(value)
                .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;
            let h = raw.header;
            Ok(Envelope {
                style: HeaderStyle::Standard,
                header: EnvelopeHeader {
                    message_type: h.message_type.ok_or(ProtocolError::MissingField("MessageType"))?,
                    version: version_text(h.version).ok_or(ProtocolError::MissingField("Version"))?,
                    message_id: h.message_id,
                    timestamp: h.time_stamp,
                    signature: h.signature,
                    signing_cert_url: h.signing_cert_url,
                    encoding: h.encoding,
                    algorithm: h.algorithm,
                    key_url: h.key_url,
                    key_id: h.key_id,
                    iv: h.iv,
                    ..EnvelopeHeader::default()
                },
                body: body_from(raw.body)?,
            })
        } else if value.get("header").is_some() {
            let raw: RawGroup = serde_json::from_value(value)
                .map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))?;
            let h = raw.header;
            Ok(Envelope {
                style: HeaderStyle::Group,
                header: EnvelopeHeader {
                    message_type: h.message_type.ok_or(ProtocolError::MissingField("messageType"))?,
                    version: version_text(h.version).ok_or(ProtocolError::MissingField("version"))?,
                    message_id: h.message_id,
                    timestamp: h.timestamp,
                    signature: h.signature,
                    signing_cert_url: h.signing_cert_url,
                    key_id: h.key_id,
                    iv: h.iv,
                    content_type: h.content_type,
                    message_context: h.message_context,
                    sender: h.sender,
                    ..EnvelopeHeader::default()
                },
                body: body_from(raw.body)?,
            })
        } else {
            Err(ProtocolError::MalformedEnvelope("no header".into()))
        }
    }

    /// Decode the group `messageContext` header.
    pub fn group_context(&self) -> Result<GroupContext, ProtocolError> {
        let encoded = self
            .header
            .message_context
            .as_deref()
            .ok_or(ProtocolError::MissingField("messageContext"))?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ProtocolError::Context(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| ProtocolError::Context(e.to_string()))
    }

    /// Render back to wire form. Absent optional fields are omitted.
    pub fn to_value(&self) -> Value {
        let h = &self.header;
        let body = match &self.body {
            Body::Text(t) => Value::String(t.clone()),
            Body::Structured(v) => v.clone(),
        };
        let fields: Vec<(&str, Option<&String>)> = match self.style {
            HeaderStyle::Standard => vec![
                ("MessageType", Some(&h.message_type)),
                ("Version", Some(&h.version)),
                ("MessageId", h.message_id.as_ref()),
                ("TimeStamp", h.timestamp.as_ref()),
                ("Signature", h.signature.as_ref()),
                ("SigningCertURL", h.signing_cert_url.as_ref()),
                ("Encoding", h.encoding.as_ref()),
                ("Algorithm", h.algorithm.as_ref()),
                ("KeyURL", h.key_url.as_ref()),
                ("KeyId", h.key_id.as_ref()),
                ("IV", h.iv.as_ref()),
            ],
            HeaderStyle::Group => vec![
                ("messageType", Some(&h.message_type)),
                ("version", Some(&h.version)),
                ("messageId", h.message_id.as_ref()),
                ("timestamp", h.timestamp.as_ref()),
                ("signature", h.signature.as_ref()),
                ("signingCertUrl", h.signing_cert_url.as_ref()),
                ("contentType", h.content_type.as_ref()),
                ("messageContext", h.message_context.as_ref()),
                ("sender", h.sender.as_ref()),
                ("keyId", h.key_id.as_ref()),
                ("iv", h.iv.as_ref()),
            ],
        };
        let header: serde_json::Map<String, Value> = fields
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.to_string(), Value::String(v.clone()))))
            .collect();

        let (header_key, body_key) = match self.style {
            HeaderStyle::Standard => ("Header", "Body"),
            HeaderStyle::Group => ("header", "body"),
        };
        let mut out = serde_json::Map::new();
        out.insert(header_key.to_string(), Value::Object(header));
        out.insert(body_key.to_string(), body);
        Value::Object(out)
    }
}
