//! Canonical signing strings.
//!
//! Standard style:
//!
//! ```text
//! MessageType\nMessageId\nTimeStamp\nBody\n
//! ```
//!
//! Group style (the `iv`/`keyId` line pair only when `keyId` is present):
//!
//! ```text
//! contentType\n[iv\nkeyId\n]messageContext\nmessageId\nmessageType\nsender\nsigningCertUrl\ntimestamp\nversion\nbody\n
//! ```

use super::envelope::{Envelope, HeaderStyle};
use super::errors::ProtocolError;

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ProtocolError> {
    value.as_deref().ok_or(ProtocolError::MissingField(name))
}

/// Build the exact byte string the producer signed.
pub fn canonical_string(envelope: &Envelope) -> Result<String, ProtocolError> {
    let h = &envelope.header;
    let body = envelope.body.as_signed_text();

    match envelope.style {
        HeaderStyle::Standard => Ok(format!(
            "{}\n{}\n{}\n{}\n",
            h.message_type,
            required(&h.message_id, "MessageId")?,
            required(&h.timestamp, "TimeStamp")?,
            body
        )),
        HeaderStyle::Group => {
            let mut out = format!("{}\n", required(&h.content_type, "contentType")?);
            if let Some(key_id) = &h.key_id {
                out.push_str(required(&h.iv, "iv")?);
                out.push('\n');
                out.push_str(key_id);
                out.push('\n');
            }
            for part in [
                required(&h.message_context, "messageContext")?,
                required(&h.message_id, "messageId")?,
                h.message_type.as_str(),
                required(&h.sender, "sender")?,
                required(&h.signing_cert_url, "signingCertUrl")?,
                required(&h.timestamp, "timestamp")?,
                h.version.as_str(),
                body.as_str(),
            ] {
                out.push_str(part);
                out.push('\n');
            }
            Ok(out)
        }
    }
}
