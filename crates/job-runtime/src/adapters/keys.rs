//! Key service client.
//!
//! | Lookup  | Request |
//! |---------|---------|
//! | by URL  | `GET <KeyURL>` |
//! | by id   | `GET key/v1/encryption/<id>.json` |
//! | current | `GET key/v1/type/<message type>/encryption/current.json` |
//!
//! Every response is `{"ID": "...", "Key": "<base64>"}`.

use rp_01_message_envelope::{KeyMaterial, KeyMaterialSource, KeyServiceError};
use serde::Deserialize;

use super::http::{HttpClient, HttpError};

#[derive(Debug, Deserialize)]
struct KeyDocument {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Key")]
    key: String,
}

impl From<KeyDocument> for KeyMaterial {
    fn from(doc: KeyDocument) -> Self {
        KeyMaterial {
            key_id: doc.id,
            encoded: doc.key,
        }
    }
}

fn key_error(what: &str) -> impl FnOnce(HttpError) -> KeyServiceError + '_ {
    move |e| {
        if e.is_not_found() {
            KeyServiceError::NotFound(what.to_string())
        } else {
            KeyServiceError::Request(e.to_string())
        }
    }
}

pub struct HttpKeyMaterial {
    http: HttpClient,
}

impl HttpKeyMaterial {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    async fn fetch(&self, path: &str, what: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.http
            .get_json::<KeyDocument>(path)
            .await
            .map(KeyMaterial::from)
            .map_err(key_error(what))
    }
}

#[async_trait::async_trait]
impl KeyMaterialSource for HttpKeyMaterial {
    async fn fetch_by_url(&self, url: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.fetch(url, url).await
    }

    async fn fetch_by_id(&self, key_id: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.fetch(&format!("key/v1/encryption/{key_id}.json"), key_id)
            .await
    }

    async fn fetch_current(&self, message_type: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.fetch(
            &format!("key/v1/type/{message_type}/encryption/current.json"),
            message_type,
        )
        .await
    }
}
