//! Shared `reqwest` client with a base URL, timeout and optional bearer token.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Unexpected response from {url}: {source}")]
    Decode { url: String, source: reqwest::Error },
}

impl HttpError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, HttpError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// HTTP status, or 0 when the request never got one.
    pub fn status_code(&self) -> u16 {
        match self {
            HttpError::Status { status, .. } => status.as_u16(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rp-jobs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| HttpError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// `path` joined to the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    pub fn get(&self, path: &str) -> (String, RequestBuilder) {
        let url = self.url(path);
        let request = self.authorize(self.client.get(&url));
        (url, request)
    }

    pub fn post(&self, path: &str) -> (String, RequestBuilder) {
        let url = self.url(path);
        let request = self.authorize(self.client.post(&url));
        (url, request)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send, and turn any non-2xx status into [`HttpError::Status`].
    pub async fn send(url: &str, request: RequestBuilder) -> Result<Response, HttpError> {
        let response = request.send().await.map_err(|source| HttpError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(HttpError::Status {
            url: url.to_string(),
            status,
            body,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let (url, request) = self.get(path);
        let response = Self::send(&url, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| HttpError::Decode { url, source })
    }

    pub async fn get_text(&self, path: &str) -> Result<String, HttpError> {
        let (url, request) = self.get(path);
        let response = Self::send(&url, request).await?;
        response
            .text()
            .await
            .map_err(|source| HttpError::Decode { url, source })
    }
}
