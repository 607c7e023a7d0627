//! Signing certificate fetches. The envelope processor caches the results.

use rp_01_message_envelope::{CertificateError, CertificateSource};

use super::http::HttpClient;

pub struct HttpCertificates {
    http: HttpClient,
}

impl HttpCertificates {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait::async_trait]
impl CertificateSource for HttpCertificates {
    async fn fetch_certificate(&self, url: &str) -> Result<String, CertificateError> {
        self.http.get_text(url).await.map_err(|e| {
            if e.is_not_found() {
                CertificateError::NotFound(url.to_string())
            } else {
                CertificateError::Request(e.to_string())
            }
        })
    }
}
