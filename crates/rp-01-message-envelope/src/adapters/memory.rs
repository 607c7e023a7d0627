//! In-memory key and certificate sources.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use shared_crypto::AesKey;

use crate::ports::outbound::{
    CertificateError, CertificateSource, KeyMaterial, KeyMaterialSource, KeyServiceError,
};

/// Key material held in memory.
///
/// Current keys form a rotation queue per message type: each fetch advances
/// to the next key until only the last remains.
#[derive(Default)]
pub struct InMemoryKeyMaterial {
    by_url: Mutex<HashMap<String, KeyMaterial>>,
    by_id: Mutex<HashMap<String, KeyMaterial>>,
    current: Mutex<HashMap<String, VecDeque<KeyMaterial>>>,
    current_fetches: AtomicUsize,
    id_fetches: AtomicUsize,
}

fn material(key_id: &str, key: &AesKey) -> KeyMaterial {
    KeyMaterial {
        key_id: key_id.to_string(),
        encoded: key.to_base64(),
    }
}

impl InMemoryKeyMaterial {
    pub fn insert_url(&self, url: &str, key_id: &str, key: &AesKey) {
        self.by_url.lock().insert(url.to_string(), material(key_id, key));
    }

    pub fn insert_id(&self, key_id: &str, key: &AesKey) {
        self.by_id.lock().insert(key_id.to_string(), material(key_id, key));
    }

    pub fn push_current(&self, message_type: &str, key_id: &str, key: &AesKey) {
        self.current
            .lock()
            .entry(message_type.to_string())
            .or_default()
            .push_back(material(key_id, key));
    }

    pub fn current_fetches(&self) -> usize {
        self.current_fetches.load(Ordering::Relaxed)
    }

    pub fn id_fetches(&self) -> usize {
        self.id_fetches.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl KeyMaterialSource for InMemoryKeyMaterial {
    async fn fetch_by_url(&self, url: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.by_url
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| KeyServiceError::NotFound(url.to_string()))
    }

    async fn fetch_by_id(&self, key_id: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.id_fetches.fetch_add(1, Ordering::Relaxed);
        self.by_id
            .lock()
            .get(key_id)
            .cloned()
            .ok_or_else(|| KeyServiceError::NotFound(key_id.to_string()))
    }

    async fn fetch_current(&self, message_type: &str) -> Result<KeyMaterial, KeyServiceError> {
        self.current_fetches.fetch_add(1, Ordering::Relaxed);
        let mut current = self.current.lock();
        let queue = current
            .get_mut(message_type)
            .ok_or_else(|| KeyServiceError::NotFound(message_type.to_string()))?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.ok_or_else(|| KeyServiceError::NotFound(message_type.to_string()))
    }
}

/// PEM documents by URL.
#[derive(Default)]
pub struct InMemoryCertificates {
    documents: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl InMemoryCertificates {
    pub fn insert(&self, url: &str, pem: &str) {
        self.documents.lock().insert(url.to_string(), pem.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl CertificateSource for InMemoryCertificates {
    async fn fetch_certificate(&self, url: &str) -> Result<String, CertificateError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.documents
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| CertificateError::NotFound(url.to_string()))
    }
}
