//! Caching `KeyService` over any `KeyMaterialSource`.
//!
//! Keys fetched by id are immutable and cached forever. The current key per
//! message type is cached until `invalidate_current_key`. URL-addressed keys
//! are fetched each time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use shared_crypto::AesKey;
use tracing::debug;

use crate::ports::outbound::{KeyMaterial, KeyMaterialSource, KeyService, KeyServiceError};

pub struct CachingKeyService<S: KeyMaterialSource> {
    source: S,
    current: Mutex<HashMap<String, AesKey>>,
    by_id: Mutex<HashMap<String, AesKey>>,
    invalidations: AtomicUsize,
}

impl<S: KeyMaterialSource> CachingKeyService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: Mutex::new(HashMap::new()),
            by_id: Mutex::new(HashMap::new()),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of times a cached current key has been dropped.
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }

    fn decode(material: &KeyMaterial) -> Result<AesKey, KeyServiceError> {
        AesKey::from_base64(&material.encoded)
            .map_err(|e| KeyServiceError::InvalidKey(format!("{}: {e}", material.key_id)))
    }
}

#[async_trait::async_trait]
impl<S: KeyMaterialSource> KeyService for CachingKeyService<S> {
    async fn key_by_url(&self, url: &str) -> Result<AesKey, KeyServiceError> {
        let material = self.source.fetch_by_url(url).await?;
        Self::decode(&material)
    }

    async fn key_by_id(&self, key_id: &str) -> Result<AesKey, KeyServiceError> {
        if let Some(key) = self.by_id.lock().get(key_id).cloned() {
            return Ok(key);
        }
        let key = Self::decode(&self.source.fetch_by_id(key_id).await?)?;
        self.by_id.lock().insert(key_id.to_string(), key.clone());
        Ok(key)
    }

    async fn current_key(&self, message_type: &str) -> Result<AesKey, KeyServiceError> {
        if let Some(key) = self.current.lock().get(message_type).cloned() {
            return Ok(key);
        }
        let material = self.source.fetch_current(message_type).await?;
        let key = Self::decode(&material)?;
        debug!(message_type, key_id = %material.key_id, "current key fetched");
        self.current.lock().insert(message_type.to_string(), key.clone());
        Ok(key)
    }

    fn invalidate_current_key(&self, message_type: &str) {
        self.current.lock().remove(message_type);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryKeyMaterial;

    #[tokio::test]
    async fn test_current_key_cached_until_invalidated() {
        let material = InMemoryKeyMaterial::default();
        material.push_current("t", "a", &AesKey::from_bytes([1; 16]));
        material.push_current("t", "b", &AesKey::from_bytes([2; 16]));
        let keys = CachingKeyService::new(material);

        let first = keys.current_key("t").await.unwrap();
        let again = keys.current_key("t").await.unwrap();
        assert_eq!(first.as_bytes(), again.as_bytes());
        assert_eq!(keys.source().current_fetches(), 1);

        keys.invalidate_current_key("t");
        let rotated = keys.current_key("t").await.unwrap();
        assert_eq!(rotated.as_bytes(), &[2; 16]);
        assert_eq!(keys.invalidations(), 1);
    }

    #[tokio::test]
    async fn test_key_by_id_cached() {
        let material = InMemoryKeyMaterial::default();
        material.insert_id("k", &AesKey::from_bytes([3; 16]));
        let keys = CachingKeyService::new(material);
        keys.key_by_id("k").await.unwrap();
        keys.key_by_id("k").await.unwrap();
        assert_eq!(keys.source().id_fetches(), 1);
        assert!(matches!(
            keys.key_by_id("missing").await,
            Err(KeyServiceError::NotFound(_))
        ));
    }
}
