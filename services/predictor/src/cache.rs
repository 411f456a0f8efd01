use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store error: {0}")]
    Store(String),
    #[error("cache payload error: {0}")]
    Payload(String),
    #[error("cache operation timed out")]
    Timeout,
}

/// Raw byte store with optional per-key expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// Process-local store, used when no Redis URL is configured.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(e) => e.expires_at.is_some_and(|at| Instant::now() >= at),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let expires_at = ttl.map(|t| Instant::now() + t);
        self.entries
            .lock()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// JSON values on top of a [`CacheStore`], optionally gzip-compressed.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub async fn write_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        compress: bool,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_vec(value).map_err(|e| CacheError::Payload(e.to_string()))?;
        let bytes = if compress { gzip(&json)? } else { json };
        debug!(key, bytes = bytes.len(), compress, "cache write");
        self.store.set(key, bytes, ttl).await
    }

    /// Compression is detected from the payload, so readers need not know
    /// how the value was written.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(bytes) = self.store.get(key).await? else {
            return Ok(None);
        };
        let json = if bytes.starts_with(&GZIP_MAGIC) { gunzip(&bytes)? } else { bytes };
        let value = serde_json::from_slice(&json).map_err(|e| CacheError::Payload(e.to_string()))?;
        Ok(Some(value))
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).await
    }
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).map_err(|e| CacheError::Payload(e.to_string()))?;
    enc.finish().map_err(|e| CacheError::Payload(e.to_string()))
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Payload(format!("corrupt gzip payload: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> (Cache, Arc<MemoryCacheStore>) {
        let store = Arc::new(MemoryCacheStore::new());
        (Cache::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_json_round_trip_plain_and_compressed() {
        let (cache, store) = cache();
        let value = json!({"name": "Penguins Prediction", "labels": ["Adelie", "Gentoo"]});

        cache.write_json("plain", &value, false, None).await.unwrap();
        cache.write_json("packed", &value, true, None).await.unwrap();

        assert!(store.get("packed").await.unwrap().unwrap().starts_with(&GZIP_MAGIC));
        let plain: Option<serde_json::Value> = cache.read_json("plain").await.unwrap();
        let packed: Option<serde_json::Value> = cache.read_json("packed").await.unwrap();
        assert_eq!(plain, Some(value.clone()));
        assert_eq!(packed, Some(value));
    }

    #[tokio::test]
    async fn test_missing_and_deleted_keys() {
        let (cache, _) = cache();
        assert_eq!(cache.read_json::<u32>("nope").await.unwrap(), None);

        cache.write_json("k", &7u32, false, None).await.unwrap();
        cache.delete("k").await.unwrap();
        assert_eq!(cache.read_json::<u32>("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let (cache, _) = cache();
        cache.write_json("k", &1u32, true, Some(Duration::from_secs(60))).await.unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.read_json::<u32>("k").await.unwrap(), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.read_json::<u32>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_an_error() {
        let (cache, store) = cache();
        store.set("k", vec![0x1f, 0x8b, 0, 1], None).await.unwrap();
        assert!(matches!(cache.read_json::<u32>("k").await, Err(CacheError::Payload(_))));
    }
}
