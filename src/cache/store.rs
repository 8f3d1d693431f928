//! Cache facade used by the application services.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::backend::{CacheBackend, CacheError, DisabledBackend};
use super::config::{BackendKind, CacheConfig};
use super::keys::CacheKey;
use super::memory::MemoryBackend;
use super::redis_backend::RedisBackend;

const METRIC_CACHE_HIT: &str = "koktail_cache_hit_total";
const METRIC_CACHE_MISS: &str = "koktail_cache_miss_total";
const METRIC_CACHE_ERROR: &str = "koktail_cache_error_total";
const METRIC_CACHE_STALE_SKIP: &str = "koktail_cache_stale_fill_skipped_total";

/// Invalidation counter shared by every clone of a store.
pub type Generation = u64;

/// Typed, failure-absorbing view over a [`CacheBackend`].
///
/// None of the operations return errors: a broken backend reads as a miss and
/// writes or invalidations become logged no-ops.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    key_prefix: String,
    landing_ttl: Duration,
    generation: Arc<AtomicU64>,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            key_prefix: config.key_prefix.clone(),
            landing_ttl: config.landing_ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A store that never holds anything.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledBackend), &CacheConfig::default())
    }

    /// Build the configured backend. Redis is contacted once here; being
    /// unreachable is not an error.
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        if !config.enabled {
            return Ok(Self::new(Arc::new(DisabledBackend), config));
        }

        let backend: Arc<dyn CacheBackend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new(config)),
            BackendKind::Redis => {
                let url = config.redis_url.as_deref().ok_or_else(|| {
                    CacheError::unavailable("cache.redis_url is required for the redis backend")
                })?;
                Arc::new(RedisBackend::connect(url, config.operation_timeout).await?)
            }
        };

        Ok(Self::new(backend, config))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn landing_ttl(&self) -> Duration {
        self.landing_ttl
    }

    /// Current invalidation generation. Read it before loading a value that
    /// will be stored with [`Self::set_if_current`].
    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn get<T>(&self, key: CacheKey) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let storage_key = key.storage_key(&self.key_prefix);
        let raw = match self.backend.get(&storage_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "key" => key.as_str()).increment(1);
                debug!(key = %key, backend = self.backend.name(), "Cache miss");
                return None;
            }
            Err(err) => {
                self.record_failure(key, "get", &err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT, "key" => key.as_str()).increment(1);
                Some(value)
            }
            Err(err) => {
                self.record_failure(key, "decode", &CacheError::from(err));
                None
            }
        }
    }

    pub async fn set<T>(&self, key: CacheKey, value: &T, ttl: Duration)
    where
        T: Serialize + Sync,
    {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                self.record_failure(key, "encode", &CacheError::from(err));
                return;
            }
        };

        let storage_key = key.storage_key(&self.key_prefix);
        if let Err(err) = self.backend.set(&storage_key, raw, ttl).await {
            self.record_failure(key, "set", &err);
        }
    }

    /// Store `value` only if no invalidation happened since `loaded_at` was
    /// read. Returns whether the entry was kept.
    ///
    /// An invalidation racing with the write itself is caught by re-reading
    /// the generation afterwards and dropping the entry again.
    pub async fn set_if_current<T>(
        &self,
        key: CacheKey,
        value: &T,
        ttl: Duration,
        loaded_at: Generation,
    ) -> bool
    where
        T: Serialize + Sync,
    {
        if self.generation() != loaded_at {
            counter!(METRIC_CACHE_STALE_SKIP, "key" => key.as_str()).increment(1);
            debug!(key = %key, "Skipping cache fill: invalidated during load");
            return false;
        }

        self.set(key, value, ttl).await;

        if self.generation() != loaded_at {
            counter!(METRIC_CACHE_STALE_SKIP, "key" => key.as_str()).increment(1);
            self.delete_entry(key).await;
            return false;
        }
        true
    }

    pub async fn invalidate(&self, key: CacheKey) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.delete_entry(key).await;
    }

    async fn delete_entry(&self, key: CacheKey) {
        let storage_key = key.storage_key(&self.key_prefix);
        match self.backend.delete(&storage_key).await {
            Ok(()) => debug!(key = %key, backend = self.backend.name(), "Cache entry invalidated"),
            Err(err) => self.record_failure(key, "invalidate", &err),
        }
    }

    fn record_failure(&self, key: CacheKey, op: &'static str, err: &CacheError) {
        counter!(METRIC_CACHE_ERROR, "op" => op).increment(1);
        warn!(
            key = %key,
            op,
            backend = self.backend.name(),
            error = %err,
            "Cache operation failed; continuing without cache"
        );
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Timeout)
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::backend("READONLY"))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        items: Vec<String>,
    }

    fn blob() -> Blob {
        Blob {
            items: vec!["a".to_string(), "b".to_string()],
        }
    }

    fn memory_store() -> (CacheStore, Arc<MemoryBackend>) {
        let config = CacheConfig::default();
        let backend = Arc::new(MemoryBackend::new(&config));
        (CacheStore::new(backend.clone(), &config), backend)
    }

    #[tokio::test]
    async fn typed_roundtrip_through_memory_backend() {
        let (store, _) = memory_store();

        assert!(store.get::<Blob>(CacheKey::Landing).await.is_none());
        store
            .set(CacheKey::Landing, &blob(), store.landing_ttl())
            .await;
        assert_eq!(store.get::<Blob>(CacheKey::Landing).await, Some(blob()));

        store.invalidate(CacheKey::Landing).await;
        assert!(store.get::<Blob>(CacheKey::Landing).await.is_none());
    }

    #[tokio::test]
    async fn backend_failures_degrade_to_miss_and_no_op() {
        let store = CacheStore::new(Arc::new(FailingBackend), &CacheConfig::default());

        store
            .set(CacheKey::Landing, &blob(), Duration::from_secs(60))
            .await;
        assert!(store.get::<Blob>(CacheKey::Landing).await.is_none());
        store.invalidate(CacheKey::Landing).await;
    }

    #[tokio::test]
    async fn undecodable_payload_reads_as_miss() {
        let (store, backend) = memory_store();
        backend
            .set("koktail:landing", "{not json".to_string(), Duration::from_secs(60))
            .await
            .expect("memory set");

        assert!(store.get::<Blob>(CacheKey::Landing).await.is_none());
    }

    #[tokio::test]
    async fn fill_is_dropped_when_invalidated_during_load() {
        let (store, _) = memory_store();

        let loaded_at = store.generation();
        store.invalidate(CacheKey::Landing).await;
        let kept = store
            .set_if_current(CacheKey::Landing, &blob(), store.landing_ttl(), loaded_at)
            .await;

        assert!(!kept);
        assert!(store.get::<Blob>(CacheKey::Landing).await.is_none());

        let loaded_at = store.generation();
        let kept = store
            .set_if_current(CacheKey::Landing, &blob(), store.landing_ttl(), loaded_at)
            .await;
        assert!(kept);
        assert_eq!(store.get::<Blob>(CacheKey::Landing).await, Some(blob()));
    }

    #[tokio::test]
    async fn clones_share_the_generation() {
        let (store, _) = memory_store();
        let other = store.clone();

        let before = store.generation();
        other.invalidate(CacheKey::Landing).await;
        assert_eq!(store.generation(), before + 1);
    }

    #[tokio::test]
    async fn disabled_store_never_hits() {
        let store = CacheStore::disabled();
        store
            .set(CacheKey::Landing, &blob(), Duration::from_secs(60))
            .await;
        assert!(store.get::<Blob>(CacheKey::Landing).await.is_none());
        assert_eq!(store.backend_name(), "disabled");
    }

    #[tokio::test]
    async fn connect_honours_enabled_flag() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let store = CacheStore::connect(&config).await.expect("connect");
        assert_eq!(store.backend_name(), "disabled");

        let store = CacheStore::connect(&CacheConfig::default())
            .await
            .expect("connect");
        assert_eq!(store.backend_name(), "memory");
    }

    #[tokio::test]
    async fn redis_backend_requires_url() {
        let config = CacheConfig {
            backend: BackendKind::Redis,
            redis_url: None,
            ..Default::default()
        };
        assert!(CacheStore::connect(&config).await.is_err());
    }
}
