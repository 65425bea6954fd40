//! In-memory TTL cache for decoded upstream responses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

const KEY_NAMESPACE: &str = "fxgate";

/// Build a namespaced cache key from an operation name and its parameters.
///
/// Parameters are trimmed and uppercased so case variants of the same logical
/// request share one entry.
pub fn cache_key(operation: &str, params: &[&str]) -> String {
    let mut key = format!("{KEY_NAMESPACE}:{operation}");
    for param in params {
        key.push(':');
        key.push_str(&param.trim().to_ascii_uppercase());
    }
    key
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheInner {
    map: HashMap<String, CacheEntry>,
}

enum Lookup {
    Hit(String),
    Expired,
    Missing,
}

impl CacheInner {
    fn get(&self, key: &str, now: Instant) -> Lookup {
        match self.map.get(key) {
            Some(entry) if now < entry.expires_at => Lookup::Hit(entry.payload.clone()),
            Some(_) => Lookup::Expired,
            None => Lookup::Missing,
        }
    }

    /// Inserts the entry and drops every entry that has already expired.
    fn put(&mut self, key: String, payload: String, ttl: Duration) {
        let now = Instant::now();
        self.map.retain(|_, entry| entry.expires_at > now);
        self.map.insert(
            key,
            CacheEntry {
                payload,
                expires_at: now + ttl,
            },
        );
    }

    fn remove_if_expired(&mut self, key: &str, now: Instant) {
        if self.map.get(key).is_some_and(|entry| entry.expires_at <= now) {
            self.map.remove(key);
        }
    }
}

/// Thread-safe in-memory cache storing serialized JSON payloads.
///
/// Values are serialized on `set` and decoded into the caller's type on `get`.
/// Writes to the same key are last-writer-wins.
#[derive(Debug, Clone)]
pub struct CacheStore {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
    enabled: bool,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::default())),
            enabled: true,
        }
    }

    /// Create a cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Get a cached value for the given key if it exists and hasn't expired.
    ///
    /// Returns `None` if:
    /// - No entry exists for the key
    /// - The entry has expired
    /// - The stored payload does not decode into `T` (the entry is evicted)
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let now = Instant::now();
        let lookup = {
            let store = self.inner.read().await;
            store.get(key, now)
        };

        let payload = match lookup {
            Lookup::Hit(payload) => payload,
            Lookup::Expired => {
                debug!(key, "cache entry expired");
                self.inner.write().await.remove_if_expired(key, now);
                return None;
            }
            Lookup::Missing => {
                debug!(key, "cache miss");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(error) => {
                warn!(key, %error, "evicting cache entry that failed to decode");
                self.inner.write().await.map.remove(key);
                None
            }
        }
    }

    /// Serialize and store `value` with an absolute expiry of now + `ttl`,
    /// replacing any prior entry. Expired entries are swept on every write.
    ///
    /// A zero TTL or a disabled cache makes this a no-op.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + ?Sized,
    {
        if !self.enabled || ttl.is_zero() {
            return;
        }

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(key, %error, "skipping cache write for unserializable value");
                return;
            }
        };

        let mut store = self.inner.write().await;
        store.put(key.to_owned(), payload, ttl);
    }

    /// Number of stored entries. Expired entries are counted until a `get`
    /// on their key or the next `set` removes them.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn is_disabled(&self) -> bool {
        !self.enabled
    }

    #[cfg(test)]
    async fn put_raw(&self, key: &str, payload: &str, ttl: Duration) {
        let mut store = self.inner.write().await;
        store.put(key.to_owned(), payload.to_owned(), ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn keys_are_namespaced_and_case_normalized() {
        assert_eq!(cache_key("latest", &["usd"]), "fxgate:latest:USD");
        assert_eq!(
            cache_key("historical", &[" eur", "2024-01-01", "2024-01-31"]),
            "fxgate:historical:EUR:2024-01-01:2024-01-31"
        );
        assert_eq!(cache_key("currencies", &[]), "fxgate:currencies");
    }

    #[tokio::test]
    async fn test_cache_store_basic_operations() {
        let cache = CacheStore::new();
        let ttl = Duration::from_secs(60);

        // Cache miss
        assert!(cache.get::<String>("key1").await.is_none());

        // Set and get
        cache.set("key1", "value1", ttl).await;
        assert_eq!(cache.get::<String>("key1").await, Some(String::from("value1")));

        // Overwrite
        cache.set("key1", "value2", ttl).await;
        assert_eq!(cache.get::<String>("key1").await, Some(String::from("value2")));
    }

    #[tokio::test]
    async fn test_cache_round_trips_structured_values() {
        let cache = CacheStore::new();
        let mut value = BTreeMap::new();
        value.insert(String::from("USD"), String::from("United States Dollar"));

        cache.set("currencies", &value, Duration::from_secs(60)).await;
        let cached: Option<BTreeMap<String, String>> = cache.get("currencies").await;
        assert_eq!(cached, Some(value));
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = CacheStore::new();

        cache.set("key1", "value1", Duration::from_millis(100)).await;
        assert!(cache.get::<String>("key1").await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        // Should be expired
        assert!(cache.get::<String>("key1").await.is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_is_a_miss_and_evicts() {
        let cache = CacheStore::new();
        cache
            .put_raw("key1", "{not json", Duration::from_secs(60))
            .await;
        assert_eq!(cache.len().await, 1);

        assert!(cache.get::<BTreeMap<String, String>>("key1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_a_miss() {
        let cache = CacheStore::new();
        cache.set("key1", &vec![1, 2, 3], Duration::from_secs(60)).await;

        assert!(cache.get::<BTreeMap<String, String>>("key1").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_get() {
        let cache = CacheStore::new();
        cache.set("key1", "value1", Duration::from_millis(50)).await;
        assert_eq!(cache.len().await, 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get::<String>("key1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_entries_never_read_again() {
        let cache = CacheStore::new();
        cache.set("range-a", "a", Duration::from_millis(50)).await;
        cache.set("range-b", "b", Duration::from_millis(50)).await;
        assert_eq!(cache.len().await, 2);

        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.set("range-c", "c", Duration::from_secs(60)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get::<String>("range-c").await, Some(String::from("c")));
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let cache = CacheStore::disabled();

        assert!(cache.is_disabled());

        cache.set("key1", "value1", Duration::from_secs(60)).await;
        assert!(cache.get::<String>("key1").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = CacheStore::new();
        cache.set("key1", "value1", Duration::ZERO).await;
        assert!(cache.is_empty().await);
    }
}
