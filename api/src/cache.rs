//! TTL cache system for throttling and short-lived lookups. Each named
//! cache is a key-value store with string keys and JSON values; entries
//! expire after a configurable TTL. Access is thread-safe via `RwLock`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

/// Name of the cache used to throttle `resend verification email` requests.
pub const RESEND_VERIFICATION_CACHE: &str = "resend_verification";
pub const RESEND_VERIFICATION_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

struct TtlCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TtlCache {
    fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    fn get(&self, key: &str) -> Option<&Value> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(&entry.value)
        } else {
            None
        }
    }

    fn set(&mut self, key: String, value: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

/// Thread-safe container holding multiple named TTL caches, each with its
/// own TTL.
pub struct CacheStore {
    caches: RwLock<HashMap<String, TtlCache>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            caches: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register_cache(&self, name: &str, ttl: Duration) {
        let mut caches = self.caches.write().await;
        caches
            .entry(name.to_string())
            .or_insert_with(|| TtlCache::new(ttl));
    }

    pub async fn get(&self, cache_name: &str, key: &str) -> Option<Value> {
        let caches = self.caches.read().await;
        caches.get(cache_name).and_then(|c| c.get(key)).cloned()
    }

    pub async fn set(&self, cache_name: &str, key: String, value: Value) {
        let mut caches = self.caches.write().await;
        if let Some(cache) = caches.get_mut(cache_name) {
            cache.set(key, value);
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn create_default_cache() -> CacheStore {
    let store = CacheStore::new();
    store
        .register_cache(RESEND_VERIFICATION_CACHE, RESEND_VERIFICATION_TTL)
        .await;
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let store = CacheStore::new();
        store.register_cache("t", Duration::from_millis(20)).await;
        store.set("t", "k".to_string(), Value::from(1)).await;
        assert_eq!(store.get("t", "k").await, Some(Value::from(1)));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("t", "k").await, None);
    }
}
