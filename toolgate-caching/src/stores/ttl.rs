//! Time-based TTL cache implementation

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    cache::{CacheEntry, CacheKey, CacheValue, KvCache},
    CacheResult,
};

/// In-memory TTL cache
pub struct TtlCache<K, V> {
    /// TTL applied when a caller has no better idea
    default_ttl: Duration,

    store: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
}

impl<K: CacheKey + 'static, V: CacheValue + 'static> TtlCache<K, V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Drop expired entries, returning how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write();
        let expired: Vec<K> = store
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            store.remove(key);
        }
        expired.len()
    }

    /// Start a background cleanup task
    pub fn start_cleanup_task(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }
}

#[async_trait]
impl<K: CacheKey + 'static, V: CacheValue + 'static> KvCache<K, V> for TtlCache<K, V> {
    async fn get(&self, key: &K) -> CacheResult<Option<V>> {
        let result = {
            let store = self.store.read();
            match store.get(key) {
                Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
                _ => None,
            }
        };
        Ok(result)
    }

    async fn set(&self, key: K, value: V, ttl: Duration) -> CacheResult<()> {
        let mut store = self.store.write();
        store.insert(key, CacheEntry::with_ttl(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &K) -> CacheResult<()> {
        let mut store = self.store.write();
        store.remove(key);
        Ok(())
    }

    async fn clear(&self) -> CacheResult<()> {
        self.store.write().clear();
        Ok(())
    }

    async fn len(&self) -> CacheResult<usize> {
        let store = self.store.read();
        Ok(store.values().filter(|entry| !entry.is_expired()).count())
    }
}
