//! Core cache trait and entry types

use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::CacheResult;

/// Trait for types that can be used as cache keys
pub trait CacheKey: Clone + Eq + Hash + Debug + Send + Sync {}

/// Trait for types that can be cached
pub trait CacheValue: Clone + Debug + Send + Sync {}

// Blanket implementations
impl<T> CacheKey for T where T: Clone + Eq + Hash + Debug + Send + Sync {}
impl<T> CacheValue for T where T: Clone + Debug + Send + Sync {}

/// Get/Set/Delete cache with per-entry TTL
#[async_trait]
pub trait KvCache<K: CacheKey + 'static, V: CacheValue + 'static>: Send + Sync {
    /// Get a value; expired entries read as absent
    async fn get(&self, key: &K) -> CacheResult<Option<V>>;

    /// Set a value with a TTL
    async fn set(&self, key: K, value: V, ttl: Duration) -> CacheResult<()>;

    /// Delete a value
    async fn delete(&self, key: &K) -> CacheResult<()>;

    /// Clear all entries
    async fn clear(&self) -> CacheResult<()>;

    /// Number of live entries
    async fn len(&self) -> CacheResult<usize>;

    /// Check if cache is empty
    async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Cache entry with expiry metadata
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl<V: CacheValue> CacheEntry<V> {
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}
