//! # Toolgate Caching
//!
//! The generic KV layer backing the hot tier of the tool cache. One trait,
//! one in-memory TTL store; the trait boundary keeps an external store
//! (Redis and friends) pluggable without touching callers.

pub mod cache;
pub mod errors;
pub mod stores;

pub use cache::{CacheKey, CacheValue, KvCache};
pub use errors::{CacheError, CacheResult};
pub use stores::TtlCache;

/// Create the default in-memory TTL cache
pub fn create_default_cache<K, V>(default_ttl: std::time::Duration) -> TtlCache<K, V>
where
    K: CacheKey + 'static,
    V: CacheValue + 'static,
{
    TtlCache::new(default_ttl)
}
