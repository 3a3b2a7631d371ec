//! In-memory TTL cache for rendered pages.
//!
//! DESIGN
//! ======
//! A thin wrapper over `moka::future::Cache` with both a time-to-live and a
//! capacity bound, so no key pattern can grow it past `capacity` entries.
//! Keys are resolved page numbers, never raw query text. A zero TTL turns
//! the cache off instead of building a cache that drops everything.
//!
//! TRADE-OFFS
//! ==========
//! There is no invalidation on write. A new post shows up on the index once
//! the entry for that page expires, which bounds staleness by the TTL.

use std::hash::Hash;
use std::time::Duration;

use moka::future::Cache;

/// Entries kept for the index listing. Pages past this are fetched uncached.
pub const DEFAULT_CAPACITY: u64 = 256;

#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Option<Cache<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// A zero `ttl` disables caching entirely.
    #[must_use]
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let inner = (!ttl.is_zero()).then(|| Cache::builder().max_capacity(capacity).time_to_live(ttl).build());
        Self { inner }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.as_ref()?.get(key).await
    }

    pub async fn insert(&self, key: K, value: V) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value).await;
        }
    }

    /// Approximate until pending maintenance has run.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.as_ref().map_or(0, Cache::entry_count)
    }

    /// Apply queued evictions and expirations now.
    pub async fn run_pending_tasks(&self) {
        if let Some(cache) = &self.inner {
            cache.run_pending_tasks().await;
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
