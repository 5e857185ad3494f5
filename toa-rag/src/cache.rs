//! Bounded memoisation of query answers.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

/// A least-recently-used cache keyed by normalised query text.
///
/// Holds at most `capacity` entries; inserting beyond that evicts the entry
/// that was read or written longest ago. A capacity of zero yields no
/// cache at all (see [`QueryCache::new`]).
pub struct QueryCache<V> {
    entries: Mutex<LruCache<String, V>>,
}

impl<V: Clone> QueryCache<V> {
    /// Create a cache, or `None` when `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity)
            .map(|capacity| Self { entries: Mutex::new(LruCache::new(capacity)) })
    }

    fn key(query: &str) -> String {
        query.trim().to_string()
    }

    /// Look up a cached value, marking it as recently used.
    pub async fn get(&self, query: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        let hit = entries.get(&Self::key(query)).cloned();
        debug!(hit = hit.is_some(), "answer cache lookup");
        hit
    }

    /// Store a value, evicting the least recently used entry at capacity.
    pub async fn put(&self, query: &str, value: V) {
        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(Self::key(query), value) {
            debug!(evicted = %evicted, "answer cache entry replaced or evicted");
        }
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Maximum number of entries.
    pub async fn capacity(&self) -> usize {
        self.entries.lock().await.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_disables_cache() {
        assert!(QueryCache::<String>::new(0).is_none());
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = QueryCache::new(2).unwrap();
        cache.put("a", 1).await;
        cache.put("b", 2).await;
        assert_eq!(cache.get("a").await, Some(1));
        cache.put("c", 3).await;
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get("c").await, Some(3));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn keys_ignore_surrounding_whitespace() {
        let cache = QueryCache::new(4).unwrap();
        cache.put("  salvage law ", "answer".to_string()).await;
        assert_eq!(cache.get("salvage law").await.as_deref(), Some("answer"));
    }
}
