//! A bounded cache of decoded node bytes, fronting the block store.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// Default cache capacity, in entries, used when a [`crate::store::NodeStore`]
/// is built without an explicit override.
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// A bounded, thread-safe LRU cache from digest bytes to raw block bytes.
///
/// Caches bytes, not decoded [`prolly_types::Node`] values, so a single
/// implementation serves node, config, and root-descriptor reads alike.
pub struct NodeCache {
    inner: Mutex<LruCache<Vec<u8>, Vec<u8>>>,
}

impl NodeCache {
    /// A cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch a cached entry, promoting it to most-recently-used.
    pub fn get(&self, digest: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().get(digest).cloned()
    }

    /// Insert or refresh an entry, evicting the least-recently-used entry if
    /// the cache is at capacity.
    pub fn put(&self, digest: Vec<u8>, bytes: Vec<u8>) {
        self.inner.lock().put(digest, bytes);
    }

    /// Current number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = NodeCache::new(2);
        cache.put(vec![1], vec![9]);
        assert_eq!(cache.get(&[1]), Some(vec![9]));
    }

    #[test]
    fn evicts_least_recently_used_entry_at_capacity() {
        let cache = NodeCache::new(2);
        cache.put(vec![1], vec![1]);
        cache.put(vec![2], vec![2]);
        cache.get(&[1]);
        cache.put(vec![3], vec![3]);
        assert_eq!(cache.get(&[2]), None);
        assert_eq!(cache.get(&[1]), Some(vec![1]));
        assert_eq!(cache.get(&[3]), Some(vec![3]));
    }
}
