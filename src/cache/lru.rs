use super::{Cache, CacheStats, EntryStore, Loader, SingleFlight};
use crate::error::{Error, Result};
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

struct LruStore<K: Hash + Eq, V> {
    entries: lru::LruCache<K, Arc<V>>,
}

impl<K, V> EntryStore<K, V> for LruStore<K, V>
where
    K: Hash + Eq + Send,
    V: Send + Sync,
{
    fn get(&mut self, key: &K) -> Option<Arc<V>> {
        // `get` moves the entry to the most recently used position
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: Arc<V>) -> u64 {
        if self.entries.contains(&key) {
            self.entries.put(key, value);
            return 0;
        }
        // Pushing an absent key only returns an entry when one was evicted
        match self.entries.push(key, value) {
            Some(_) => 1,
            None => 0,
        }
    }

    fn contains(&self, key: &K) -> bool {
        // `contains` does not touch recency
        self.entries.contains(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Bounded cache holding at most `capacity` entries.
///
/// Inserting past capacity evicts the least recently used entry; a hit
/// refreshes recency. Recency bookkeeping sits behind a single mutex.
pub struct LruCache<K: Hash + Eq, V> {
    capacity: usize,
    inner: SingleFlight<K, V, LruStore<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Send + Sync,
{
    pub fn new(capacity: usize) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity).ok_or_else(|| {
            Error::config("cache.capacity", "LRU capacity must be greater than zero")
        })?;
        Ok(Self {
            capacity,
            inner: SingleFlight::new(LruStore {
                entries: lru::LruCache::new(cap),
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    fn get_or_load(&self, key: &K, loader: Loader<'_, V>) -> Result<Arc<V>> {
        self.inner.get_or_load(key, loader)
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    fn clear(&self) {
        self.inner.clear()
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}
