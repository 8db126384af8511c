use super::{Cache, CacheStats, EntryStore, Loader, SingleFlight};
use crate::error::Result;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use std::sync::Arc;

struct NoEvictStore<K, V> {
    entries: FxHashMap<K, Arc<V>>,
}

impl<K, V> EntryStore<K, V> for NoEvictStore<K, V>
where
    K: Hash + Eq + Send,
    V: Send + Sync,
{
    fn get(&mut self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: Arc<V>) -> u64 {
        self.entries.insert(key, value);
        0
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Unbounded cache: every loaded entry is retained until [`Cache::clear`].
///
/// Memory grows with the number of distinct keys accessed, so this is meant
/// for small corpora and tests.
pub struct NoEvictCache<K, V> {
    inner: SingleFlight<K, V, NoEvictStore<K, V>>,
}

impl<K, V> NoEvictCache<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: SingleFlight::new(NoEvictStore {
                entries: FxHashMap::default(),
            }),
        }
    }
}

impl<K, V> Default for NoEvictCache<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V> for NoEvictCache<K, V>
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
        "no-evict"
    }
}
