//! Read-through caches in front of the on-disk indexes.
//!
//! Every cache implements [`Cache::get_or_load`]: the loader runs only on a
//! miss and its value is stored before it is returned. Loads are
//! single-flight per key: concurrent callers asking for the same missing key
//! wait for the one in-flight load and share its result, while different
//! keys load independently.
//!
//! Two policies are provided:
//!
//! - [`NoEvictCache`] keeps every loaded entry forever
//! - [`LruCache`] keeps at most `capacity` entries, evicting the least
//!   recently used
//!
//! Values are handed out as `Arc`s, so an eviction never pulls a value out
//! from under a reader that already holds it.

pub mod lru;
pub mod no_evict;

pub use self::lru::LruCache;
pub use self::no_evict::NoEvictCache;

use crate::error::{Error, Result};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key: the owning index's generation plus a term or document id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub generation: u64,
    pub id: u32,
}

impl CacheKey {
    pub fn new(generation: u64, id: u32) -> Self {
        Self { generation, id }
    }
}

/// Hit/miss/eviction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Loader invoked on a cache miss
pub type Loader<'a, V> = &'a mut dyn FnMut() -> Result<V>;

/// A policy-parameterized lookup cache
pub trait Cache<K, V>: Send + Sync {
    /// Return the cached value for `key`, running `loader` on a miss
    fn get_or_load(&self, key: &K, loader: Loader<'_, V>) -> Result<Arc<V>>;

    /// Whether a fully loaded value for `key` is present
    fn contains(&self, key: &K) -> bool;

    /// Number of loaded entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;

    /// Drop every entry; readers keep the values they already hold
    fn clear(&self);

    fn name(&self) -> &'static str;
}

/// Cache policy selection, injected into the indexes at open time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum CachePolicy {
    NoEvict,
    Lru { capacity: usize },
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Lru { capacity: 4096 }
    }
}

impl CachePolicy {
    /// Build a cache for this policy
    pub fn build<K, V>(&self) -> Result<Arc<dyn Cache<K, V>>>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let cache: Arc<dyn Cache<K, V>> = match *self {
            CachePolicy::NoEvict => Arc::new(NoEvictCache::new()),
            CachePolicy::Lru { capacity } => Arc::new(LruCache::new(capacity)?),
        };
        tracing::debug!("Using {} cache", cache.name());
        Ok(cache)
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            CachePolicy::Lru { capacity: 0 } => Err(Error::config(
                "cache.capacity",
                "LRU capacity must be greater than zero",
            )),
            _ => Ok(()),
        }
    }
}

/// Storage behind a [`SingleFlight`] cache: decides what is kept
pub(crate) trait EntryStore<K, V>: Send {
    /// Look up a value; a hit may refresh recency
    fn get(&mut self, key: &K) -> Option<Arc<V>>;

    /// Insert a freshly loaded value, returning how many entries were evicted
    fn insert(&mut self, key: K, value: Arc<V>) -> u64;

    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn clear(&mut self);
}

/// Slot shared by everyone waiting on one in-flight load
type Slot<V> = Arc<Mutex<Option<Arc<V>>>>;

struct FlightState<K, V, S> {
    store: S,
    in_flight: FxHashMap<K, Slot<V>>,
}

/// Single-flight read-through logic shared by all policies
pub(crate) struct SingleFlight<K, V, S> {
    state: Mutex<FlightState<K, V, S>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V, S> SingleFlight<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Send + Sync,
    S: EntryStore<K, V>,
{
    pub(crate) fn new(store: S) -> Self {
        Self {
            state: Mutex::new(FlightState {
                store,
                in_flight: FxHashMap::default(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub(crate) fn get_or_load(&self, key: &K, loader: Loader<'_, V>) -> Result<Arc<V>> {
        let slot = {
            let mut state = self.state.lock();
            if let Some(value) = state.store.get(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }
            Arc::clone(state.in_flight.entry(key.clone()).or_default())
        };

        // Lock order is always slot -> state; callers never hold state here.
        // Slot clones are only taken under the state lock, which keeps the
        // strong count exact while that lock is held.
        let mut pending = slot.lock();
        if let Some(value) = pending.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(value));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match loader() {
            Ok(value) => {
                let value = Arc::new(value);
                *pending = Some(Arc::clone(&value));

                let mut state = self.state.lock();
                let evicted = state.store.insert(key.clone(), Arc::clone(&value));
                if evicted > 0 {
                    self.evictions.fetch_add(evicted, Ordering::Relaxed);
                }
                remove_slot(&mut state.in_flight, key, &slot);
                Ok(value)
            }
            Err(e) => {
                // Queued waiters retry under this slot, so it stays registered
                // until the last of them is done
                let mut state = self.state.lock();
                if Arc::strong_count(&slot) <= 2 {
                    remove_slot(&mut state.in_flight, key, &slot);
                }
                Err(e)
            }
        }
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.state.lock().store.contains(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn clear(&self) {
        self.state.lock().store.clear();
    }
}

fn remove_slot<K: Hash + Eq, V>(in_flight: &mut FxHashMap<K, Slot<V>>, key: &K, slot: &Slot<V>) {
    if in_flight.get(key).is_some_and(|s| Arc::ptr_eq(s, slot)) {
        in_flight.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn caches() -> Vec<Arc<dyn Cache<u32, String>>> {
        vec![
            CachePolicy::NoEvict.build().unwrap(),
            CachePolicy::Lru { capacity: 8 }.build().unwrap(),
        ]
    }

    #[test]
    fn test_loader_runs_once_per_key() {
        for cache in caches() {
            let calls = AtomicUsize::new(0);
            for _ in 0..3 {
                let value = cache
                    .get_or_load(&1, &mut || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok("one".to_string())
                    })
                    .unwrap();
                assert_eq!(value.as_str(), "one");
            }
            assert_eq!(calls.load(Ordering::SeqCst), 1, "{}", cache.name());
            assert_eq!(cache.stats().misses, 1);
            assert_eq!(cache.stats().hits, 2);
        }
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        for cache in caches() {
            let err = cache.get_or_load(&5, &mut || Err(Error::build("boom")));
            assert!(err.is_err());
            assert!(!cache.contains(&5));
            let value = cache.get_or_load(&5, &mut || Ok("five".to_string())).unwrap();
            assert_eq!(value.as_str(), "five");
            assert!(cache.contains(&5));
        }
    }

    #[test]
    fn test_concurrent_same_key_single_load() {
        for cache in caches() {
            let calls = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(8));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let calls = Arc::clone(&calls);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        cache
                            .get_or_load(&42, &mut || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(50));
                                Ok("answer".to_string())
                            })
                            .unwrap()
                    })
                })
                .collect();

            for handle in handles {
                assert_eq!(handle.join().unwrap().as_str(), "answer");
            }
            assert_eq!(calls.load(Ordering::SeqCst), 1, "{}", cache.name());
        }
    }

    #[test]
    fn test_retry_after_failed_load_stays_single_flight() {
        for cache in caches() {
            let calls = Arc::new(AtomicUsize::new(0));
            let active = Arc::new(AtomicUsize::new(0));
            let max_active = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = [(0u64, true), (50, false), (300, false)]
                .into_iter()
                .map(|(delay, fail)| {
                    let cache = Arc::clone(&cache);
                    let calls = Arc::clone(&calls);
                    let active = Arc::clone(&active);
                    let max_active = Arc::clone(&max_active);
                    thread::spawn(move || {
                        thread::sleep(Duration::from_millis(delay));
                        cache.get_or_load(&1, &mut || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            max_active.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(if fail { 200 } else { 150 }));
                            active.fetch_sub(1, Ordering::SeqCst);
                            if fail {
                                Err(Error::build("first load fails"))
                            } else {
                                Ok("retried".to_string())
                            }
                        })
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert!(results[0].is_err());
            assert_eq!(results[1].as_ref().unwrap().as_str(), "retried");
            assert!(Arc::ptr_eq(
                results[1].as_ref().unwrap(),
                results[2].as_ref().unwrap()
            ));
            assert_eq!(max_active.load(Ordering::SeqCst), 1, "{}", cache.name());
            assert_eq!(calls.load(Ordering::SeqCst), 2, "{}", cache.name());
        }
    }

    #[test]
    fn test_clear_keeps_held_values() {
        for cache in caches() {
            let held = cache.get_or_load(&1, &mut || Ok("kept".to_string())).unwrap();
            cache.clear();
            assert!(cache.is_empty());
            assert_eq!(held.as_str(), "kept");
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let policy = CachePolicy::Lru { capacity: 0 };
        assert!(policy.validate().is_err());
        assert!(policy.build::<u32, String>().is_err());
    }

    #[test]
    fn test_policy_from_json() {
        let policy: CachePolicy =
            serde_json::from_str(r#"{"policy":"lru","capacity":16}"#).unwrap();
        assert_eq!(policy, CachePolicy::Lru { capacity: 16 });
        let policy: CachePolicy = serde_json::from_str(r#"{"policy":"no-evict"}"#).unwrap();
        assert_eq!(policy, CachePolicy::NoEvict);
    }
}
