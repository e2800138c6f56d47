//! SharedLruCache: an LruCache behind a single lock
//!
//! Both `get` and `put` reorder the recency list, so reads need exclusive
//! access too. One `Mutex` guards the table and the list together.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};

use ahash::RandomState;
use parking_lot::Mutex;

use crate::cache::LruCache;
use crate::error::Result;

/// Thread-safe LRU cache with coarse-grained locking
pub struct SharedLruCache<K, V, S = RandomState> {
    inner: Mutex<LruCache<K, V, S>>,

    /// Cached so that `capacity()` does not take the lock
    capacity: usize,
}

impl<K, V> SharedLruCache<K, V, RandomState>
where
    K: Hash + Eq + Clone,
{
    /// Create a new shared cache holding at most `capacity` entries
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` - `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self::from_cache(LruCache::new(capacity)?))
    }
}

impl<K, V, S> SharedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Wrap an existing cache
    pub fn from_cache(cache: LruCache<K, V, S>) -> Self {
        let capacity = cache.capacity();
        Self {
            inner: Mutex::new(cache),
            capacity,
        }
    }

    /// Get a copy of a value and mark it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or update a key-value pair, returning the evicted entry
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        self.inner.lock().put(key, value)
    }

    /// Remove a key from the cache
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    /// Check if a key is present without touching recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains(key)
    }

    /// Get the current size of the cache
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Run several operations under one lock acquisition
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut LruCache<K, V, S>) -> R) -> R {
        let mut cache = self.inner.lock();
        f(&mut cache)
    }

    /// Unwrap into the inner cache
    pub fn into_inner(self) -> LruCache<K, V, S> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_shared_basic() {
        let cache = SharedLruCache::new(2).unwrap();

        cache.put(1, "a".to_string());
        cache.put(2, "b".to_string());

        assert_eq!(cache.get(&1), Some("a".to_string()));
        assert_eq!(cache.put(3, "c".to_string()), Some((2, "b".to_string())));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&2));
    }

    #[test]
    fn test_shared_zero_capacity() {
        assert!(SharedLruCache::<u32, u32>::new(0).is_err());
    }

    #[test]
    fn test_with_lock_compound() {
        let cache = SharedLruCache::new(3).unwrap();

        cache.with_lock(|c| {
            c.put(1, 10);
            c.put(2, 20);
        });

        let order: Vec<i32> = cache.with_lock(|c| c.keys().copied().collect());
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = SharedLruCache::new(3).unwrap();

        cache.put("a", 1);
        cache.put("b", 2);

        assert_eq!(cache.remove("a"), Some(1));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_concurrent_access_keeps_invariants() {
        let cache = Arc::new(SharedLruCache::new(16).unwrap());

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..1_000u64 {
                        let key = (t * 31 + i) % 64;
                        if i % 3 == 0 {
                            cache.get(&key);
                        } else {
                            cache.put(key, i);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 16);
        let cache = Arc::try_unwrap(cache).ok().unwrap().into_inner();
        cache.check_invariants().unwrap();
    }
}
