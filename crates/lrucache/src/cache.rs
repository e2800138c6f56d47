//! LRU (Least Recently Used) cache implementation
//!
//! A hash table maps keys to [`EntryId`] handles in a [`RecencyList`]. The
//! table gives O(1) lookup, the list gives O(1) promotion and eviction.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use ahash::RandomState;

use crate::error::{Error, Result};
use crate::list::{EntryId, Iter, RecencyList, PREALLOC_LIMIT};

/// LRU cache with fixed capacity
pub struct LruCache<K, V, S = RandomState> {
    map: HashMap<K, EntryId, S>,
    list: RecencyList<K, V>,
    capacity: usize,
}

impl<K, V> LruCache<K, V, RandomState>
where
    K: Hash + Eq + Clone,
{
    /// Create a new LRU cache holding at most `capacity` entries
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` - `capacity` is 0
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_hasher(capacity, RandomState::new())
    }
}

impl<K, V, S> LruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Create a new LRU cache using `hasher` for the lookup table
    ///
    /// # Errors
    /// * `Error::InvalidCapacity` - `capacity` is 0
    pub fn with_hasher(capacity: usize, hasher: S) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        // One spare slot: a new entry is linked before the victim leaves.
        // Huge capacities reserve a bounded prefix and grow on demand.
        let reserve = capacity.saturating_add(1).min(PREALLOC_LIMIT);

        Ok(Self {
            map: HashMap::with_capacity_and_hasher(reserve, hasher),
            list: RecencyList::with_capacity(reserve),
            capacity,
        })
    }

    /// Get a value and mark it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.list.move_to_head(id);
        self.list.value(id)
    }

    /// Get a mutable value and mark it most recently used
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.list.move_to_head(id);
        self.list.value_mut(id)
    }

    /// Get a value without touching recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.map.get(key)?;
        self.list.value(id)
    }

    /// Check if a key is present without touching recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Insert or update a key-value pair
    ///
    /// Updating an existing key replaces its value and promotes it; it never
    /// evicts. Inserting a new key into a full cache evicts the least
    /// recently used entry, which is returned.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&id) = self.map.get(&key) {
            if let Some(slot) = self.list.value_mut(id) {
                *slot = value;
            }
            self.list.move_to_head(id);
            return None;
        }

        let id = self.list.alloc(key.clone(), value);
        self.list.insert_at_head(id);
        self.map.insert(key, id);

        if self.map.len() > self.capacity {
            self.evict()
        } else {
            None
        }
    }

    /// Remove a key from the cache
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.map.remove(key)?;
        self.list.unlink(id);
        self.list.release(id).map(|(_, value)| value)
    }

    /// The entry that the next over-capacity insert would evict
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.list.tail().and_then(|id| self.list.entry(id))
    }

    /// The most recently used entry
    pub fn peek_mru(&self) -> Option<(&K, &V)> {
        self.list.head().and_then(|id| self.list.entry(id))
    }

    /// Get the current size of the cache
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate `(key, value)` pairs from most to least recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.list.iter()
    }

    /// Iterate keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.list.iter().map(|(key, _)| key)
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.map.clear();
        self.list.clear();
    }

    /// Verify that table and list describe the same entries in a valid shape
    ///
    /// # Errors
    /// * `Error::Invariant` - describes the first inconsistency found
    pub fn check_invariants(&self) -> Result<()> {
        self.list.check_links()?;

        if self.map.len() != self.list.len() {
            return Err(Error::Invariant(format!(
                "table has {} entries, list has {}",
                self.map.len(),
                self.list.len()
            )));
        }

        if self.map.len() > self.capacity {
            return Err(Error::Invariant(format!(
                "{} entries exceed capacity {}",
                self.map.len(),
                self.capacity
            )));
        }

        for id in self.list.ids() {
            let key = self
                .list
                .key(id)
                .ok_or_else(|| Error::Invariant(format!("slot {} has no key", id.index())))?;
            if self.map.get(key) != Some(&id) {
                return Err(Error::Invariant(format!(
                    "slot {} is not registered under its key",
                    id.index()
                )));
            }
        }

        Ok(())
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let id = self.list.remove_tail()?;
        let (key, value) = self.list.release(id)?;
        self.map.remove(&key);
        Some((key, value))
    }
}

impl<K, V, S> fmt::Debug for LruCache<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("entries", &DebugEntries(&self.list))
            .finish()
    }
}

struct DebugEntries<'a, K, V>(&'a RecencyList<K, V>);

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for DebugEntries<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<'a, K, V, S> IntoIterator for &'a LruCache<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}
