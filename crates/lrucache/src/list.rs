//! Recency list: an arena-backed doubly linked list bounded by sentinels.
//!
//! Entries live in a `Vec` of nodes and link to each other by index. Slots
//! 0 and 1 are the head and tail sentinels; they carry no entry, are never
//! unlinked and never counted in `len`. Because every linked entry always
//! has a neighbour on both sides, splicing never special-cases an empty
//! list.
//!
//! ```text
//!   [HEAD] <-> [MRU] <-> ... <-> [LRU] <-> [TAIL]
//!   slot 0                                  slot 1
//! ```
//!
//! Freed slots are recycled through a free list, so an `EntryId` is only
//! meaningful until the entry it names is released.

use crate::error::{Error, Result};

const HEAD: usize = 0;
const TAIL: usize = 1;

/// Link value of an entry that is not currently in the list
const DETACHED: usize = usize::MAX;

/// Upper bound on slots reserved up front; the arena grows past it on demand
pub(crate) const PREALLOC_LIMIT: usize = 4096;

/// Stable handle to an entry slot in a [`RecencyList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

impl EntryId {
    /// Raw slot index, useful in diagnostics
    pub fn index(self) -> usize {
        self.0
    }
}

struct Entry<K, V> {
    key: K,
    value: V,
}

struct Node<K, V> {
    /// `None` for sentinels and for free slots
    entry: Option<Entry<K, V>>,
    prev: usize,
    next: usize,
}

impl<K, V> Node<K, V> {
    fn sentinel(prev: usize, next: usize) -> Self {
        Self {
            entry: None,
            prev,
            next,
        }
    }
}

/// Doubly linked list of key/value entries ordered from most to least
/// recently used
pub struct RecencyList<K, V> {
    nodes: Vec<Node<K, V>>,
    free_list: Vec<usize>,
    len: usize,
}

impl<K, V> RecencyList<K, V> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty list with room for `capacity` entries
    ///
    /// At most `PREALLOC_LIMIT` entries are reserved; larger lists grow as
    /// entries arrive.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.min(PREALLOC_LIMIT) + 2);
        nodes.push(Node::sentinel(DETACHED, TAIL));
        nodes.push(Node::sentinel(HEAD, DETACHED));

        Self {
            nodes,
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Number of linked entries (sentinels excluded)
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if no entries are linked
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a new entry in the arena without linking it
    pub fn alloc(&mut self, key: K, value: V) -> EntryId {
        let node = Node {
            entry: Some(Entry { key, value }),
            prev: DETACHED,
            next: DETACHED,
        };

        match self.free_list.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                EntryId(idx)
            }
            None => {
                self.nodes.push(node);
                EntryId(self.nodes.len() - 1)
            }
        }
    }

    /// Take a detached entry out of the arena and recycle its slot
    ///
    /// Returns `None` if `id` is linked or holds no entry.
    pub fn release(&mut self, id: EntryId) -> Option<(K, V)> {
        if !self.is_detached(id) {
            return None;
        }
        let entry = self.nodes.get_mut(id.0)?.entry.take()?;
        self.free_list.push(id.0);
        Some((entry.key, entry.value))
    }

    /// Splice `id` immediately after the head sentinel
    ///
    /// Returns `false` and leaves the list untouched unless `id` holds a
    /// detached entry.
    pub fn insert_at_head(&mut self, id: EntryId) -> bool {
        if !self.is_detached(id) {
            return false;
        }
        let idx = id.0;
        let first = self.nodes[HEAD].next;

        self.nodes[idx].prev = HEAD;
        self.nodes[idx].next = first;
        self.nodes[first].prev = idx;
        self.nodes[HEAD].next = idx;

        self.len += 1;
        true
    }

    /// Remove `id` from wherever it sits by joining its neighbours
    ///
    /// Its own links are cleared afterwards. Returns `false` and leaves the
    /// list untouched if `id` is not linked.
    pub fn unlink(&mut self, id: EntryId) -> bool {
        if !self.is_linked(id) {
            return false;
        }
        let idx = id.0;
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;

        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        self.nodes[idx].prev = DETACHED;
        self.nodes[idx].next = DETACHED;

        self.len -= 1;
        true
    }

    /// Unlink and return the entry just before the tail sentinel
    pub fn remove_tail(&mut self) -> Option<EntryId> {
        let id = self.tail()?;
        self.unlink(id);
        Some(id)
    }

    /// Promote a linked entry to the head; `false` if `id` is not linked
    pub fn move_to_head(&mut self, id: EntryId) -> bool {
        if !self.is_linked(id) {
            return false;
        }
        if self.nodes[HEAD].next == id.0 {
            return true; // Already at front
        }

        self.unlink(id) && self.insert_at_head(id)
    }

    /// Most recently used entry
    pub fn head(&self) -> Option<EntryId> {
        let idx = self.nodes[HEAD].next;
        (idx != TAIL).then_some(EntryId(idx))
    }

    /// Least recently used entry
    pub fn tail(&self) -> Option<EntryId> {
        let idx = self.nodes[TAIL].prev;
        (idx != HEAD).then_some(EntryId(idx))
    }

    /// Key stored at `id`
    pub fn key(&self, id: EntryId) -> Option<&K> {
        self.entry(id).map(|(key, _)| key)
    }

    /// Value stored at `id`
    pub fn value(&self, id: EntryId) -> Option<&V> {
        self.entry(id).map(|(_, value)| value)
    }

    /// Mutable value stored at `id`
    pub fn value_mut(&mut self, id: EntryId) -> Option<&mut V> {
        self.nodes
            .get_mut(id.0)
            .and_then(|node| node.entry.as_mut())
            .map(|entry| &mut entry.value)
    }

    /// Key and value stored at `id`
    pub fn entry(&self, id: EntryId) -> Option<(&K, &V)> {
        self.nodes
            .get(id.0)
            .and_then(|node| node.entry.as_ref())
            .map(|entry| (&entry.key, &entry.value))
    }

    /// Check whether `id` is currently spliced into the list
    pub fn is_linked(&self, id: EntryId) -> bool {
        id.0 > TAIL
            && self
                .nodes
                .get(id.0)
                .is_some_and(|node| node.entry.is_some() && node.prev != DETACHED)
    }

    fn is_detached(&self, id: EntryId) -> bool {
        id.0 > TAIL
            && self
                .nodes
                .get(id.0)
                .is_some_and(|node| node.entry.is_some() && node.prev == DETACHED)
    }

    /// Iterate from most to least recently used
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            current: self.nodes[HEAD].next,
            remaining: self.len,
        }
    }

    /// Iterate handles from most to least recently used
    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        let mut current = self.nodes[HEAD].next;
        std::iter::from_fn(move || {
            if current == TAIL || current == DETACHED {
                return None;
            }
            let id = EntryId(current);
            current = self.nodes[current].next;
            Some(id)
        })
    }

    /// Drop every entry; the sentinels are reset to point at each other
    pub fn clear(&mut self) {
        self.nodes.truncate(2);
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.free_list.clear();
        self.len = 0;
    }

    /// Walk the list in both directions and verify its shape
    pub fn check_links(&self) -> Result<()> {
        if self.nodes[HEAD].entry.is_some() || self.nodes[TAIL].entry.is_some() {
            return Err(Error::Invariant("sentinel holds an entry".to_string()));
        }

        let mut forward = 0;
        let mut prev = HEAD;
        let mut current = self.nodes[HEAD].next;
        while current != TAIL {
            if current == DETACHED || current >= self.nodes.len() {
                return Err(Error::Invariant(format!(
                    "broken next link after slot {}",
                    prev
                )));
            }
            let node = &self.nodes[current];
            if node.entry.is_none() {
                return Err(Error::Invariant(format!(
                    "slot {} is linked but holds no entry",
                    current
                )));
            }
            if node.prev != prev {
                return Err(Error::Invariant(format!(
                    "slot {} has prev {} but was reached from {}",
                    current, node.prev, prev
                )));
            }
            forward += 1;
            if forward > self.len {
                return Err(Error::Invariant("list is longer than its length".to_string()));
            }
            prev = current;
            current = node.next;
        }

        if self.nodes[TAIL].prev != prev {
            return Err(Error::Invariant(format!(
                "tail sentinel points at {} instead of {}",
                self.nodes[TAIL].prev, prev
            )));
        }

        if forward != self.len {
            return Err(Error::Invariant(format!(
                "walked {} entries, length is {}",
                forward, self.len
            )));
        }

        Ok(())
    }
}

impl<K, V> Default for RecencyList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(key, value)` pairs from most to least recently used
pub struct Iter<'a, K, V> {
    list: &'a RecencyList<K, V>,
    current: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == TAIL || self.remaining == 0 {
            return None;
        }

        let list = self.list;
        let node = &list.nodes[self.current];
        self.current = node.next;
        self.remaining -= 1;
        node.entry.as_ref().map(|entry| (&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
