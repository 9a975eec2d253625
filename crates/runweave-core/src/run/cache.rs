//! Count- and byte-bounded LRU cache.
//!
//! The loader's working set mixes tiny leaf subroutines with very large
//! graph payloads, so a count limit alone would let a handful of huge
//! objects dominate memory and a byte limit alone would let thousands of
//! small ones accumulate. [`BoundedCache`] enforces both: eviction pops
//! least-recently-used entries until the two limits hold, whichever is hit
//! first. Both `get` and `insert` count as use.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Size contract for cached values.
///
/// For version objects this is the serialized JSON length, so the byte
/// budget tracks what the object would cost to persist or re-fetch.
pub trait ByteSized {
    fn byte_size(&self) -> usize;
}

/// An ordered map with a maximum entry count and a maximum cumulative byte
/// size, evicting least-recently-used entries.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    map: HashMap<K, V>,
    /// Recency order, least-recently-used first.
    order: VecDeque<K>,
    max_entries: usize,
    max_bytes: usize,
    current_bytes: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: ByteSized,
{
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
            max_bytes,
            current_bytes: 0,
        }
    }

    /// Look up a value, marking it most-recently-used on hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }
        self.map.get(key)
    }

    /// Look up a value without affecting recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Insert or replace a value, marking it most-recently-used, then
    /// evict least-recently-used entries until both limits hold.
    ///
    /// A value whose own size exceeds the byte budget is not cached at
    /// all -- admitting it would evict the entire working set only to be
    /// evicted itself. Any existing entry under the key is still removed,
    /// so a stale version is never served.
    pub fn insert(&mut self, key: K, value: V) {
        let size = value.byte_size();

        if let Some(old) = self.map.remove(&key) {
            self.current_bytes -= old.byte_size();
            self.order.retain(|k| k != &key);
        }

        if size > self.max_bytes {
            tracing::debug!(
                size,
                max_bytes = self.max_bytes,
                "value exceeds cache byte budget, not caching"
            );
            return;
        }

        self.current_bytes += size;
        self.order.push_back(key.clone());
        self.map.insert(key, value);
        self.evict_to_limits();
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        self.current_bytes -= value.byte_size();
        self.order.retain(|k| k != key);
        Some(value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Cumulative size of resident values.
    pub fn current_bytes(&self) -> usize {
        self.current_bytes
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
        self.current_bytes = 0;
    }

    /// Entries in recency order, least-recently-used first.
    ///
    /// Re-inserting them in this order into a fresh cache reproduces the
    /// recency state, which is what snapshot/restore relies on.
    pub fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().filter_map(|k| self.map.get(k).map(|v| (k, v)))
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }

    fn evict_to_limits(&mut self) {
        while self.map.len() > self.max_entries || self.current_bytes > self.max_bytes {
            let Some(victim) = self.order.pop_front() else {
                break;
            };
            if let Some(value) = self.map.remove(&victim) {
                self.current_bytes -= value.byte_size();
                tracing::trace!("evicted least-recently-used cache entry");
            }
        }
    }
}
