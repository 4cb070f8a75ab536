//! Capacity-bounded map with least-recently-used eviction.
//!
//! Entries live in a hash map arena; a second ordered index maps an
//! ever-increasing access tick to the key, so the oldest tick is always the
//! eviction candidate. Every read or write through [`BoundedPeerMap::get`] or
//! [`BoundedPeerMap::get_or_insert_with`] moves the key to the newest tick.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    tick: u64,
}

#[derive(Debug, Clone)]
pub struct BoundedPeerMap<K, V> {
    capacity: usize,
    next_tick: u64,
    entries: HashMap<K, Slot<V>>,
    recency: BTreeMap<u64, K>,
}

impl<K, V> BoundedPeerMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_tick: 0,
            entries: HashMap::new(),
            recency: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.bump();
        let slot = self.entries.get_mut(key)?;
        self.recency.remove(&slot.tick);
        slot.tick = tick;
        self.recency.insert(tick, key.clone());
        Some(&slot.value)
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Fetch or create the entry for `key` and mark it most recently used.
    ///
    /// When a new key does not fit, the least recently used entry is removed
    /// first and handed back alongside the value.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> (&mut V, Option<(K, V)>)
    where
        F: FnOnce() -> V,
    {
        let tick = self.bump();
        let mut evicted = None;

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            evicted = self.pop_oldest();
        }

        let slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Slot { value: make(), tick });
        if slot.tick != tick {
            self.recency.remove(&slot.tick);
            slot.tick = tick;
        }
        self.recency.insert(tick, key);

        (&mut slot.value, evicted)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot.value)
    }

    fn pop_oldest(&mut self) -> Option<(K, V)> {
        let (_, key) = self.recency.pop_first()?;
        let slot = self.entries.remove(&key)?;
        Some((key, slot.value))
    }

    /// Entries from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.recency
            .values()
            .rev()
            .filter_map(move |key| self.entries.get_key_value(key).map(|(k, slot)| (k, &slot.value)))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}
