use indexmap::IndexMap;
use std::hash::Hash;

/// Unbounded insertion-ordered map with no eviction.
#[derive(Debug, Clone)]
pub struct OrderedStore<K, V> {
    entries: IndexMap<K, V>,
}

impl<K: Hash + Eq, V> OrderedStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces the value for `key`.
    ///
    /// A replaced key keeps its original position.
    pub fn put(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &K) -> bool {
        // shift_remove keeps the order of the remaining entries.
        self.entries.shift_remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.entries.iter()
    }
}

impl<K: Hash + Eq, V> Default for OrderedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
