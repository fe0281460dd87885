use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;

use tracing::trace;

use crate::utils::{forget_key, mark_recent};

/// A fixed-capacity map with least-recently-used eviction.
///
/// Both [`get`](BoundedMap::get) and [`set`](BoundedMap::set) count as a use. Inserting
/// a key that is not yet present into a full map first evicts the entry whose last use
/// is the oldest; re-setting a present key never evicts and only refreshes its recency.
/// `len()` never exceeds `capacity()`.
///
/// Recency is tracked in a `VecDeque` with the least recently used key at the front.
///
/// # Examples
///
/// ```
/// use memora_core::BoundedMap;
///
/// let mut map = BoundedMap::new(2);
/// map.set("a", 1);
/// map.set("b", 2);
///
/// // "a" becomes the most recently used entry
/// assert_eq!(map.get(&"a"), Some(&1));
///
/// // so inserting "c" evicts "b"
/// assert_eq!(map.set("c", 3), Some(("b", 2)));
/// assert_eq!(map.len(), 2);
/// ```
pub struct BoundedMap<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> BoundedMap<K, V> {
    /// Creates an empty map holding at most `capacity` entries.
    ///
    /// A capacity of zero is accepted: such a map never retains anything.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Looks a key up and marks it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            mark_recent(&mut self.order, key);
        }
        self.map.get(key)
    }

    /// Looks a key up, returning `default` when it is absent. Never fails for absent keys.
    pub fn get_or<'a>(&'a mut self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Looks a key up without touching its recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or updates an entry and marks it as most recently used.
    ///
    /// Returns the entry evicted to make room, if any. With a capacity of zero the new
    /// entry itself is returned, since it cannot be retained.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.map.get_mut(&key) {
            *slot = value;
            mark_recent(&mut self.order, &key);
            return None;
        }

        if self.capacity == 0 {
            return Some((key, value));
        }

        let evicted = if self.map.len() >= self.capacity {
            self.evict_least_recently_used()
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.map.insert(key, value);
        evicted
    }

    /// Removes an entry. A no-op for absent keys.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        forget_key(&mut self.order, key);
        Some(value)
    }

    /// Iterates from the least to the most recently used entry.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order
            .iter()
            .filter_map(move |key| self.map.get_key_value(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn evict_least_recently_used(&mut self) -> Option<(K, V)> {
        while let Some(evict_key) = self.order.pop_front() {
            if let Some(value) = self.map.remove(&evict_key) {
                trace!(len = self.map.len(), "evicted least recently used entry");
                return Some((evict_key, value));
            }
        }
        None
    }
}

impl<K, V> PartialEq<HashMap<K, V>> for BoundedMap<K, V>
where
    K: Hash + Eq,
    V: PartialEq,
{
    fn eq(&self, other: &HashMap<K, V>) -> bool {
        self.map == *other
    }
}

impl<K, V> PartialEq for BoundedMap<K, V>
where
    K: Hash + Eq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.map == other.map
    }
}

impl<K: fmt::Debug + Hash + Eq + Clone, V: fmt::Debug> fmt::Debug for BoundedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_is_empty() {
        let map: BoundedMap<u32, u32> = BoundedMap::new(3);
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 3);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut map = BoundedMap::new(2);
        map.set(1, "one");
        map.set(2, "two");
        assert_eq!(map.set(3, "three"), Some((1, "one")));
        assert!(!map.contains_key(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut map = BoundedMap::new(2);
        map.set(1, 'a');
        map.set(2, 'b');
        assert_eq!(map.get(&1), Some(&'a'));
        assert_eq!(map.set(3, 'c'), Some((2, 'b')));
        assert!(map.contains_key(&1));
    }

    #[test]
    fn test_peek_does_not_refresh_recency() {
        let mut map = BoundedMap::new(2);
        map.set(1, 'a');
        map.set(2, 'b');
        assert_eq!(map.peek(&1), Some(&'a'));
        assert_eq!(map.set(3, 'c'), Some((1, 'a')));
    }

    #[test]
    fn test_reset_at_capacity_does_not_evict() {
        let mut map = BoundedMap::new(2);
        map.set(1, 10);
        map.set(2, 20);
        assert_eq!(map.set(1, 11), None);
        assert_eq!(map.len(), 2);
        assert_eq!(map.peek(&1), Some(&11));

        // the re-set refreshed key 1, so key 2 is now the oldest
        assert_eq!(map.set(3, 30), Some((2, 20)));
    }

    #[test]
    fn test_keys_k1_k1_k2_k2_k3() {
        let mut map = BoundedMap::new(2);
        for key in ["k1", "k1", "k2", "k2", "k3"] {
            if map.get(&key).is_none() {
                map.set(key, key.len());
            }
        }
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec!["k2", "k3"]);
    }

    #[test]
    fn test_zero_capacity_retains_nothing() {
        let mut map = BoundedMap::new(0);
        assert_eq!(map.set("a", 1), Some(("a", 1)));
        assert!(map.is_empty());
        assert_eq!(map.get(&"a"), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut map = BoundedMap::new(2);
        map.set("a", 1);
        assert_eq!(map.remove(&"a"), Some(1));
        assert_eq!(map.remove(&"a"), None);
        assert_eq!(map.remove(&"never"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_get_or_returns_default_for_absent_key() {
        let mut map = BoundedMap::new(1);
        map.set("a", 1);
        let fallback = -1;
        assert_eq!(*map.get_or(&"a", &fallback), 1);
        assert_eq!(*map.get_or(&"b", &fallback), -1);
    }

    #[test]
    fn test_equality_against_hash_map() {
        let mut map = BoundedMap::new(3);
        map.set("x", 1);
        map.set("y", 2);
        let expected = HashMap::from([("y", 2), ("x", 1)]);
        assert!(map == expected);
    }

    #[test]
    fn test_iter_runs_from_oldest_to_newest() {
        let mut map = BoundedMap::new(3);
        map.set(1, ());
        map.set(2, ());
        map.set(3, ());
        map.get(&1);
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, vec![2, 3, 1]);
    }

    #[test]
    fn test_debug_lists_entries() {
        let mut map = BoundedMap::new(2);
        map.set("a", 1);
        assert_eq!(format!("{:?}", map), "{\"a\": 1}");
    }
}
