use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use tracing::trace;

use crate::bounded_map::BoundedMap;
use crate::lookup::Lookup;
use crate::options::{CacheConfig, Capacity};
use crate::stats::CacheStats;

enum Storage<K, V> {
    Unbounded(HashMap<K, V>),
    Bounded(BoundedMap<K, V>),
}

/// The key → result mapping owned by one memoized computation.
///
/// An unbounded store is a plain `HashMap`; a bounded one is a [`BoundedMap`] with
/// least-recently-used eviction. Statistics are optional: when they are not tracked,
/// [`stats`](CacheStore::stats), [`hits`](CacheStore::hits) and
/// [`misses`](CacheStore::misses) return `None` rather than zero.
///
/// # Examples
///
/// ```
/// use memora_core::{CacheStore, Capacity, Lookup};
///
/// let mut store = CacheStore::new(Capacity::Bounded(2), true);
/// assert_eq!(store.get(&"a"), Lookup::Miss);
///
/// store.set("a", 1);
/// assert_eq!(store.get(&"a"), Lookup::Hit(&1));
///
/// assert_eq!(store.hits(), Some(1));
/// assert_eq!(store.misses(), Some(1));
/// ```
pub struct CacheStore<K, V> {
    storage: Storage<K, V>,
    stats: Option<CacheStats>,
}

impl<K: Hash + Eq + Clone, V> CacheStore<K, V> {
    /// Creates an empty store.
    ///
    /// A capacity of zero yields a store that never retains anything; decorators do not
    /// create such stores, they skip caching altogether.
    pub fn new(capacity: Capacity, track_stats: bool) -> Self {
        let storage = match capacity {
            Capacity::Unbounded => Storage::Unbounded(HashMap::new()),
            Capacity::Bounded(limit) => Storage::Bounded(BoundedMap::new(limit)),
        };
        Self {
            storage,
            stats: track_stats.then(CacheStats::new),
        }
    }

    pub fn with_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.track_stats)
    }

    /// Looks a key up, recording a hit or a miss when statistics are tracked.
    ///
    /// In a bounded store a hit also marks the entry as most recently used.
    pub fn get(&mut self, key: &K) -> Lookup<&V> {
        let found = match &mut self.storage {
            Storage::Unbounded(map) => map.get(key),
            Storage::Bounded(map) => map.get(key),
        };

        match (&mut self.stats, found.is_some()) {
            (Some(stats), true) => stats.record_hit(),
            (Some(stats), false) => stats.record_miss(),
            (None, _) => {}
        }

        if found.is_some() {
            trace!("cache hit");
        } else {
            trace!("cache miss");
        }

        Lookup::from(found)
    }

    /// Looks a key up without counting it in the statistics or refreshing its recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        match &self.storage {
            Storage::Unbounded(map) => map.get(key),
            Storage::Bounded(map) => map.peek(key),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.peek(key).is_some()
    }

    /// Stores a value, returning the entry evicted to make room for it, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        match &mut self.storage {
            Storage::Unbounded(map) => {
                map.insert(key, value);
                None
            }
            Storage::Bounded(map) => map.set(key, value),
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        match &mut self.storage {
            Storage::Unbounded(map) => map.remove(key),
            Storage::Bounded(map) => map.remove(key),
        }
    }

    /// Drops every entry. Statistics are kept.
    pub fn clear(&mut self) {
        match &mut self.storage {
            Storage::Unbounded(map) => map.clear(),
            Storage::Bounded(map) => {
                let capacity = map.capacity();
                *map = BoundedMap::new(capacity);
            }
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Unbounded(map) => map.len(),
            Storage::Bounded(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> Capacity {
        match &self.storage {
            Storage::Unbounded(_) => Capacity::Unbounded,
            Storage::Bounded(map) => Capacity::Bounded(map.capacity()),
        }
    }

    pub fn stats(&self) -> Option<&CacheStats> {
        self.stats.as_ref()
    }

    pub fn hits(&self) -> Option<u64> {
        self.stats.map(|stats| stats.hits())
    }

    pub fn misses(&self) -> Option<u64> {
        self.stats.map(|stats| stats.misses())
    }

    /// Iterates over the stored entries.
    ///
    /// A bounded store yields them from the least to the most recently used; an
    /// unbounded one in no particular order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        match &self.storage {
            Storage::Unbounded(map) => Box::new(map.iter()),
            Storage::Bounded(map) => Box::new(map.iter()),
        }
    }

    /// Copies the entries out into a plain map.
    pub fn to_hash_map(&self) -> HashMap<K, V>
    where
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn info(&self) -> CacheInfo {
        CacheInfo {
            hits: self.hits(),
            misses: self.misses(),
            capacity: self.capacity(),
            len: self.len(),
        }
    }
}

impl<K, V> PartialEq<HashMap<K, V>> for CacheStore<K, V>
where
    K: Hash + Eq,
    V: PartialEq,
{
    fn eq(&self, other: &HashMap<K, V>) -> bool {
        match &self.storage {
            Storage::Unbounded(map) => map == other,
            Storage::Bounded(map) => map == other,
        }
    }
}

impl<K, V> fmt::Debug for CacheStore<K, V>
where
    K: fmt::Debug + Hash + Eq + Clone,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("capacity", &self.capacity())
            .field("stats", &self.stats)
            .field("entries", &DebugEntries(self))
            .finish()
    }
}

struct DebugEntries<'a, K, V>(&'a CacheStore<K, V>);

impl<K, V> fmt::Debug for DebugEntries<'_, K, V>
where
    K: fmt::Debug + Hash + Eq + Clone,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// A snapshot of a cache's size and counters.
///
/// `hits` and `misses` are `None` when the cache does not track statistics.
///
/// ```
/// use memora_core::{CacheStore, Capacity};
///
/// let mut store: CacheStore<u8, u8> = CacheStore::new(Capacity::Bounded(4), false);
/// store.set(1, 1);
///
/// let info = store.info();
/// assert_eq!(info.len, 1);
/// assert_eq!(info.hits, None);
/// assert_eq!(info.to_string(), "CacheInfo(hits=untracked, misses=untracked, capacity=4, len=1)");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheInfo {
    pub hits: Option<u64>,
    pub misses: Option<u64>,
    pub capacity: Capacity,
    pub len: usize,
}

impl fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn counter(value: Option<u64>) -> String {
            value.map_or_else(|| "untracked".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "CacheInfo(hits={}, misses={}, capacity={}, len={})",
            counter(self.hits),
            counter(self.misses),
            self.capacity,
            self.len
        )
    }
}
