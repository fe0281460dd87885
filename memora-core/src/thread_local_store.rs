use std::hash::Hash;
use std::thread::LocalKey;

use tracing::debug;

use crate::lookup::Lookup;
use crate::registry::SharedStore;
use crate::store::CacheInfo;

/// Handle to a store kept in a `thread_local!` static.
///
/// This is the storage used by functions annotated with `#[cache]`: each annotated
/// function declares its own thread-local store, so caches are never shared between
/// threads and no locking is needed. The store is borrowed only for the duration of a
/// single lookup or insertion, which lets a cached function call itself recursively.
/// While the store is borrowed elsewhere (inside [`registry::with_store`]), lookups
/// miss and insertions are dropped.
///
/// [`registry::with_store`]: crate::registry::with_store
///
/// # Examples
///
/// ```
/// use memora_core::{registry, Capacity, ThreadLocalStore};
///
/// thread_local! {
///     static STORE: registry::SharedStore<u32, u64> =
///         registry::register_new("thread_local_store_doc", Capacity::Bounded(16), true);
/// }
///
/// let store = ThreadLocalStore::new(&STORE);
/// assert_eq!(store.get(&4), None);
/// store.insert(4, 16);
/// assert_eq!(store.get(&4), Some(16));
///
/// let info = store.info();
/// assert_eq!(info.hits, Some(1));
/// assert_eq!(info.misses, Some(1));
/// ```
pub struct ThreadLocalStore<K: 'static, V: 'static> {
    store: &'static LocalKey<SharedStore<K, V>>,
}

impl<K, V> ThreadLocalStore<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    pub fn new(store: &'static LocalKey<SharedStore<K, V>>) -> Self {
        Self { store }
    }

    /// Looks a key up and clones the cached value out.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lookup(key).into_option()
    }

    pub fn lookup(&self, key: &K) -> Lookup<V> {
        self.store.with(|store| match store.try_borrow_mut() {
            Ok(mut store) => store.get(key).cloned(),
            Err(_) => {
                debug!("cache is borrowed, lookup skipped");
                Lookup::Miss
            }
        })
    }

    pub fn insert(&self, key: K, value: V) {
        self.store.with(|store| match store.try_borrow_mut() {
            Ok(mut store) => {
                store.set(key, value);
            }
            Err(_) => debug!("cache is borrowed, value not stored"),
        });
    }

    pub fn len(&self) -> usize {
        self.store.with(|store| store.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.store.with(|store| store.borrow_mut().clear());
    }

    pub fn info(&self) -> CacheInfo {
        self.store.with(|store| store.borrow().info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use crate::{CacheStore, Capacity};

    thread_local! {
        static BOUNDED: SharedStore<String, i32> =
            registry::register_new("thread_local_store_bounded", Capacity::Bounded(2), false);
        static TRACKED: SharedStore<u8, u8> =
            registry::register_new("thread_local_store_tracked", Capacity::Unbounded, true);
    }

    #[test]
    fn test_insert_and_get() {
        let store = ThreadLocalStore::new(&BOUNDED);
        store.insert("a".to_string(), 1);
        assert_eq!(store.get(&"a".to_string()), Some(1));
        assert_eq!(store.get(&"b".to_string()), None);
    }

    #[test]
    fn test_bounded_eviction() {
        let store = ThreadLocalStore::new(&BOUNDED);
        store.insert("x".to_string(), 1);
        store.insert("y".to_string(), 2);
        store.insert("z".to_string(), 3);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&"x".to_string()), None);
    }

    #[test]
    fn test_registered_under_name() {
        let store = ThreadLocalStore::new(&TRACKED);
        store.insert(1, 1);
        assert_eq!(registry::info("thread_local_store_tracked"), Some(store.info()));
    }

    #[test]
    fn test_threads_do_not_share_entries() {
        let store = ThreadLocalStore::new(&TRACKED);
        store.insert(9, 9);

        let other = std::thread::spawn(|| ThreadLocalStore::new(&TRACKED).get(&9))
            .join()
            .unwrap();
        assert_eq!(other, None);
        assert_eq!(store.get(&9), Some(9));
    }

    #[test]
    fn test_access_while_inspected_through_registry() {
        let store = ThreadLocalStore::new(&TRACKED);
        store.insert(5, 25);

        let inside = registry::with_store("thread_local_store_tracked", |_: &CacheStore<u8, u8>| {
            store.insert(6, 36);
            store.get(&5)
        });
        assert_eq!(inside, Some(None));
        assert_eq!(store.get(&5), Some(25));
        assert_eq!(store.get(&6), None);
    }

    #[test]
    fn test_clear() {
        let store = ThreadLocalStore::new(&TRACKED);
        store.insert(3, 3);
        store.clear();
        assert!(store.is_empty());
    }
}
