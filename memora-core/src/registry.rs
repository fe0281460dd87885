//! Per-thread registry of named caches.
//!
//! Functions annotated with `#[cache]` keep their store in a thread-local and register it
//! here under the function's full path (or its `name` attribute) the first time they run on
//! a thread, so the cache can be inspected from outside the function. Lookups accept any
//! trailing part of a full name that identifies a single cache.
//!
//! The registry itself is thread-local: a name resolves to the cache of the calling thread.
//!
//! # Examples
//!
//! ```
//! use memora_core::{registry, Capacity};
//!
//! let store = registry::register_new::<u32, String>("doc_example", Capacity::Bounded(8), true);
//! store.borrow_mut().set(1, "one".to_string());
//!
//! let info = registry::info("doc_example").unwrap();
//! assert_eq!(info.len, 1);
//! assert_eq!(info.hits, Some(0));
//!
//! let contents = registry::contents::<u32, String>("doc_example").unwrap();
//! assert_eq!(contents.get(&1).map(String::as_str), Some("one"));
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::options::Capacity;
use crate::store::{CacheInfo, CacheStore};

/// A store shared between a memoized function and the registry.
pub type SharedStore<K, V> = Rc<RefCell<CacheStore<K, V>>>;

/// Type-erased view of a registered store.
pub trait InspectStore {
    fn info(&self) -> CacheInfo;

    fn clear(&self);

    fn as_any(&self) -> &dyn Any;
}

impl<K, V> InspectStore for RefCell<CacheStore<K, V>>
where
    K: Hash + Eq + Clone + 'static,
    V: 'static,
{
    fn info(&self) -> CacheInfo {
        self.borrow().info()
    }

    fn clear(&self) {
        self.borrow_mut().clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

thread_local! {
    static REGISTRY: RefCell<HashMap<String, Rc<dyn InspectStore>>> =
        RefCell::new(HashMap::new());
}

/// Registers a store under `name`, replacing any store previously registered under it.
///
/// Replacing a registration is logged at `warn` level: it means two caches were given the
/// same name on this thread.
pub fn register<K, V>(name: &str, store: SharedStore<K, V>)
where
    K: Hash + Eq + Clone + 'static,
    V: 'static,
{
    let store: Rc<dyn InspectStore> = store;
    let replaced = REGISTRY.with(|registry| {
        registry
            .borrow_mut()
            .insert(name.to_string(), store)
            .is_some()
    });
    if replaced {
        warn!(name, "cache name already registered, previous cache is no longer reachable");
    }
}

/// Creates an empty store and registers it under `name`.
///
/// This is what the `#[cache]` attribute calls when its thread-local store is first
/// touched.
pub fn register_new<K, V>(name: &str, capacity: Capacity, track_stats: bool) -> SharedStore<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: 'static,
{
    let store = Rc::new(RefCell::new(CacheStore::new(capacity, track_stats)));
    register(name, Rc::clone(&store));
    debug!(name, %capacity, track_stats, "registered cache");
    store
}

/// Path of the item enclosing `marker`, a function item declared inside it.
///
/// `#[cache]` declares such a marker in every annotated function and registers the cache
/// under the result, so equally named functions in different modules or impls get
/// distinct names.
///
/// ```
/// fn outer() -> &'static str {
///     fn marker() {}
///     memora_core::registry::scope_name(marker)
/// }
///
/// assert!(outer().ends_with("::outer"));
/// ```
pub fn scope_name<F>(_marker: F) -> &'static str {
    let path = type_name::<F>();
    path.rsplit_once("::").map_or(path, |(scope, _)| scope)
}

/// Finds the store registered as `name`, or as the only full name ending in `::name`.
fn resolve(name: &str) -> Option<Rc<dyn InspectStore>> {
    REGISTRY.with(|registry| {
        let registry = registry.borrow();
        if let Some(store) = registry.get(name) {
            return Some(Rc::clone(store));
        }

        let suffix = format!("::{}", name);
        let mut candidates = registry
            .iter()
            .filter(|(full, _)| full.ends_with(&suffix));
        let (_, store) = candidates.next()?;
        if candidates.next().is_some() {
            debug!(name, "cache name is ambiguous, qualify it with its module path");
            return None;
        }
        Some(Rc::clone(store))
    })
}

/// Size and counters of the cache registered under `name`.
///
/// `name` is either the full registered name or a trailing part of it that matches
/// exactly one cache (`"area"` or `"shapes::area"` for `my_crate::shapes::area`).
pub fn info(name: &str) -> Option<CacheInfo> {
    resolve(name).map(|store| store.info())
}

/// Runs `f` against the cache registered under `name`.
///
/// Returns `None` when no cache has that name or when its key and value types are not
/// `K` and `V`.
pub fn with_store<K, V, R>(name: &str, f: impl FnOnce(&CacheStore<K, V>) -> R) -> Option<R>
where
    K: Hash + Eq + Clone + 'static,
    V: 'static,
{
    let store = resolve(name)?;
    let cell = store.as_any().downcast_ref::<RefCell<CacheStore<K, V>>>()?;
    let guard = cell.borrow();
    Some(f(&guard))
}

/// Copies the entries of the cache registered under `name`.
pub fn contents<K, V>(name: &str) -> Option<HashMap<K, V>>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + 'static,
{
    with_store(name, |store: &CacheStore<K, V>| store.to_hash_map())
}

/// Drops every entry of the cache registered under `name`. Returns `false` when no
/// cache has that name.
pub fn clear(name: &str) -> bool {
    match resolve(name) {
        Some(store) => {
            store.clear();
            true
        }
        None => false,
    }
}

/// Names of every cache registered on this thread.
pub fn list() -> Vec<String> {
    REGISTRY.with(|registry| registry.borrow().keys().cloned().collect())
}

/// Forgets every registered cache. The caches themselves stay alive.
pub fn unregister_all() {
    REGISTRY.with(|registry| registry.borrow_mut().clear());
}
