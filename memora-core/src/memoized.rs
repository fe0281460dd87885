use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::callable::{CallableKind, ClassCall, ClassKey, ClassRef, Computation, FnMeta};
use crate::error::{MemoError, MemoResult};
use crate::keys::CacheKey;
use crate::lookup::Lookup;
use crate::store::{CacheInfo, CacheStore};

pub(crate) type KeyDerivation<A, K> = Box<dyn Fn(&A) -> MemoResult<K>>;

/// A computation wrapped with a cache.
///
/// Calling the wrapper derives a key from the arguments. On a hit the cached value is
/// returned (cloned) without running the computation; on a miss the computation runs,
/// and only a successful result is stored. Errors from the computation are propagated
/// unchanged and leave the cache untouched; a key that cannot be derived fails the call
/// with [`MemoError::UnhashableArgument`] converted into `E`.
///
/// The store is borrowed only around the lookup and around the insertion, never while
/// the computation runs, so a computation may call back into its own wrapper (through
/// an `Rc` or a thread-local) to memoize recursion.
///
/// A wrapper built with a capacity of 0 holds no store at all and forwards every call.
///
/// # Examples
///
/// ```
/// use memora_core::cache;
///
/// let double = cache(|x: &(u64,)| x.0 * 2);
/// assert_eq!(double.call((21,)).unwrap(), 42);
/// assert_eq!(double.call((21,)).unwrap(), 42);
/// assert_eq!(double.cache().unwrap().len(), 1);
/// ```
pub struct Memoized<A, V, E = MemoError, K = CacheKey> {
    computation: Computation<A, V, E>,
    key_fn: KeyDerivation<A, K>,
    store: Option<RefCell<CacheStore<K, V>>>,
    kind: CallableKind,
    meta: FnMeta,
}

impl<A, V, E, K> Memoized<A, V, E, K>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new(
        computation: Computation<A, V, E>,
        key_fn: KeyDerivation<A, K>,
        store: Option<CacheStore<K, V>>,
        kind: CallableKind,
        meta: FnMeta,
    ) -> Self {
        Self {
            computation,
            key_fn,
            store: store.map(RefCell::new),
            kind,
            meta,
        }
    }

    /// Runs the computation through the cache.
    pub fn call(&self, args: A) -> Result<V, E>
    where
        V: Clone,
        E: From<MemoError>,
    {
        let Some(store) = &self.store else {
            return (self.computation)(&args);
        };

        let key = match (self.key_fn)(&args) {
            Ok(key) => key,
            Err(err) => {
                debug!(name = self.meta.name(), error = %err, "cannot derive cache key");
                return Err(E::from(err));
            }
        };

        // A guard from `cache()` may still be alive; the call then runs uncached.
        let Ok(mut guard) = store.try_borrow_mut() else {
            debug!(name = self.meta.name(), "cache is borrowed, calling through");
            return (self.computation)(&args);
        };
        if let Lookup::Hit(value) = guard.get(&key).cloned() {
            return Ok(value);
        }
        drop(guard);

        match (self.computation)(&args) {
            Ok(value) => {
                match store.try_borrow_mut() {
                    Ok(mut guard) => {
                        guard.set(key, value.clone());
                    }
                    Err(_) => debug!(name = self.meta.name(), "cache is borrowed, result not cached"),
                }
                Ok(value)
            }
            Err(err) => {
                debug!(name = self.meta.name(), "computation failed, result not cached");
                Err(err)
            }
        }
    }

    /// Runs the computation directly, bypassing the cache.
    pub fn call_uncached(&self, args: &A) -> Result<V, E> {
        (self.computation)(args)
    }

    /// The cache behind this wrapper, `None` when caching is disabled.
    ///
    /// While the returned guard is alive, calls still succeed but neither read nor fill
    /// the cache.
    pub fn cache(&self) -> Option<Ref<'_, CacheStore<K, V>>> {
        self.store.as_ref().map(RefCell::borrow)
    }

    pub fn is_caching(&self) -> bool {
        self.store.is_some()
    }

    pub fn info(&self) -> Option<CacheInfo> {
        self.cache().map(|store| store.info())
    }

    /// Drops every cached entry. Returns `false` when there is no cache or it is
    /// currently borrowed through [`cache`](Self::cache).
    pub fn clear(&self) -> bool {
        match self.store.as_ref().map(RefCell::try_borrow_mut) {
            Some(Ok(mut store)) => {
                store.clear();
                true
            }
            _ => false,
        }
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn meta(&self) -> &FnMeta {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn doc(&self) -> Option<&str> {
        self.meta.doc()
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.meta.rename(name);
        self
    }

    pub fn describe(mut self, doc: impl Into<String>) -> Self {
        self.meta.set_doc(doc);
        self
    }
}

impl<A, V, E, K> fmt::Debug for Memoized<A, V, E, K>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name())
            .field("kind", &self.kind)
            .field("info", &self.info())
            .finish()
    }
}

/// A memoized computation keyed by the type it is invoked through.
///
/// Calls through different types are cached separately even when the explicit
/// arguments are equal: every entry is keyed by the invoking type's identity together
/// with the key generator's key for the explicit arguments. The computation sees the
/// [`ClassRef`] it was invoked through.
///
/// ```
/// use memora_core::{Decorator, ClassRef};
///
/// struct Celsius;
/// struct Fahrenheit;
///
/// let describe = Decorator::default().class_bound(|class: &ClassRef, args: &(i32,)| {
///     Ok::<_, memora_core::MemoError>(format!("{} {}", args.0, class.name()))
/// });
///
/// assert!(describe.call::<Celsius>((20,)).unwrap().ends_with("Celsius"));
/// assert!(describe.call::<Fahrenheit>((20,)).unwrap().ends_with("Fahrenheit"));
/// assert_eq!(describe.cache().unwrap().len(), 2);
/// ```
pub struct ClassBound<A, V, E = MemoError, K = CacheKey> {
    inner: Memoized<ClassCall<A>, V, E, ClassKey<K>>,
}

impl<A, V, E, K> ClassBound<A, V, E, K>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new(inner: Memoized<ClassCall<A>, V, E, ClassKey<K>>) -> Self {
        Self { inner }
    }

    /// Invokes the computation through the type `T`.
    pub fn call<T: ?Sized + 'static>(&self, args: A) -> Result<V, E>
    where
        V: Clone,
        E: From<MemoError>,
    {
        self.call_class(ClassRef::of::<T>(), args)
    }

    /// Invokes the computation through the type of `instance`. The instance's state is
    /// not part of the key.
    pub fn call_on<T: ?Sized + 'static>(&self, instance: &T, args: A) -> Result<V, E>
    where
        V: Clone,
        E: From<MemoError>,
    {
        self.call_class(ClassRef::of_val(instance), args)
    }

    pub fn call_class(&self, class: ClassRef, args: A) -> Result<V, E>
    where
        V: Clone,
        E: From<MemoError>,
    {
        self.inner.call(ClassCall::new(class, args))
    }

    /// The cache, keyed by [`ClassKey`]. `None` when caching is disabled.
    pub fn cache(&self) -> Option<Ref<'_, CacheStore<ClassKey<K>, V>>> {
        self.inner.cache()
    }

    pub fn info(&self) -> Option<CacheInfo> {
        self.inner.info()
    }

    pub fn clear(&self) -> bool {
        self.inner.clear()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn doc(&self) -> Option<&str> {
        self.inner.doc()
    }

    pub fn rename(self, name: impl Into<String>) -> Self {
        Self::new(self.inner.rename(name))
    }

    pub fn describe(self, doc: impl Into<String>) -> Self {
        Self::new(self.inner.describe(doc))
    }

    pub fn inner(&self) -> &Memoized<ClassCall<A>, V, E, ClassKey<K>> {
        &self.inner
    }
}

impl<A, V, E, K> fmt::Debug for ClassBound<A, V, E, K>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassBound").field(&self.inner).finish()
    }
}

/// A memoized method that does not depend on the instance it is called on.
///
/// Calls on different instances with equal arguments share one entry.
pub struct InstanceIndependent<A, V, E = MemoError, K = CacheKey> {
    inner: Memoized<A, V, E, K>,
}

impl<A, V, E, K> InstanceIndependent<A, V, E, K>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new(inner: Memoized<A, V, E, K>) -> Self {
        Self { inner }
    }

    pub fn call(&self, args: A) -> Result<V, E>
    where
        V: Clone,
        E: From<MemoError>,
    {
        self.inner.call(args)
    }

    /// Same as [`call`](Self::call); the instance is accepted and ignored.
    pub fn call_on<T: ?Sized>(&self, _instance: &T, args: A) -> Result<V, E>
    where
        V: Clone,
        E: From<MemoError>,
    {
        self.inner.call(args)
    }

    pub fn cache(&self) -> Option<Ref<'_, CacheStore<K, V>>> {
        self.inner.cache()
    }

    pub fn info(&self) -> Option<CacheInfo> {
        self.inner.info()
    }

    pub fn clear(&self) -> bool {
        self.inner.clear()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn doc(&self) -> Option<&str> {
        self.inner.doc()
    }

    pub fn rename(self, name: impl Into<String>) -> Self {
        Self::new(self.inner.rename(name))
    }

    pub fn describe(self, doc: impl Into<String>) -> Self {
        Self::new(self.inner.describe(doc))
    }

    pub fn inner(&self) -> &Memoized<A, V, E, K> {
        &self.inner
    }
}

impl<A, V, E, K> fmt::Debug for InstanceIndependent<A, V, E, K>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstanceIndependent")
            .field(&self.inner)
            .finish()
    }
}
