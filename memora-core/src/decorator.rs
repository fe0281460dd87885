use std::rc::Rc;

use tracing::debug;

use crate::callable::{
    Callable, CallableKind, ClassCall, ClassComputation, ClassKey, ClassRef, Computation, FnMeta,
    WrappedCallable,
};
use crate::error::MemoError;
use crate::keys::{DefaultKeyGenerator, KeyGenerator};
use crate::memoized::{ClassBound, InstanceIndependent, KeyDerivation, Memoized};
use crate::options::{CacheConfig, Capacity};
use crate::store::CacheStore;

/// A validated cache configuration that turns computations into memoized wrappers.
///
/// Every wrapper produced by a decorator owns its own store: applying the same decorator
/// to two computations never makes them share entries. The key generator is shared.
///
/// Obtain one with [`cache_with`](crate::cache_with) or
/// [`CacheOptions::build`](crate::CacheOptions::build); `Decorator::default()` is the
/// unbounded configuration without statistics.
#[derive(Debug)]
pub struct Decorator<G = DefaultKeyGenerator> {
    config: CacheConfig,
    key_generator: Rc<G>,
}

impl Default for Decorator {
    fn default() -> Self {
        Self::from_parts(CacheConfig::default(), DefaultKeyGenerator)
    }
}

impl<G> Clone for Decorator<G> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            key_generator: Rc::clone(&self.key_generator),
        }
    }
}

impl<G> Decorator<G> {
    /// Assumes `config` already passed [`CacheConfig::validate`].
    pub(crate) fn from_parts(config: CacheConfig, key_generator: G) -> Self {
        Self {
            config,
            key_generator: Rc::new(key_generator),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn capacity(&self) -> Capacity {
        self.config.capacity
    }

    /// Memoizes an infallible computation.
    pub fn apply<A, V, F>(&self, f: F) -> Memoized<A, V, MemoError, G::Key>
    where
        A: 'static,
        V: 'static,
        F: Fn(&A) -> V + 'static,
        G: KeyGenerator<A> + 'static,
    {
        let meta = FnMeta::of::<F>();
        let computation: Computation<A, V, MemoError> = Box::new(move |args: &A| Ok(f(args)));
        self.memoize(computation, CallableKind::Plain, meta)
    }

    /// Memoizes a fallible computation. Only `Ok` results are cached.
    pub fn apply_fallible<A, V, E, F>(&self, f: F) -> Memoized<A, V, E, G::Key>
    where
        F: Fn(&A) -> Result<V, E> + 'static,
        G: KeyGenerator<A> + 'static,
    {
        self.memoize(Box::new(f), CallableKind::Plain, FnMeta::of::<F>())
    }

    /// Memoizes a computation that receives the type it is invoked through.
    ///
    /// The key generator sees only the explicit arguments; the invoking type is added
    /// to every key on top of it.
    pub fn class_bound<A, V, E, F>(&self, f: F) -> ClassBound<A, V, E, G::Key>
    where
        A: 'static,
        V: 'static,
        E: 'static,
        F: Fn(&ClassRef, &A) -> Result<V, E> + 'static,
        G: KeyGenerator<A> + 'static,
    {
        self.bind_class(Box::new(f), FnMeta::of::<F>())
    }

    /// Memoizes a method that ignores the instance it is called on.
    pub fn instance_independent<A, V, E, F>(&self, f: F) -> InstanceIndependent<A, V, E, G::Key>
    where
        F: Fn(&A) -> Result<V, E> + 'static,
        G: KeyGenerator<A> + 'static,
    {
        InstanceIndependent::new(self.memoize(
            Box::new(f),
            CallableKind::InstanceIndependent,
            FnMeta::of::<F>(),
        ))
    }

    /// Memoizes a computation whose dispatch shape is chosen at runtime.
    ///
    /// The returned wrapper has the same variant as `callable`.
    ///
    /// ```
    /// use memora_core::{Callable, CallableKind, Decorator, MemoError};
    ///
    /// let callable = Callable::<(u8,), u8, MemoError>::new(
    ///     "static".parse().unwrap(),
    ///     |x: &(u8,)| Ok(x.0 + 1),
    /// )
    /// .unwrap();
    ///
    /// let wrapped = Decorator::default().wrap(callable);
    /// assert_eq!(wrapped.kind(), CallableKind::InstanceIndependent);
    /// assert_eq!(wrapped.as_instance_independent().unwrap().call((1,)).unwrap(), 2);
    /// ```
    pub fn wrap<A, V, E>(&self, callable: Callable<A, V, E>) -> WrappedCallable<A, V, E, G::Key>
    where
        A: 'static,
        V: 'static,
        E: 'static,
        G: KeyGenerator<A> + 'static,
    {
        match callable {
            Callable::Plain(f, meta) => {
                WrappedCallable::Plain(self.memoize(f, CallableKind::Plain, meta))
            }
            Callable::ClassBound(f, meta) => WrappedCallable::ClassBound(self.bind_class(f, meta)),
            Callable::InstanceIndependent(f, meta) => WrappedCallable::InstanceIndependent(
                InstanceIndependent::new(self.memoize(f, CallableKind::InstanceIndependent, meta)),
            ),
        }
    }

    fn bind_class<A, V, E>(
        &self,
        f: ClassComputation<A, V, E>,
        meta: FnMeta,
    ) -> ClassBound<A, V, E, G::Key>
    where
        A: 'static,
        V: 'static,
        E: 'static,
        G: KeyGenerator<A> + 'static,
    {
        let computation: Computation<ClassCall<A>, V, E> =
            Box::new(move |call: &ClassCall<A>| f(&call.class, &call.args));

        let key_generator = Rc::clone(&self.key_generator);
        let key_fn: KeyDerivation<ClassCall<A>, ClassKey<G::Key>> =
            Box::new(move |call: &ClassCall<A>| {
                Ok(ClassKey::new(call.class, key_generator.generate(&call.args)?))
            });

        ClassBound::new(Memoized::new(
            computation,
            key_fn,
            self.new_store(&meta),
            CallableKind::ClassBound,
            meta,
        ))
    }

    fn memoize<A, V, E>(
        &self,
        computation: Computation<A, V, E>,
        kind: CallableKind,
        meta: FnMeta,
    ) -> Memoized<A, V, E, G::Key>
    where
        G: KeyGenerator<A> + 'static,
    {
        let key_generator = Rc::clone(&self.key_generator);
        let key_fn: KeyDerivation<A, G::Key> =
            Box::new(move |args: &A| key_generator.generate(args));

        Memoized::new(computation, key_fn, self.new_store(&meta), kind, meta)
    }

    fn new_store<K, V>(&self, meta: &FnMeta) -> Option<CacheStore<K, V>>
    where
        K: std::hash::Hash + Eq + Clone,
    {
        if self.config.capacity.is_disabled() {
            debug!(name = meta.name(), "capacity is 0, caching disabled");
            None
        } else {
            Some(CacheStore::with_config(&self.config))
        }
    }
}
