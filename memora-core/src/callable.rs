use std::any::{type_name, TypeId};
use std::fmt;
use std::str::FromStr;

use crate::error::{MemoError, MemoResult};
use crate::keys::{CacheKey, CacheKeyBuilder, CacheableKey, KeyArgs};
use crate::memoized::{ClassBound, InstanceIndependent, Memoized};
use crate::store::CacheInfo;

/// The dispatch shape of a memoized computation.
///
/// - `Plain`: a free function, closure, or method whose receiver is an ordinary argument.
/// - `ClassBound`: the computation receives the type it is invoked through as an implicit
///   first argument; calls through different types get different entries.
/// - `InstanceIndependent`: a method that ignores the receiving instance.
///
/// ```
/// use memora_core::CallableKind;
///
/// assert_eq!("classmethod".parse::<CallableKind>().unwrap(), CallableKind::ClassBound);
/// assert_eq!("static".parse::<CallableKind>().unwrap(), CallableKind::InstanceIndependent);
/// assert!("property".parse::<CallableKind>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallableKind {
    Plain,
    ClassBound,
    InstanceIndependent,
}

impl CallableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallableKind::Plain => "plain",
            CallableKind::ClassBound => "class",
            CallableKind::InstanceIndependent => "static",
        }
    }
}

impl FromStr for CallableKind {
    type Err = MemoError;

    fn from_str(s: &str) -> MemoResult<Self> {
        match s.trim() {
            "plain" | "function" | "method" => Ok(CallableKind::Plain),
            "class" | "classmethod" | "class_bound" => Ok(CallableKind::ClassBound),
            "static" | "staticmethod" | "instance_independent" => {
                Ok(CallableKind::InstanceIndependent)
            }
            other => Err(MemoError::unsupported_kind(format!(
                "{:?} is not one of \"plain\", \"class\" or \"static\"",
                other
            ))),
        }
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the type a class-bound computation was invoked through.
///
/// Two `ClassRef`s are equal exactly when they were taken from the same type.
///
/// ```
/// use memora_core::ClassRef;
///
/// struct Parent;
/// struct Child;
///
/// assert_eq!(ClassRef::of::<Parent>(), ClassRef::of::<Parent>());
/// assert_ne!(ClassRef::of::<Parent>(), ClassRef::of::<Child>());
/// assert!(ClassRef::of::<Child>().name().ends_with("Child"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClassRef {
    id: TypeId,
    name: &'static str,
}

impl ClassRef {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn of_val<T: ?Sized + 'static>(_value: &T) -> Self {
        Self::of::<T>()
    }

    /// The full path of the type, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

// The name alone is not unique: equally named types in different scopes share it.
impl CacheableKey for ClassRef {
    fn to_cache_key(&self) -> String {
        format!("{}#{:?}", self.name, self.id)
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The arguments of a class-bound call: the invoking type followed by the explicit
/// arguments. The type is written first into the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassCall<A> {
    pub class: ClassRef,
    pub args: A,
}

impl<A> ClassCall<A> {
    pub fn new(class: ClassRef, args: A) -> Self {
        Self { class, args }
    }
}

impl<A: KeyArgs> KeyArgs for ClassCall<A> {
    fn write_key(&self, key: &mut CacheKeyBuilder) {
        key.arg(&self.class);
        self.args.write_key(key);
    }
}

/// Key of a class-bound cache entry: the invoking type and the key derived from the
/// explicit arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassKey<K> {
    pub class: ClassRef,
    pub key: K,
}

impl<K> ClassKey<K> {
    pub fn new(class: ClassRef, key: K) -> Self {
        Self { class, key }
    }
}

pub(crate) type Computation<A, V, E> = Box<dyn Fn(&A) -> Result<V, E>>;
pub(crate) type ClassComputation<A, V, E> = Box<dyn Fn(&ClassRef, &A) -> Result<V, E>>;

/// Describes a wrapped computation: its name and optional documentation.
///
/// Wrappers carry the metadata of the computation they wrap, so `name()` and `doc()` on
/// a memoized wrapper report the original function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnMeta {
    name: String,
    doc: Option<String>,
}

impl FnMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
        }
    }

    /// Metadata for a function type, named after the last path segment of its type name.
    ///
    /// ```
    /// use memora_core::FnMeta;
    ///
    /// fn square(x: &u32) -> u32 {
    ///     x * x
    /// }
    ///
    /// fn meta_of<F>(_: &F) -> FnMeta {
    ///     FnMeta::of::<F>()
    /// }
    ///
    /// assert_eq!(meta_of(&square).name(), "square");
    /// ```
    pub fn of<F: ?Sized>() -> Self {
        Self::new(short_type_name(type_name::<F>()))
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub(crate) fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_doc(&mut self, doc: impl Into<String>) {
        self.doc = Some(doc.into());
    }
}

/// `crate::module::square` -> `square`, `crate::tests::run::{{closure}}` -> `run::{{closure}}`
fn short_type_name(full: &str) -> &str {
    let path = full.split('<').next().unwrap_or(full);
    let mut segments = path.rsplitn(3, "::");
    let last = segments.next().unwrap_or(path);
    if last.starts_with("{{") {
        if let Some(parent) = segments.next() {
            let start = path.len() - last.len() - parent.len() - 2;
            return &path[start..];
        }
    }
    last
}

/// A computation handed to [`Decorator::wrap`](crate::Decorator::wrap), tagged with its
/// dispatch shape.
pub enum Callable<A, V, E = MemoError> {
    Plain(Computation<A, V, E>, FnMeta),
    ClassBound(ClassComputation<A, V, E>, FnMeta),
    InstanceIndependent(Computation<A, V, E>, FnMeta),
}

impl<A, V, E> Callable<A, V, E> {
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&A) -> Result<V, E> + 'static,
    {
        Callable::Plain(Box::new(f), FnMeta::of::<F>())
    }

    pub fn class_bound<F>(f: F) -> Self
    where
        F: Fn(&ClassRef, &A) -> Result<V, E> + 'static,
    {
        Callable::ClassBound(Box::new(f), FnMeta::of::<F>())
    }

    pub fn instance_independent<F>(f: F) -> Self
    where
        F: Fn(&A) -> Result<V, E> + 'static,
    {
        Callable::InstanceIndependent(Box::new(f), FnMeta::of::<F>())
    }

    /// Tags a one-argument computation with a kind chosen at runtime.
    ///
    /// Fails with [`MemoError::UnsupportedCallableKind`] for
    /// [`CallableKind::ClassBound`], whose computations take the invoking type as an
    /// extra argument; use [`Callable::class_bound`] for those.
    pub fn new<F>(kind: CallableKind, f: F) -> MemoResult<Self>
    where
        F: Fn(&A) -> Result<V, E> + 'static,
    {
        match kind {
            CallableKind::Plain => Ok(Callable::plain(f)),
            CallableKind::InstanceIndependent => Ok(Callable::instance_independent(f)),
            CallableKind::ClassBound => Err(MemoError::unsupported_kind(
                "a class-bound computation must accept the invoking class",
            )),
        }
    }

    pub fn kind(&self) -> CallableKind {
        match self {
            Callable::Plain(..) => CallableKind::Plain,
            Callable::ClassBound(..) => CallableKind::ClassBound,
            Callable::InstanceIndependent(..) => CallableKind::InstanceIndependent,
        }
    }

    pub fn meta(&self) -> &FnMeta {
        match self {
            Callable::Plain(_, meta)
            | Callable::ClassBound(_, meta)
            | Callable::InstanceIndependent(_, meta) => meta,
        }
    }

    /// Overrides the name and documentation reported by the wrapper.
    pub fn with_meta(self, meta: FnMeta) -> Self {
        match self {
            Callable::Plain(f, _) => Callable::Plain(f, meta),
            Callable::ClassBound(f, _) => Callable::ClassBound(f, meta),
            Callable::InstanceIndependent(f, _) => Callable::InstanceIndependent(f, meta),
        }
    }
}

impl<A, V, E> fmt::Debug for Callable<A, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("kind", &self.kind())
            .field("name", &self.meta().name())
            .finish()
    }
}

/// A memoized computation whose shape is only known at runtime.
///
/// Produced by [`Decorator::wrap`](crate::Decorator::wrap); the variant always matches
/// the kind of the [`Callable`] that was wrapped.
pub enum WrappedCallable<A, V, E = MemoError, K = CacheKey> {
    Plain(Memoized<A, V, E, K>),
    ClassBound(ClassBound<A, V, E, K>),
    InstanceIndependent(InstanceIndependent<A, V, E, K>),
}

impl<A, V, E, K> WrappedCallable<A, V, E, K>
where
    K: std::hash::Hash + Eq + Clone,
{
    pub fn kind(&self) -> CallableKind {
        match self {
            WrappedCallable::Plain(_) => CallableKind::Plain,
            WrappedCallable::ClassBound(_) => CallableKind::ClassBound,
            WrappedCallable::InstanceIndependent(_) => CallableKind::InstanceIndependent,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            WrappedCallable::Plain(memoized) => memoized.name(),
            WrappedCallable::ClassBound(bound) => bound.name(),
            WrappedCallable::InstanceIndependent(independent) => independent.name(),
        }
    }

    pub fn doc(&self) -> Option<&str> {
        match self {
            WrappedCallable::Plain(memoized) => memoized.doc(),
            WrappedCallable::ClassBound(bound) => bound.doc(),
            WrappedCallable::InstanceIndependent(independent) => independent.doc(),
        }
    }

    /// Size and counters of the underlying cache, `None` when caching is disabled.
    pub fn info(&self) -> Option<CacheInfo> {
        match self {
            WrappedCallable::Plain(memoized) => memoized.info(),
            WrappedCallable::ClassBound(bound) => bound.info(),
            WrappedCallable::InstanceIndependent(independent) => independent.info(),
        }
    }

    pub fn as_plain(&self) -> Option<&Memoized<A, V, E, K>> {
        match self {
            WrappedCallable::Plain(memoized) => Some(memoized),
            _ => None,
        }
    }

    pub fn as_class_bound(&self) -> Option<&ClassBound<A, V, E, K>> {
        match self {
            WrappedCallable::ClassBound(bound) => Some(bound),
            _ => None,
        }
    }

    pub fn as_instance_independent(&self) -> Option<&InstanceIndependent<A, V, E, K>> {
        match self {
            WrappedCallable::InstanceIndependent(independent) => Some(independent),
            _ => None,
        }
    }
}

impl<A, V, E, K> fmt::Debug for WrappedCallable<A, V, E, K>
where
    K: std::hash::Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedCallable")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("info", &self.info())
            .finish()
    }
}
