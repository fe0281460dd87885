use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::marker::PhantomData;

use crate::error::{MemoError, MemoResult};

/// Converts a value into the textual key fragment used by [`CacheKey`].
///
/// Most types get this through [`DefaultCacheableKey`], which formats the value with
/// `Debug`. Implement it directly when a cheaper or more selective representation exists,
/// or when some values cannot form a key at all (override [`try_cache_key`]).
///
/// # Examples
///
/// ```
/// use memora_core::CacheableKey;
///
/// struct UserId {
///     id: u64,
///     display_name: String,
/// }
///
/// // Only the id identifies a user.
/// impl CacheableKey for UserId {
///     fn to_cache_key(&self) -> String {
///         format!("user:{}", self.id)
///     }
/// }
///
/// let user = UserId { id: 7, display_name: "Ana".into() };
/// assert_eq!(user.to_cache_key(), "user:7");
/// ```
///
/// [`try_cache_key`]: CacheableKey::try_cache_key
pub trait CacheableKey {
    fn to_cache_key(&self) -> String;

    /// Fallible variant used by key generation. Defaults to [`to_cache_key`].
    ///
    /// [`to_cache_key`]: CacheableKey::to_cache_key
    fn try_cache_key(&self) -> MemoResult<String> {
        Ok(self.to_cache_key())
    }
}

/// Marker trait: derive the cache key from the `Debug` representation.
///
/// ```
/// use memora_core::{CacheableKey, DefaultCacheableKey};
///
/// #[derive(Debug)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl DefaultCacheableKey for Point {}
///
/// assert_eq!(Point { x: 1, y: 2 }.to_cache_key(), "Point { x: 1, y: 2 }");
/// ```
pub trait DefaultCacheableKey: Debug {}

impl<T: DefaultCacheableKey + ?Sized> CacheableKey for T {
    fn to_cache_key(&self) -> String {
        format!("{:?}", self)
    }
}

macro_rules! impl_default_cacheable_key {
    ($($ty:ty),* $(,)?) => {
        $(impl DefaultCacheableKey for $ty {})*
    };
}

impl_default_cacheable_key!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, str, String, (),
);

impl<T: DefaultCacheableKey + ?Sized> DefaultCacheableKey for &T {}
impl<T: DefaultCacheableKey + ?Sized> DefaultCacheableKey for Box<T> {}
impl<T: DefaultCacheableKey> DefaultCacheableKey for Option<T> {}
impl<T: DefaultCacheableKey> DefaultCacheableKey for Vec<T> {}
impl<T: DefaultCacheableKey> DefaultCacheableKey for [T] {}
impl<A: DefaultCacheableKey> DefaultCacheableKey for (A,) {}
impl<A: DefaultCacheableKey, B: DefaultCacheableKey> DefaultCacheableKey for (A, B) {}
impl<A: DefaultCacheableKey, B: DefaultCacheableKey, C: DefaultCacheableKey> DefaultCacheableKey
    for (A, B, C)
{
}
impl<A, B, C, D> DefaultCacheableKey for (A, B, C, D)
where
    A: DefaultCacheableKey,
    B: DefaultCacheableKey,
    C: DefaultCacheableKey,
    D: DefaultCacheableKey,
{
}

// NaN is not equal to itself, so it can never be found again once stored.
macro_rules! impl_float_cacheable_key {
    ($($ty:ty),*) => {
        $(
            impl CacheableKey for $ty {
                fn to_cache_key(&self) -> String {
                    // -0.0 == 0.0
                    if *self == 0.0 {
                        "0.0".to_string()
                    } else {
                        format!("{:?}", self)
                    }
                }

                fn try_cache_key(&self) -> MemoResult<String> {
                    if self.is_nan() {
                        Err(MemoError::unhashable(
                            stringify!($ty),
                            "NaN never compares equal to itself",
                        ))
                    } else {
                        Ok(self.to_cache_key())
                    }
                }
            }
        )*
    };
}

impl_float_cacheable_key!(f32, f64);

/// The default cache key: positional argument keys plus an order-insensitive set of
/// named argument keys.
///
/// Two calls are cache-equivalent iff their keys compare equal.
///
/// # Examples
///
/// ```
/// use memora_core::CacheKey;
///
/// let mut a = CacheKey::builder();
/// a.arg(&1).named("scale", &2).named("offset", &3);
///
/// let mut b = CacheKey::builder();
/// b.arg(&1).named("offset", &3).named("scale", &2);
///
/// assert_eq!(a.build().unwrap(), b.build().unwrap());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    positional: Vec<String>,
    named: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::default()
    }

    /// Derives the default key for a set of call arguments.
    ///
    /// ```
    /// use memora_core::CacheKey;
    ///
    /// let key = CacheKey::of(&(2, "two")).unwrap();
    /// assert_eq!(key.positional(), ["2", "\"two\""]);
    /// ```
    pub fn of<A: KeyArgs + ?Sized>(args: &A) -> MemoResult<CacheKey> {
        let mut builder = CacheKey::builder();
        args.write_key(&mut builder);
        builder.build()
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn named(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl DefaultCacheableKey for CacheKey {}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.positional.join(", "))?;
        if !self.named.is_empty() {
            f.write_str("; ")?;
            let mut first = true;
            for (name, value) in &self.named {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{}={}", name, value)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}

/// Incrementally builds a [`CacheKey`].
///
/// The first argument that cannot form a key is remembered and reported by
/// [`build`](CacheKeyBuilder::build); later arguments are ignored.
#[derive(Debug, Default)]
pub struct CacheKeyBuilder {
    key: CacheKey,
    error: Option<MemoError>,
}

impl CacheKeyBuilder {
    /// Appends a positional argument.
    pub fn arg<T: CacheableKey + ?Sized>(&mut self, value: &T) -> &mut Self {
        if self.error.is_none() {
            let label = format!("#{}", self.key.positional.len());
            match value.try_cache_key() {
                Ok(part) => self.key.positional.push(part),
                Err(err) => self.error = Some(relabel(err, label)),
            }
        }
        self
    }

    /// Adds a named argument. A repeated name replaces the earlier value.
    pub fn named<T: CacheableKey + ?Sized>(&mut self, name: &str, value: &T) -> &mut Self {
        if self.error.is_none() {
            match value.try_cache_key() {
                Ok(part) => {
                    self.key.named.insert(name.to_string(), part);
                }
                Err(err) => self.error = Some(relabel(err, name.to_string())),
            }
        }
        self
    }

    /// Finishes the key, leaving the builder empty.
    pub fn build(&mut self) -> MemoResult<CacheKey> {
        match self.error.take() {
            Some(err) => {
                self.key = CacheKey::default();
                Err(err)
            }
            None => Ok(std::mem::take(&mut self.key)),
        }
    }
}

fn relabel(err: MemoError, argument: String) -> MemoError {
    match err {
        MemoError::UnhashableArgument { reason, .. } => {
            MemoError::UnhashableArgument { argument, reason }
        }
        other => other,
    }
}

/// Call arguments that know how to contribute to a [`CacheKey`].
///
/// Implemented for `()` and tuples of up to eight [`CacheableKey`] values, each element
/// becoming one positional part. Implement it for an argument struct to contribute named
/// parts:
///
/// ```
/// use memora_core::{CacheKey, CacheKeyBuilder, KeyArgs};
///
/// struct Search {
///     term: String,
///     limit: usize,
/// }
///
/// impl KeyArgs for Search {
///     fn write_key(&self, key: &mut CacheKeyBuilder) {
///         key.named("term", &self.term).named("limit", &self.limit);
///     }
/// }
///
/// let key = CacheKey::of(&Search { term: "rust".into(), limit: 10 }).unwrap();
/// assert_eq!(key.named()["limit"], "10");
/// ```
pub trait KeyArgs {
    fn write_key(&self, key: &mut CacheKeyBuilder);
}

impl KeyArgs for () {
    fn write_key(&self, _key: &mut CacheKeyBuilder) {}
}

macro_rules! impl_key_args_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: CacheableKey),+> KeyArgs for ($($name,)+) {
            fn write_key(&self, key: &mut CacheKeyBuilder) {
                $( key.arg(&self.$idx); )+
            }
        }
    };
}

impl_key_args_for_tuple!(A: 0);
impl_key_args_for_tuple!(A: 0, B: 1);
impl_key_args_for_tuple!(A: 0, B: 1, C: 2);
impl_key_args_for_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_key_args_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_key_args_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_key_args_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_key_args_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Strategy mapping call arguments to a hashable key.
pub trait KeyGenerator<A: ?Sized> {
    type Key: Hash + Eq + Clone + Debug + 'static;

    fn generate(&self, args: &A) -> MemoResult<Self::Key>;
}

/// Builds a [`CacheKey`] from [`KeyArgs`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultKeyGenerator;

impl<A: KeyArgs + ?Sized> KeyGenerator<A> for DefaultKeyGenerator {
    type Key = CacheKey;

    fn generate(&self, args: &A) -> MemoResult<CacheKey> {
        CacheKey::of(args)
    }
}

/// A user-supplied key function. See [`CacheOptions::key_fn`](crate::CacheOptions::key_fn).
pub struct KeyFn<F, K> {
    f: F,
    _key: PhantomData<fn() -> K>,
}

impl<F, K> KeyFn<F, K> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _key: PhantomData,
        }
    }
}

impl<F, K> Debug for KeyFn<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFn")
            .field("key", &std::any::type_name::<K>())
            .finish()
    }
}

impl<A, F, K> KeyGenerator<A> for KeyFn<F, K>
where
    A: ?Sized,
    F: Fn(&A) -> K,
    K: Hash + Eq + Clone + Debug + 'static,
{
    type Key = K;

    fn generate(&self, args: &A) -> MemoResult<K> {
        Ok((self.f)(args))
    }
}
