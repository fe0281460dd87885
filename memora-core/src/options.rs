use std::fmt;
use std::str::FromStr;

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::decorator::Decorator;
use crate::error::{MemoError, MemoResult};
use crate::keys::{DefaultKeyGenerator, KeyFn};

/// How many entries a cache may hold.
///
/// `Bounded(0)` disables caching: the decorator then hands back a pass-through wrapper
/// that allocates no store.
///
/// # Examples
///
/// ```
/// use memora_core::Capacity;
///
/// assert_eq!("unbounded".parse::<Capacity>().unwrap(), Capacity::Unbounded);
/// assert_eq!("128".parse::<Capacity>().unwrap(), Capacity::Bounded(128));
/// assert!("-1".parse::<Capacity>().is_err());
/// assert!(Capacity::try_from(-5i64).is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "CapacityRepr", into = "CapacityRepr")
)]
pub enum Capacity {
    #[default]
    Unbounded,
    Bounded(usize),
}

impl Capacity {
    /// `true` for a capacity of zero, i.e. caching turned off.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Capacity::Bounded(0))
    }

    /// The entry limit, `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Bounded(limit) => Some(*limit),
        }
    }

    /// Converts a signed capacity, rejecting negative values.
    pub fn from_signed(capacity: i64) -> MemoResult<Self> {
        usize::try_from(capacity)
            .map(Capacity::Bounded)
            .map_err(|_| {
                MemoError::invalid_configuration(format!(
                    "capacity must be a non-negative integer or \"unbounded\", got {}",
                    capacity
                ))
            })
    }
}

impl From<usize> for Capacity {
    fn from(limit: usize) -> Self {
        Capacity::Bounded(limit)
    }
}

impl From<Option<usize>> for Capacity {
    fn from(limit: Option<usize>) -> Self {
        limit.map_or(Capacity::Unbounded, Capacity::Bounded)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = MemoError;

    fn try_from(capacity: i64) -> MemoResult<Self> {
        Capacity::from_signed(capacity)
    }
}

impl TryFrom<i32> for Capacity {
    type Error = MemoError;

    fn try_from(capacity: i32) -> MemoResult<Self> {
        Capacity::from_signed(i64::from(capacity))
    }
}

impl FromStr for Capacity {
    type Err = MemoError;

    fn from_str(s: &str) -> MemoResult<Self> {
        let text = s.trim();
        match text.to_ascii_lowercase().as_str() {
            "unbounded" | "unlimited" | "none" => Ok(Capacity::Unbounded),
            _ => match text.parse::<i64>() {
                Ok(capacity) => Capacity::from_signed(capacity),
                Err(_) => Err(MemoError::invalid_configuration(format!(
                    "capacity must be a non-negative integer or \"unbounded\", got {:?}",
                    s
                ))),
            },
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unbounded => f.write_str("unbounded"),
            Capacity::Bounded(limit) => write!(f, "{}", limit),
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Limit(i64),
    Text(String),
}

#[cfg(feature = "serde")]
impl TryFrom<CapacityRepr> for Capacity {
    type Error = MemoError;

    fn try_from(repr: CapacityRepr) -> MemoResult<Self> {
        match repr {
            CapacityRepr::Limit(capacity) => Capacity::from_signed(capacity),
            CapacityRepr::Text(text) => text.parse(),
        }
    }
}

#[cfg(feature = "serde")]
impl From<Capacity> for CapacityRepr {
    fn from(capacity: Capacity) -> Self {
        match capacity {
            Capacity::Unbounded => CapacityRepr::Text("unbounded".to_string()),
            Capacity::Bounded(limit) => CapacityRepr::Limit(i64::try_from(limit).unwrap_or(i64::MAX)),
        }
    }
}

/// Plain configuration values of a cache, loadable from a config file with the `serde`
/// feature.
///
/// ```
/// use memora_core::{CacheConfig, Capacity};
///
/// let config = CacheConfig::default();
/// assert_eq!(config.capacity, Capacity::Unbounded);
/// assert!(!config.track_stats);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct CacheConfig {
    pub capacity: Capacity,
    pub track_stats: bool,
}

impl CacheConfig {
    /// Rejects option combinations that cannot be honoured.
    pub fn validate(&self) -> MemoResult<()> {
        if self.capacity.is_disabled() && self.track_stats {
            return Err(MemoError::invalid_configuration(
                "statistics were requested but a capacity of 0 disables caching",
            ));
        }
        Ok(())
    }
}

/// Builder for a [`Decorator`].
///
/// Options are consumed by [`build`](CacheOptions::build) (or [`cache_with`]), which
/// validates them once; the resulting decorator is immutable.
///
/// # Examples
///
/// ```
/// use memora_core::{cache_with, CacheOptions};
///
/// let decorator = cache_with(CacheOptions::new().bounded(2).track_stats(true)).unwrap();
/// let add = decorator.apply(|&(a, b): &(i32, i32)| a + b);
///
/// assert_eq!(add.call((1, 2)).unwrap(), 3);
/// assert_eq!(add.call((1, 2)).unwrap(), 3);
///
/// let cache = add.cache().unwrap();
/// assert_eq!(cache.hits(), Some(1));
/// assert_eq!(cache.misses(), Some(1));
/// ```
///
/// [`cache_with`]: crate::cache_with
#[derive(Clone, Debug, Default)]
pub struct CacheOptions<G = DefaultKeyGenerator> {
    config: CacheConfig,
    key_generator: G,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            key_generator: DefaultKeyGenerator,
        }
    }
}

impl<G> CacheOptions<G> {
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Shorthand for `capacity(Capacity::Bounded(limit))`.
    pub fn bounded(self, limit: usize) -> Self {
        self.capacity(Capacity::Bounded(limit))
    }

    pub fn unbounded(self) -> Self {
        self.capacity(Capacity::Unbounded)
    }

    /// Enables hit/miss counters. Off by default.
    pub fn track_stats(mut self, track_stats: bool) -> Self {
        self.config.track_stats = track_stats;
        self
    }

    /// Replaces the key generator.
    pub fn key_generator<G2>(self, key_generator: G2) -> CacheOptions<G2> {
        CacheOptions {
            config: self.config,
            key_generator,
        }
    }

    /// Replaces the key generator with a function of the call arguments.
    ///
    /// ```
    /// use memora_core::{cache_with, CacheOptions};
    ///
    /// // only the first argument identifies the result
    /// let decorator = cache_with(
    ///     CacheOptions::new().key_fn(|args: &(u64, String)| args.0),
    /// )
    /// .unwrap();
    /// let lookup = decorator.apply(|args: &(u64, String)| format!("{}:{}", args.0, args.1));
    ///
    /// assert_eq!(lookup.call((1, "first".into())).unwrap(), "1:first");
    /// assert_eq!(lookup.call((1, "second".into())).unwrap(), "1:first");
    /// ```
    pub fn key_fn<A, F, K>(self, f: F) -> CacheOptions<KeyFn<F, K>>
    where
        A: ?Sized,
        F: Fn(&A) -> K,
    {
        self.key_generator(KeyFn::new(f))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Validates the options and produces the decorator.
    pub fn build(self) -> MemoResult<Decorator<G>> {
        self.config.validate()?;
        debug!(
            capacity = %self.config.capacity,
            track_stats = self.config.track_stats,
            "built memoization decorator"
        );
        Ok(Decorator::from_parts(self.config, self.key_generator))
    }
}
