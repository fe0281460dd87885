//! # Memora Core
//!
//! Runtime building blocks for the Memora memoization library.
//!
//! A memoized computation remembers the results it has already produced, keyed by the
//! arguments it was called with, and answers repeated calls from that record instead of
//! recomputing.
//!
//! ## Features
//!
//! - **Bounded or unbounded caches**: an optional entry limit with least-recently-used
//!   eviction
//! - **Opt-in statistics**: hit/miss counters that are absent, not zero, when disabled
//! - **Pluggable keys**: a default key derived from every argument, or a user-supplied
//!   key function
//! - **Dispatch shapes**: plain functions, class-bound computations and
//!   instance-independent methods
//! - **Result-aware caching**: failed computations are never cached
//!
//! ## Module Organization
//!
//! - [`keys`] - Cache key derivation traits and implementations
//! - [`registry`] - Per-thread registry of named caches, used by `#[cache]`
//! - [`utils`] - Recency queue helpers
//!
//! The store, decorator and wrapper types are re-exported at the crate root.
//!
//! ## Example
//!
//! ```
//! use memora_core::{cache_with, CacheOptions};
//!
//! let decorator = cache_with(CacheOptions::new().bounded(2).track_stats(true))?;
//! let fib = decorator.apply(|n: &(u32,)| {
//!     (0..n.0).fold((0u64, 1u64), |(a, b), _| (b, a + b)).0
//! });
//!
//! for n in [1, 1, 2, 2, 3] {
//!     fib.call((n,))?;
//! }
//!
//! let info = fib.info().unwrap();
//! assert_eq!((info.hits, info.misses, info.len), (Some(2), Some(3), 2));
//! # Ok::<(), memora_core::MemoError>(())
//! ```
mod bounded_map;
mod callable;
mod decorator;
mod error;
mod lookup;
mod memoized;
mod options;
mod stats;
mod store;
mod thread_local_store;

pub mod keys;
pub mod registry;
pub mod utils;

#[cfg(test)]
mod property_tests;

pub use bounded_map::BoundedMap;
pub use callable::{
    Callable, CallableKind, ClassCall, ClassKey, ClassRef, FnMeta, WrappedCallable,
};
pub use decorator::Decorator;
pub use error::{MemoError, MemoResult};
pub use keys::{
    CacheKey, CacheKeyBuilder, CacheableKey, DefaultCacheableKey, DefaultKeyGenerator, KeyArgs,
    KeyFn, KeyGenerator,
};
pub use lookup::Lookup;
pub use memoized::{ClassBound, InstanceIndependent, Memoized};
pub use options::{CacheConfig, CacheOptions, Capacity};
pub use stats::CacheStats;
pub use store::{CacheInfo, CacheStore};
pub use thread_local_store::ThreadLocalStore;

/// Memoizes `f` with an unbounded cache and no statistics.
///
/// ```
/// use memora_core::cache;
///
/// let greet = cache(|name: &(String,)| format!("hello, {}", name.0));
/// assert_eq!(greet.call(("ada".to_string(),)).unwrap(), "hello, ada");
/// assert!(greet.name().ends_with("{{closure}}"));
/// ```
pub fn cache<A, V, F>(f: F) -> Memoized<A, V>
where
    A: KeyArgs + 'static,
    V: 'static,
    F: Fn(&A) -> V + 'static,
{
    Decorator::default().apply(f)
}

/// Validates `options` and returns the configured decorator.
///
/// Fails with [`MemoError::InvalidConfiguration`] when statistics are requested for a
/// cache with capacity 0.
pub fn cache_with<G>(options: CacheOptions<G>) -> MemoResult<Decorator<G>> {
    options.build()
}
