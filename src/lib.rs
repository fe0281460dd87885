//! # Memora
//!
//! Memoization for Rust functions: remember the results a computation has produced,
//! keyed by its arguments, and answer repeated calls from that record.
//!
//! ## Features
//!
//! - **Easy to use**: add `#[cache]` to a function or method, or wrap a closure at runtime
//! - **Bounded caches**: optional capacity with least-recently-used eviction
//! - **Opt-in statistics**: hit/miss counters, reported as absent when not tracked
//! - **Custom keys**: derive the key from a subset or a projection of the arguments
//! - **Result-aware**: only `Ok` values are cached
//! - **Thread-local**: no locks; each thread owns its caches
//!
//! ## Quick Start
//!
//! ```rust
//! use memora::cache;
//!
//! #[cache]
//! fn fibonacci(n: u32) -> u64 {
//!     if n <= 1 {
//!         return n as u64;
//!     }
//!     fibonacci(n - 1) + fibonacci(n - 2)
//! }
//!
//! // First call computes the result
//! let result1 = fibonacci(40);
//! // Second call returns the cached result
//! let result2 = fibonacci(40);
//! assert_eq!(result1, result2);
//! ```
//!
//! ## Bounded Caches and Statistics
//!
//! ```rust
//! use memora::{cache, registry, Capacity};
//!
//! #[cache(capacity = 2, stats = true)]
//! fn square(x: u64) -> u64 {
//!     x * x
//! }
//!
//! for x in [1, 1, 2, 2, 3] {
//!     square(x);
//! }
//!
//! let info = registry::info("square").unwrap();
//! assert_eq!(info.capacity, Capacity::Bounded(2));
//! assert_eq!((info.hits, info.misses, info.len), (Some(2), Some(3), 2));
//! ```
//!
//! ## Runtime Decorators
//!
//! Closures and function values can be wrapped without the attribute:
//!
//! ```rust
//! use memora::{cache_with, CacheOptions};
//!
//! let decorator = cache_with(
//!     CacheOptions::new()
//!         .track_stats(true)
//!         .key_fn(|args: &(u32, u32)| args.0),
//! )?;
//! let product = decorator.apply(|args: &(u32, u32)| args.0 * args.1);
//!
//! assert_eq!(product.call((3, 100_000))?, 300_000);
//! // same key, so the cached result is returned
//! assert_eq!(product.call((3, 1))?, 300_000);
//! assert_eq!(product.cache().unwrap().hits(), Some(1));
//! # Ok::<(), memora::MemoError>(())
//! ```
//!
//! ## Custom Cache Keys
//!
//! ```rust
//! use memora::{cache, CacheableKey, DefaultCacheableKey};
//!
//! #[derive(Debug, Clone)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! // Debug-based key
//! impl DefaultCacheableKey for Point {}
//!
//! #[derive(Debug, Clone)]
//! struct UserId {
//!     id: u64,
//!     display_name: String,
//! }
//!
//! // Only the id identifies a user
//! impl CacheableKey for UserId {
//!     fn to_cache_key(&self) -> String {
//!         format!("user:{}", self.id)
//!     }
//! }
//!
//! #[cache]
//! fn distance(p: Point) -> f64 {
//!     f64::from(p.x * p.x + p.y * p.y).sqrt()
//! }
//!
//! assert_eq!(distance(Point { x: 3, y: 4 }), 5.0);
//! ```
//!
//! ## Caching with Methods
//!
//! ```rust
//! use memora::{cache, DefaultCacheableKey};
//!
//! #[derive(Debug, Clone)]
//! struct Calculator {
//!     precision: u32,
//! }
//!
//! impl DefaultCacheableKey for Calculator {}
//!
//! impl Calculator {
//!     // the instance is part of the key
//!     #[cache]
//!     fn scaled(&self, value: f64) -> f64 {
//!         value * 10f64.powi(self.precision as i32)
//!     }
//! }
//!
//! let calc = Calculator { precision: 2 };
//! assert_eq!(calc.scaled(1.5), 150.0);
//! ```
//!
//! ## Thread Safety
//!
//! Caches created by `#[cache]` are thread-local, and runtime wrappers keep their store in
//! a `RefCell`, so neither is shared across threads.

extern crate self as memora;

pub use memora_core::*;
pub use memora_macros::cache;
