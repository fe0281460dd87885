use std::fmt;

/// Hit/miss counters for one cache.
///
/// Counters are owned by the [`CacheStore`](crate::CacheStore) they describe and are
/// updated through `&mut` access: a store is never shared between threads, so plain
/// integers are enough. Counters only ever increase, and `hits + misses` equals the
/// number of lookups performed.
///
/// # Examples
///
/// ```
/// use memora_core::CacheStats;
///
/// let mut stats = CacheStats::new();
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
///
/// assert_eq!(stats.total_accesses(), 3);
/// assert_eq!(stats.to_string(), "2 hits, 1 misses");
/// assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    hits: u64,
    misses: u64,
}

impl CacheStats {
    pub const fn new() -> Self {
        Self { hits: 0, misses: 0 }
    }

    #[inline]
    pub fn record_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    #[inline]
    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hits plus misses.
    #[inline]
    pub fn total_accesses(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Share of lookups answered from the cache, `0.0` before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        self.share(self.hits)
    }

    pub fn miss_rate(&self) -> f64 {
        self.share(self.misses)
    }

    fn share(&self, count: u64) -> f64 {
        match self.total_accesses() {
            0 => 0.0,
            lookups => count as f64 / lookups as f64,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hits, {} misses", self.hits, self.misses)
    }
}
