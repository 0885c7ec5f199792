//! Response caching.
//!
//! - [`CacheConfig`]: per-service policy (default TTL, size bound, sweep
//!   interval, prefetch switches, diagnostic figures).
//!
//! - [`CacheStore`]: the keyed, TTL-aware store one executor owns. Keys are
//!   `"<route context>:<endpoint>"` so the same endpoint requested from two
//!   pages never shares an entry.
//!
//! The store is generic over the entry payload; the executor stores shared
//! futures in it so concurrent callers coalesce on one network call.

mod store;

pub use store::{CacheEntry, CacheStats, CacheStore, cache_key};

use std::time::Duration;

/// Default sweep interval for expired entries: 3 minutes.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(180);

/// Configuration for one service's response cache.
///
/// ```rust
/// # use folio::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .default_ttl(Duration::from_secs(600))
///     .max_cache_size(20)
///     .enable_prefetch(true);
/// assert_eq!(config.max_cache_size, 20);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL for endpoints without their own `cache_ttl`. Default: 5 minutes.
    pub default_ttl: Duration,
    /// Entry count above which the oldest entries are evicted. Default: 50.
    pub max_cache_size: usize,
    /// Whether `warmup_cache` issues anything. Default: true.
    pub enable_prefetch: bool,
    /// Interval of the background expiry sweep. Default: 3 minutes.
    pub cleanup_interval: Duration,
    /// Delay before prefetch requests are issued. Default: zero.
    pub prefetch_delay: Duration,
    /// Assumed bytes per entry, for the memory estimate. Default: 2 KiB.
    pub avg_entry_size: usize,
    /// Reported hit rate. A static planning figure, not a measurement;
    /// the `folio_cache_hits_total` / `folio_cache_misses_total` counters
    /// carry real numbers. Default: 0.8.
    pub expected_hit_rate: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_cache_size: 50,
            enable_prefetch: true,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            prefetch_delay: Duration::ZERO,
            avg_entry_size: 2048,
            expected_hit_rate: 0.8,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn max_cache_size(mut self, n: usize) -> Self {
        self.max_cache_size = n;
        self
    }

    pub fn enable_prefetch(mut self, enabled: bool) -> Self {
        self.enable_prefetch = enabled;
        self
    }

    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn prefetch_delay(mut self, delay: Duration) -> Self {
        self.prefetch_delay = delay;
        self
    }

    pub fn avg_entry_size(mut self, bytes: usize) -> Self {
        self.avg_entry_size = bytes;
        self
    }

    /// Set the reported hit rate, clamped to [0, 1].
    pub fn expected_hit_rate(mut self, rate: f64) -> Self {
        self.expected_hit_rate = rate.clamp(0.0, 1.0);
        self
    }
}
