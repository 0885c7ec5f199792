//! Telemetry metric name constants.
//!
//! Centralised metric names for folio operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `folio_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `service`: domain service name (e.g. "skills", "projects")
//! - `endpoint`: endpoint identifier (e.g. "SKILLS_STATS")
//! - `status`: "ok" or "fallback"

/// Total network requests settled by an executor.
///
/// Labels: `service`, `endpoint`, `status` ("ok" | "fallback").
pub const REQUESTS_TOTAL: &str = "folio_requests_total";

/// Network request duration in seconds, retries included.
///
/// Labels: `service`, `endpoint`.
pub const REQUEST_DURATION_SECONDS: &str = "folio_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `service`, `endpoint`.
pub const RETRIES_TOTAL: &str = "folio_retries_total";

/// Total requests served from a fresh cache entry.
///
/// Labels: `service`, `endpoint`.
pub const CACHE_HITS_TOTAL: &str = "folio_cache_hits_total";

/// Total requests that had to go to the network.
///
/// Labels: `service`, `endpoint`.
pub const CACHE_MISSES_TOTAL: &str = "folio_cache_misses_total";

/// Total entries removed by size maintenance or expiry sweeps.
///
/// Labels: `service`, `reason` ("size" | "expired").
pub const CACHE_EVICTIONS_TOTAL: &str = "folio_cache_evictions_total";

/// Total requests that resolved to their fallback value.
///
/// Labels: `service`, `endpoint`.
pub const FALLBACKS_TOTAL: &str = "folio_fallbacks_total";
