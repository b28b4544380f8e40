//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation` — gateway operation (e.g. "query", "query_stream", "batch")
//! - `status` — outcome: "ok" or "error"

/// Total query requests dispatched through the gateway.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "muninn_requests_total";

/// Request duration in seconds.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "muninn_request_duration_seconds";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total response cache misses (includes lazy TTL expiries).
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total response cache entries evicted by LRU capacity pressure.
pub const CACHE_EVICTIONS_TOTAL: &str = "muninn_cache_evictions_total";

/// Total conversations removed by TTL sweep or LRU trimming.
///
/// Labels: `reason` ("expired" | "capacity").
pub const CONVERSATIONS_EVICTED_TOTAL: &str = "muninn_conversations_evicted_total";

/// Total requests denied by the rate limiter.
pub const RATE_LIMITED_TOTAL: &str = "muninn_rate_limited_total";
