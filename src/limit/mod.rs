//! Per-client sliding-window rate limiting.
//!
//! [`RateLimiter`] admits at most `max_requests` requests per client in
//! any trailing window of `window` duration. This is a sliding-window
//! counter, not a token bucket: there is no burst credit beyond the
//! window count. Denied attempts are not recorded, so a client hammering
//! the limiter does not extend its own lockout.
//!
//! The transport layer is expected to call [`admit`](RateLimiter::admit)
//! keyed by client network identity before any gateway operation.
//!
//! # Idle-client eviction
//!
//! Each distinct client id gets an entry in the client map. To keep the
//! map from growing without bound, an entry is dropped as soon as its
//! window empties, and a lazy sweep (piggybacked on `admit`, at most once
//! per window duration) clears clients whose every recorded request has
//! aged out.

use std::collections::{HashMap, VecDeque};

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::telemetry;

/// Configuration for the rate limiter.
///
/// ```rust
/// # use muninn::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .max_requests(20)
///     .window(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per client per window. Default: 100.
    pub max_requests: usize,
    /// Trailing window duration. Default: 60 seconds.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-window request maximum.
    pub fn max_requests(mut self, n: usize) -> Self {
        self.max_requests = n;
        self
    }

    /// Set the window duration.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request was admitted (and recorded).
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: usize,
    /// When denied, how long until the oldest recorded request rolls out
    /// of the window. `None` when admitted.
    pub retry_after: Option<Duration>,
}

struct LimiterState {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window request admission control, one window per client id.
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a new limiter with the given configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            max_requests: config.max_requests,
            window: config.window,
        }
    }

    /// Check whether a request from `client_id` is admitted.
    ///
    /// Admitted requests are recorded against the client's window; denied
    /// attempts are not.
    pub async fn admit(&self, client_id: &str) -> RateDecision {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        if now.duration_since(state.last_sweep) >= self.window {
            self.sweep(&mut state, now);
            state.last_sweep = now;
        }

        let history = state.clients.entry(client_id.to_owned()).or_default();
        trim_window(history, now, self.window);

        if history.len() < self.max_requests {
            history.push_back(now);
            let remaining = self.max_requests - history.len();
            return RateDecision {
                allowed: true,
                remaining,
                retry_after: None,
            };
        }

        let retry_after = history
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(self.window);
        // max_requests == 0 leaves the entry permanently empty; drop it.
        if history.is_empty() {
            state.clients.remove(client_id);
        }
        tracing::debug!(client = %client_id, ?retry_after, "rate limit exceeded");
        metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
        RateDecision {
            allowed: false,
            remaining: 0,
            retry_after: Some(retry_after),
        }
    }

    /// Number of clients currently tracked. Shrinks as idle clients are
    /// swept; useful for introspection and tests.
    pub async fn client_count(&self) -> usize {
        self.state.lock().await.clients.len()
    }

    fn sweep(&self, state: &mut LimiterState, now: Instant) {
        let window = self.window;
        state.clients.retain(|_, history| {
            trim_window(history, now, window);
            !history.is_empty()
        });
    }
}

/// Prefix-trim instants older than `now - window`. Timestamps are pushed
/// in time order, so expiry is always a pop from the front.
fn trim_window(history: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while history
        .front()
        .is_some_and(|t| now.duration_since(*t) > window)
    {
        history.pop_front();
    }
}
