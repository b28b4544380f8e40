//! Content-addressed response cache with strict LRU eviction and lazy TTL.
//!
//! [`ResponseCache`] maps (document, question, parameters) to a previously
//! generated answer. Identical repeated queries skip the engine entirely,
//! which matters when a single generation takes seconds.
//!
//! # Key derivation
//!
//! The key is a SHA-256 hex digest over a bounded document prefix (first
//! [`KEY_DOCUMENT_PREFIX_CHARS`] characters), the full question text, and
//! the canonically serialized parameter set. Bounding the prefix caps
//! hashing cost on huge documents; combined with the question and
//! parameters the collision risk is negligible. This is deliberately
//! *exact-match*: two documents identical within the prefix, with
//! identical questions and parameters, share a key — an accepted
//! approximation, not a bug.
//!
//! Parameters are canonicalized before hashing (sorted field names), so
//! the key is a pure function of the parameter *values* regardless of
//! insertion order.
//!
//! # Eviction
//!
//! Strict LRU by touch (`get` hit or `set`), with the capacity ceiling
//! enforced before inserting a new key — the cache never holds more than
//! `max_entries` distinct keys. TTL is checked lazily on read: an expired
//! entry is removed (and counted as a miss) the first time it is read, but
//! an expired-but-unread entry keeps occupying its slot until read or
//! pushed out by LRU pressure. There is no background sweep.

use std::collections::{HashMap, VecDeque};

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::telemetry;
use crate::types::QueryParams;

/// Number of leading document characters that participate in the key.
pub const KEY_DOCUMENT_PREFIX_CHARS: usize = 500;

/// Configuration for the response cache.
///
/// Pass to [`MuninnBuilder::response_cache()`](crate::MuninnBuilder::response_cache)
/// to activate caching. Without this, no cache is allocated (zero overhead).
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached answers. Default: 100.
    pub max_entries: usize,
    /// Time-to-live for cached answers. Default: 24 hours.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached answers.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n.max(1);
        self
    }

    /// Set the time-to-live for cached answers.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Hits as a percentage of all lookups, rounded to two decimals.
    /// Zero when there has been no traffic.
    pub hit_rate_percent: f64,
    pub size: usize,
    pub max_size: usize,
}

struct CacheEntry {
    answer: String,
    stored_at: Instant,
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Recency list: front = least recently used, back = most recent.
    recency: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl CacheState {
    /// Move `key` to the most-recently-used position.
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
    }
}

/// In-memory LRU + TTL cache for generated answers.
///
/// All operations take one short-lived internal lock; nothing here ever
/// blocks on the inference engine. See the module docs for key derivation
/// and eviction semantics.
pub struct ResponseCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                recency: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
            max_entries: config.max_entries,
            ttl: config.ttl,
        }
    }

    /// Look up a cached answer.
    ///
    /// A fresh hit promotes the entry to most-recently-used. A stale entry
    /// is removed and counted as a miss (lazy TTL expiry). Emits cache
    /// hit/miss metrics.
    pub async fn get(&self, document: &str, question: &str, params: &QueryParams) -> Option<String> {
        let key = cache_key(document, question, params);
        let mut state = self.state.lock().await;

        let lookup = state
            .entries
            .get(&key)
            .map(|entry| (entry.stored_at.elapsed() < self.ttl, entry.answer.clone()));

        match lookup {
            Some((true, answer)) => {
                state.hits += 1;
                state.touch(&key);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(answer)
            }
            Some((false, _)) => {
                tracing::debug!(key = %&key[..12], "cache entry expired, removing");
                state.remove(&key);
                state.misses += 1;
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            None => {
                state.misses += 1;
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store an answer, evicting the least-recently-used entry first if
    /// the cache is at capacity and the key is new. Overwriting an
    /// existing key refreshes its timestamp and recency.
    pub async fn set(
        &self,
        document: &str,
        question: &str,
        params: &QueryParams,
        answer: impl Into<String>,
    ) {
        let key = cache_key(document, question, params);
        let mut state = self.state.lock().await;

        if state.entries.len() >= self.max_entries && !state.entries.contains_key(&key) {
            if let Some(oldest) = state.recency.pop_front() {
                tracing::debug!(key = %&oldest[..12], "evicting LRU cache entry");
                state.entries.remove(&oldest);
                metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(1);
            }
        }

        state.entries.insert(
            key.clone(),
            CacheEntry {
                answer: answer.into(),
                stored_at: Instant::now(),
            },
        );
        state.touch(&key);
    }

    /// Current statistics snapshot.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        let total = state.hits + state.misses;
        let hit_rate = if total > 0 {
            let rate = state.hits as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        } else {
            0.0
        };
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            hit_rate_percent: hit_rate,
            size: state.entries.len(),
            max_size: self.max_entries,
        }
    }

    /// Drop all entries and reset the hit/miss counters.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.recency.clear();
        state.hits = 0;
        state.misses = 0;
    }
}

/// Compute the cache key for a (document, question, parameters) triple.
///
/// The parameter set is serialized through `serde_json::Value`, whose
/// object representation keeps keys sorted, so field order never leaks
/// into the digest.
fn cache_key(document: &str, question: &str, params: &QueryParams) -> String {
    let canonical = serde_json::json!({
        "max_tokens": params.max_tokens,
        "query_type": params.query_type,
        "temperature": params.temperature,
    })
    .to_string();

    let prefix: String = document.chars().take(KEY_DOCUMENT_PREFIX_CHARS).collect();

    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    hasher.update(question.as_bytes());
    hasher.update(b"|");
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
