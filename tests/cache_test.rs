//! Tests for [`ResponseCache`] — strict LRU + lazy TTL over content keys.

use std::time::Duration;

use muninn::cache::{CacheConfig, ResponseCache};
use muninn::types::{QueryParams, QueryType};

fn params() -> QueryParams {
    QueryParams {
        temperature: 0.7,
        max_tokens: 512,
        query_type: None,
    }
}

const DOC: &str = "policy text describing coverage, deductibles, and exclusions";

// =========================================================================
// CacheConfig
// =========================================================================

#[test]
fn cache_config_defaults() {
    let config = CacheConfig::default();
    assert_eq!(config.max_entries, 100);
    assert_eq!(config.ttl, Duration::from_secs(24 * 3600));
}

#[test]
fn cache_config_builder() {
    let config = CacheConfig::new()
        .max_entries(500)
        .ttl(Duration::from_secs(60));
    assert_eq!(config.max_entries, 500);
    assert_eq!(config.ttl, Duration::from_secs(60));
}

// =========================================================================
// Basic get/set
// =========================================================================

#[tokio::test]
async fn miss_then_set_then_hit() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let p = QueryParams {
        temperature: 0.7,
        max_tokens: 512,
        query_type: None,
    };

    assert!(cache.get(DOC, "What is the deductible?", &p).await.is_none());

    cache
        .set(DOC, "What is the deductible?", &p, "The deductible is $500.")
        .await;

    let hit = cache.get(DOC, "What is the deductible?", &p).await;
    assert_eq!(hit.as_deref(), Some("The deductible is $500."));

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn repeated_gets_are_deterministic() {
    let cache = ResponseCache::new(&CacheConfig::default());
    cache.set(DOC, "question here", &params(), "answer").await;

    let first = cache.get(DOC, "question here", &params()).await;
    let second = cache.get(DOC, "question here", &params()).await;
    assert_eq!(first, second);
    assert_eq!(first.as_deref(), Some("answer"));
}

#[tokio::test]
async fn different_params_are_different_entries() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let hot = QueryParams {
        temperature: 1.5,
        ..params()
    };
    cache.set(DOC, "question here", &params(), "cold answer").await;

    assert!(cache.get(DOC, "question here", &hot).await.is_none());
}

#[tokio::test]
async fn query_type_participates_in_key() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let tagged = QueryParams {
        query_type: Some(QueryType::Coverage),
        ..params()
    };
    cache.set(DOC, "question here", &params(), "untagged").await;
    cache.set(DOC, "question here", &tagged, "tagged").await;

    assert_eq!(
        cache.get(DOC, "question here", &params()).await.as_deref(),
        Some("untagged")
    );
    assert_eq!(
        cache.get(DOC, "question here", &tagged).await.as_deref(),
        Some("tagged")
    );
}

#[tokio::test]
async fn overwrite_replaces_answer() {
    let cache = ResponseCache::new(&CacheConfig::default());
    cache.set(DOC, "question here", &params(), "first").await;
    cache.set(DOC, "question here", &params(), "second").await;

    assert_eq!(
        cache.get(DOC, "question here", &params()).await.as_deref(),
        Some("second")
    );
    assert_eq!(cache.stats().await.size, 1);
}

// =========================================================================
// LRU eviction
// =========================================================================

#[tokio::test]
async fn capacity_is_a_hard_ceiling() {
    let cache = ResponseCache::new(&CacheConfig::new().max_entries(2));
    cache.set(DOC, "question one?", &params(), "a1").await;
    cache.set(DOC, "question two?", &params(), "a2").await;
    cache.set(DOC, "question three?", &params(), "a3").await;

    assert_eq!(cache.stats().await.size, 2);
}

#[tokio::test]
async fn evicts_least_recently_touched() {
    let cache = ResponseCache::new(&CacheConfig::new().max_entries(2));
    cache.set(DOC, "question one?", &params(), "a1").await;
    cache.set(DOC, "question two?", &params(), "a2").await;

    // Touch "one" so "two" becomes the LRU victim.
    assert!(cache.get(DOC, "question one?", &params()).await.is_some());

    cache.set(DOC, "question three?", &params(), "a3").await;

    assert!(cache.get(DOC, "question one?", &params()).await.is_some());
    assert!(cache.get(DOC, "question two?", &params()).await.is_none());
    assert!(cache.get(DOC, "question three?", &params()).await.is_some());
}

#[tokio::test]
async fn set_promotes_recency() {
    let cache = ResponseCache::new(&CacheConfig::new().max_entries(2));
    cache.set(DOC, "question one?", &params(), "a1").await;
    cache.set(DOC, "question two?", &params(), "a2").await;
    // Re-set "one": now "two" is oldest.
    cache.set(DOC, "question one?", &params(), "a1-again").await;
    cache.set(DOC, "question three?", &params(), "a3").await;

    assert!(cache.get(DOC, "question two?", &params()).await.is_none());
    assert_eq!(
        cache.get(DOC, "question one?", &params()).await.as_deref(),
        Some("a1-again")
    );
}

// =========================================================================
// TTL expiry (lazy, on read)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn expired_entry_is_removed_on_read() {
    let cache = ResponseCache::new(&CacheConfig::new().ttl(Duration::from_secs(60)));
    cache.set(DOC, "question here", &params(), "answer").await;

    tokio::time::advance(Duration::from_secs(61)).await;

    assert!(cache.get(DOC, "question here", &params()).await.is_none());
    let stats = cache.stats().await;
    assert_eq!(stats.size, 0, "expired entry removed as a side effect");
    assert_eq!(stats.misses, 1);
}

#[tokio::test(start_paused = true)]
async fn fresh_entry_survives_within_ttl() {
    let cache = ResponseCache::new(&CacheConfig::new().ttl(Duration::from_secs(60)));
    cache.set(DOC, "question here", &params(), "answer").await;

    tokio::time::advance(Duration::from_secs(59)).await;

    assert!(cache.get(DOC, "question here", &params()).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn expired_but_unread_entry_occupies_a_slot() {
    let cache = ResponseCache::new(
        &CacheConfig::new()
            .max_entries(2)
            .ttl(Duration::from_secs(60)),
    );
    cache.set(DOC, "stale question?", &params(), "stale").await;
    tokio::time::advance(Duration::from_secs(61)).await;

    // Never read the stale entry; it still counts toward capacity and
    // ages out by LRU pressure.
    cache.set(DOC, "fresh one?", &params(), "f1").await;
    assert_eq!(cache.stats().await.size, 2);

    cache.set(DOC, "fresh two?", &params(), "f2").await;
    assert_eq!(cache.stats().await.size, 2);
    assert!(cache.get(DOC, "fresh one?", &params()).await.is_some());
    assert!(cache.get(DOC, "fresh two?", &params()).await.is_some());
}

// =========================================================================
// Stats and clear
// =========================================================================

#[tokio::test]
async fn hit_rate_is_zero_without_traffic() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let stats = cache.stats().await;
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.hit_rate_percent, 0.0);
}

#[tokio::test]
async fn hit_rate_is_a_percentage() {
    let cache = ResponseCache::new(&CacheConfig::default());
    cache.set(DOC, "question here", &params(), "answer").await;

    assert!(cache.get(DOC, "question here", &params()).await.is_some());
    assert!(cache.get(DOC, "other question", &params()).await.is_none());

    let stats = cache.stats().await;
    assert_eq!(stats.hit_rate_percent, 50.0);
    assert_eq!(stats.max_size, 100);
}

#[tokio::test]
async fn clear_drops_entries_and_resets_counters() {
    let cache = ResponseCache::new(&CacheConfig::default());
    cache.set(DOC, "question here", &params(), "answer").await;
    let _ = cache.get(DOC, "question here", &params()).await;
    let _ = cache.get(DOC, "missing", &params()).await;

    cache.clear().await;

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.size, 0);
    assert!(cache.get(DOC, "question here", &params()).await.is_none());
}
