//! Builder for configuring gateway instances

use std::sync::Arc;

use super::QueryGateway;
use crate::cache::CacheConfig;
use crate::engine::InferenceEngine;
use crate::history::HistoryConfig;
use crate::limit::RateLimitConfig;
use crate::{MuninnError, Result};

/// Main entry point for creating gateway instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }
}

/// Generation parameters applied when a request doesn't override them.
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    /// Default sampling temperature. Default: 0.7.
    pub temperature: f32,
    /// Default generation budget in tokens. Default: 2048.
    pub max_tokens: usize,
    /// Nucleus sampling threshold passed to every call. Default: 0.95.
    pub top_p: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
            top_p: 0.95,
        }
    }
}

impl GenerationDefaults {
    /// Create defaults with the standard values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens.
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the top_p threshold.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// Builder for configuring gateway instances.
///
/// An inference engine is required; everything else carries defaults.
/// The response cache is opt-in — without
/// [`response_cache`](MuninnBuilder::response_cache) no cache is
/// allocated and every request generates.
pub struct MuninnBuilder {
    engine: Option<Arc<dyn InferenceEngine>>,
    cache: Option<CacheConfig>,
    history: HistoryConfig,
    rate_limit: RateLimitConfig,
    defaults: GenerationDefaults,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            cache: None,
            history: HistoryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            defaults: GenerationDefaults::default(),
        }
    }

    /// Set the inference engine (required).
    pub fn engine(mut self, engine: Arc<dyn InferenceEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Enable the response cache with the given configuration.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Configure the conversation store.
    pub fn history(mut self, config: HistoryConfig) -> Self {
        self.history = config;
        self
    }

    /// Configure the rate limiter.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Configure default generation parameters.
    pub fn generation_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<QueryGateway> {
        let engine = self.engine.ok_or(MuninnError::NoEngine)?;
        Ok(QueryGateway::new(
            engine,
            self.cache,
            self.history,
            self.rate_limit,
            self.defaults,
        ))
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
