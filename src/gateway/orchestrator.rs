//! QueryGateway - orchestrates stores, limiter, and engine per request.
//!
//! Control flow per query: validate → engine-ready check → resolve or
//! create the conversation → canonical parameters → cache lookup →
//! generate on miss → commit history and cache → respond. Store
//! operations are short and in-memory; the engine call always happens
//! outside any store lock.
//!
//! # Streaming
//!
//! `query_stream` drives generation from a spawned task connected to the
//! consumer by a bounded channel (backpressure: a slow consumer blocks
//! the producer rather than buffering without bound). If the consumer
//! drops mid-stream, the task still runs generation to completion and
//! commits the full text to history and cache, keeping future turns on
//! the same conversation consistent with what the model actually said.
//! A mid-stream engine error emits an in-band [`QueryEvent::Error`] and
//! discards the partial text — nothing is committed.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;

use tokio::time::Instant;

use crate::cache::{CacheConfig, CacheStats, ResponseCache};
use crate::engine::InferenceEngine;
use crate::history::{ConversationStore, HistoryConfig};
use crate::limit::{RateDecision, RateLimitConfig, RateLimiter};
use crate::prompt;
use crate::telemetry;
use crate::types::{
    BatchAnswer, BatchQueryRequest, BatchResponse, ChatMessage, GenerateEvent, GenerateOptions,
    QueryEvent, QueryParams, QueryRequest, QueryResponse, Role,
};
use crate::{MuninnError, Result};

/// Number of events buffered between the generation task and the consumer.
const STREAM_BUFFER: usize = 64;

/// Point-in-time gateway health snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    /// Whether the inference engine reports itself loaded.
    pub engine_loaded: bool,
    /// Seconds since the gateway was built.
    pub uptime_seconds: f64,
    /// Query/batch requests accepted since startup.
    pub requests_served: u64,
    /// Resident conversations (may include unswept expired entries).
    pub active_conversations: usize,
    /// Cache statistics, when a cache is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

/// The request orchestrator: one instance per process, shared by handle.
///
/// Construct via [`Muninn::builder()`](crate::Muninn::builder). All
/// methods take `&self`; the gateway is `Send + Sync` and meant to be
/// wrapped in an `Arc` at the composition root, never rebuilt per
/// request.
pub struct QueryGateway {
    engine: Arc<dyn InferenceEngine>,
    cache: Option<Arc<ResponseCache>>,
    history: Arc<ConversationStore>,
    limiter: RateLimiter,
    defaults: super::GenerationDefaults,
    started_at: Instant,
    requests_served: AtomicU64,
}

impl QueryGateway {
    pub(crate) fn new(
        engine: Arc<dyn InferenceEngine>,
        cache: Option<CacheConfig>,
        history: HistoryConfig,
        rate_limit: RateLimitConfig,
        defaults: super::GenerationDefaults,
    ) -> Self {
        Self {
            engine,
            cache: cache.map(|c| Arc::new(ResponseCache::new(&c))),
            history: Arc::new(ConversationStore::new(&history)),
            limiter: RateLimiter::new(&rate_limit),
            defaults,
            started_at: Instant::now(),
            requests_served: AtomicU64::new(0),
        }
    }

    /// Answer a single query, blocking until the full answer is ready.
    ///
    /// On a cache hit the exchange is still appended to the conversation
    /// history, so follow-ups see consistent context.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let started = Instant::now();
        let result = self.query_inner(&request, started).await;
        observe("query", started, result.is_ok());
        result
    }

    async fn query_inner(
        &self,
        request: &QueryRequest,
        started: Instant,
    ) -> Result<QueryResponse> {
        request.validate()?;
        if !self.engine.is_loaded() {
            return Err(MuninnError::EngineUnavailable);
        }
        self.requests_served.fetch_add(1, Ordering::Relaxed);

        let (conversation_id, document, history) = self.resolve_conversation(request).await?;
        let params = self.params_for(request);

        if let Some(answer) = self.cached_answer(request, &document, &params).await {
            self.commit(&conversation_id, &request.question, &answer).await;
            return Ok(QueryResponse {
                question: request.question.clone(),
                answer,
                conversation_id,
                query_type: request.query_type,
                processing_time_ms: elapsed_ms(started),
                cached: true,
            });
        }

        let prompt_text =
            prompt::build_prompt(&document, &history, &request.question, request.query_type);
        let options = self.generate_options(&params);
        let response = self.engine.generate(&prompt_text, &options).await?;
        let answer = response.text.trim().to_owned();

        self.commit(&conversation_id, &request.question, &answer).await;
        self.store_answer(request, &document, &params, &answer).await;

        Ok(QueryResponse {
            question: request.question.clone(),
            answer,
            conversation_id,
            query_type: request.query_type,
            processing_time_ms: elapsed_ms(started),
            cached: false,
        })
    }

    /// Answer a single query as a stream of incremental events.
    ///
    /// The returned stream yields [`QueryEvent::Answer`] fragments and
    /// ends with either [`QueryEvent::Done`] (history and cache
    /// committed) or an in-band [`QueryEvent::Error`] (nothing
    /// committed). Dropping the stream does not cancel generation.
    pub async fn query_stream(
        &self,
        request: QueryRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = QueryEvent> + Send>>> {
        let started = Instant::now();
        let result = self.stream_inner(request, started).await;
        if result.is_err() {
            observe("query_stream", started, false);
        }
        result
    }

    async fn stream_inner(
        &self,
        request: QueryRequest,
        started: Instant,
    ) -> Result<Pin<Box<dyn Stream<Item = QueryEvent> + Send>>> {
        request.validate()?;
        if !self.engine.is_loaded() {
            return Err(MuninnError::EngineUnavailable);
        }
        self.requests_served.fetch_add(1, Ordering::Relaxed);

        let (conversation_id, document, history) = self.resolve_conversation(&request).await?;
        let params = self.params_for(&request);

        // A cache hit streams as one fragment plus the terminal event.
        if let Some(answer) = self.cached_answer(&request, &document, &params).await {
            self.commit(&conversation_id, &request.question, &answer).await;
            observe("query_stream", started, true);
            let events = vec![
                QueryEvent::Answer(answer),
                QueryEvent::Done {
                    conversation_id,
                    processing_time_ms: elapsed_ms(started),
                },
            ];
            return Ok(Box::pin(tokio_stream::iter(events)));
        }

        let prompt_text =
            prompt::build_prompt(&document, &history, &request.question, request.query_type);
        let options = self.generate_options(&params);

        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.history);
        let cache = request
            .use_cache
            .then(|| self.cache.clone())
            .flatten();
        let question = request.question.clone();

        let (tx, rx) = tokio::sync::mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let mut stream = match engine.generate_stream(&prompt_text, &options).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(error = %err, "streaming generation failed to start");
                    let _ = tx.send(QueryEvent::Error(err.to_string())).await;
                    return;
                }
            };

            let mut accumulated = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(GenerateEvent::Text(text)) => {
                        accumulated.push_str(&text);
                        // Consumer may be gone; generation continues so the
                        // conversation still gets its committed answer.
                        let _ = tx.send(QueryEvent::Answer(text)).await;
                    }
                    Ok(GenerateEvent::Done) => break,
                    Err(err) => {
                        tracing::warn!(error = %err, "generation failed mid-stream");
                        let _ = tx.send(QueryEvent::Error(err.to_string())).await;
                        return;
                    }
                }
            }

            let answer = accumulated.trim().to_owned();
            store.append(&conversation_id, Role::User, question.as_str()).await;
            store
                .append(&conversation_id, Role::Assistant, answer.as_str())
                .await;
            if let Some(cache) = &cache {
                cache.set(&document, &question, &params, answer).await;
            }
            let _ = tx
                .send(QueryEvent::Done {
                    conversation_id,
                    processing_time_ms: elapsed_ms(started),
                })
                .await;
        });

        // Terminal events double as the metrics signal, observed on the
        // consumer side as they pass through.
        let events = ReceiverStream::new(rx).map(move |event| {
            match &event {
                QueryEvent::Done { .. } => observe("query_stream", started, true),
                QueryEvent::Error(_) => observe("query_stream", started, false),
                _ => {}
            }
            event
        });
        Ok(Box::pin(events))
    }

    /// Answer up to ten questions against one document, sequentially.
    ///
    /// Stateless: no conversation is created or consulted. Each question
    /// still goes through the response cache, so duplicates within one
    /// batch are only generated once.
    pub async fn query_batch(&self, request: BatchQueryRequest) -> Result<BatchResponse> {
        let started = Instant::now();
        let result = self.batch_inner(&request, started).await;
        observe("batch", started, result.is_ok());
        result
    }

    async fn batch_inner(
        &self,
        request: &BatchQueryRequest,
        started: Instant,
    ) -> Result<BatchResponse> {
        request.validate()?;
        if !self.engine.is_loaded() {
            return Err(MuninnError::EngineUnavailable);
        }
        self.requests_served.fetch_add(1, Ordering::Relaxed);

        let mut results = Vec::with_capacity(request.questions.len());
        for (idx, question) in request.questions.iter().enumerate() {
            let item_started = Instant::now();
            let query_type = request.query_types.as_ref().map(|types| types[idx]);
            let params = QueryParams {
                temperature: request.temperature.unwrap_or(self.defaults.temperature),
                max_tokens: request.max_tokens.unwrap_or(self.defaults.max_tokens),
                query_type,
            };

            let mut cached = false;
            let answer = match self.lookup(request.use_cache, &request.document, question, &params).await
            {
                Some(answer) => {
                    cached = true;
                    answer
                }
                None => {
                    let prompt_text =
                        prompt::build_prompt(&request.document, &[], question, query_type);
                    let options = self.generate_options(&params);
                    let response = self.engine.generate(&prompt_text, &options).await?;
                    let answer = response.text.trim().to_owned();
                    if request.use_cache
                        && let Some(cache) = &self.cache
                    {
                        cache.set(&request.document, question, &params, answer.clone()).await;
                    }
                    answer
                }
            };

            results.push(BatchAnswer {
                question: question.clone(),
                answer,
                query_type,
                processing_time_ms: elapsed_ms(item_started),
                cached,
            });
        }

        Ok(BatchResponse {
            questions_processed: results.len(),
            results,
            total_processing_time_ms: elapsed_ms(started),
        })
    }

    /// Rate-limit check for the transport boundary: `Ok` with the
    /// decision when admitted, `Err(RateLimited)` with a retry-after
    /// hint when denied.
    pub async fn check_rate(&self, client_id: &str) -> Result<RateDecision> {
        let decision = self.limiter.admit(client_id).await;
        if decision.allowed {
            Ok(decision)
        } else {
            Err(MuninnError::RateLimited {
                retry_after: decision.retry_after.unwrap_or_default(),
            })
        }
    }

    /// Direct access to the rate limiter (e.g. for middleware that wants
    /// the raw decision rather than an error).
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Whether the engine is ready to serve queries.
    pub fn is_ready(&self) -> bool {
        self.engine.is_loaded()
    }

    /// Cache statistics, or `None` when no cache is configured.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Drop all cached answers and reset cache counters. Idempotent;
    /// no-op when no cache is configured.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }

    /// Number of resident conversations.
    pub async fn active_conversations(&self) -> usize {
        self.history.active_count().await
    }

    /// Health snapshot for admin/introspection surfaces.
    pub async fn status(&self) -> GatewayStatus {
        GatewayStatus {
            engine_loaded: self.engine.is_loaded(),
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
            requests_served: self.requests_served.load(Ordering::Relaxed),
            active_conversations: self.history.active_count().await,
            cache: self.cache_stats().await,
        }
    }

    /// Resolve the conversation context for a request.
    ///
    /// Follow-up (id supplied): the stored document and history, or
    /// `ConversationNotFound`. New (document supplied): a fresh
    /// conversation with empty history. Neither: the request cannot
    /// proceed.
    async fn resolve_conversation(
        &self,
        request: &QueryRequest,
    ) -> Result<(String, String, Vec<ChatMessage>)> {
        if let Some(id) = &request.conversation_id {
            return match self.history.get(id).await {
                Some((document, history)) => Ok((id.clone(), document, history)),
                None => Err(MuninnError::ConversationNotFound(id.clone())),
            };
        }
        if let Some(document) = &request.document {
            let id = self.history.start(document.clone()).await;
            return Ok((id, document.clone(), Vec::new()));
        }
        Err(MuninnError::InvalidInput(
            "provide document text for a new conversation or a conversation_id for a follow-up"
                .into(),
        ))
    }

    fn params_for(&self, request: &QueryRequest) -> QueryParams {
        QueryParams {
            temperature: request.temperature.unwrap_or(self.defaults.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.defaults.max_tokens),
            query_type: request.query_type,
        }
    }

    fn generate_options(&self, params: &QueryParams) -> GenerateOptions {
        GenerateOptions::new()
            .temperature(params.temperature)
            .max_tokens(params.max_tokens)
            .top_p(self.defaults.top_p)
            .stop_sequences(prompt::STOP_SEQUENCES.iter().map(|s| s.to_string()).collect())
    }

    async fn cached_answer(
        &self,
        request: &QueryRequest,
        document: &str,
        params: &QueryParams,
    ) -> Option<String> {
        self.lookup(request.use_cache, document, &request.question, params)
            .await
    }

    async fn lookup(
        &self,
        use_cache: bool,
        document: &str,
        question: &str,
        params: &QueryParams,
    ) -> Option<String> {
        if !use_cache {
            return None;
        }
        let cache = self.cache.as_ref()?;
        cache.get(document, question, params).await
    }

    /// Record one exchange (user question, assistant answer) against a
    /// conversation.
    async fn commit(&self, conversation_id: &str, question: &str, answer: &str) {
        self.history.append(conversation_id, Role::User, question).await;
        self.history
            .append(conversation_id, Role::Assistant, answer)
            .await;
    }

    async fn store_answer(
        &self,
        request: &QueryRequest,
        document: &str,
        params: &QueryParams,
        answer: &str,
    ) {
        if !request.use_cache {
            return;
        }
        if let Some(cache) = &self.cache {
            cache.set(document, &request.question, params, answer).await;
        }
    }

}

fn observe(operation: &'static str, started: Instant, ok: bool) {
    let status = if ok { "ok" } else { "error" };
    metrics::counter!(telemetry::REQUESTS_TOTAL, "operation" => operation, "status" => status)
        .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

/// Milliseconds elapsed since `started`, rounded to two decimals.
fn elapsed_ms(started: Instant) -> f64 {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    (ms * 100.0).round() / 100.0
}
