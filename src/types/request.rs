//! Request/response surface exposed to transport layers.
//!
//! These types are serde-serializable so an HTTP (or other) front-end can
//! expose them directly. Validation happens here, before the gateway
//! touches any store — a rejected request has no side effects.

use serde::{Deserialize, Serialize};

use crate::error::{MuninnError, Result};
use crate::types::QueryType;

/// Minimum question length, in characters.
pub const MIN_QUESTION_CHARS: usize = 5;
/// Maximum question length, in characters.
pub const MAX_QUESTION_CHARS: usize = 500;
/// Minimum document length, in characters.
pub const MIN_DOCUMENT_CHARS: usize = 10;
/// Maximum document length, in characters.
pub const MAX_DOCUMENT_CHARS: usize = 50_000;
/// Maximum number of questions in one batch request.
pub const MAX_BATCH_QUESTIONS: usize = 10;
/// Minimum sampling temperature override.
pub const MIN_TEMPERATURE: f32 = 0.0;
/// Maximum sampling temperature override.
pub const MAX_TEMPERATURE: f32 = 2.0;
/// Minimum max-tokens override.
pub const MIN_MAX_TOKENS: usize = 50;
/// Maximum max-tokens override.
pub const MAX_MAX_TOKENS: usize = 4096;

fn default_use_cache() -> bool {
    true
}

/// A single document query: either a new conversation (document supplied)
/// or a follow-up (conversation id supplied).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Document text. Required for new conversations, ignored on follow-ups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,

    /// Question about the document.
    pub question: String,

    /// Id of an existing conversation for follow-up questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    /// Query-type tag for optimised prompting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,

    /// Per-request temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Per-request max-tokens override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Whether to consult and populate the response cache. Default: true.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl QueryRequest {
    /// Create a request for the given question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            document: None,
            question: question.into(),
            conversation_id: None,
            query_type: None,
            temperature: None,
            max_tokens: None,
            use_cache: true,
        }
    }

    /// Supply document text (starts a new conversation).
    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Reference an existing conversation (follow-up question).
    pub fn conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Tag the query type.
    pub fn query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = Some(query_type);
        self
    }

    /// Override the default temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override the default max tokens.
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Opt out of (or back into) response caching.
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Validate field lengths and parameter overrides. The
    /// document/conversation-id presence rule is checked by the gateway
    /// during conversation resolution.
    pub fn validate(&self) -> Result<()> {
        validate_question(&self.question)?;
        if let Some(document) = &self.document {
            validate_document(document)?;
        }
        validate_overrides(self.temperature, self.max_tokens)?;
        Ok(())
    }
}

/// A batch of questions against one document. Stateless: no conversation
/// is created or consulted, and streaming is not available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchQueryRequest {
    /// Document text all questions run against.
    pub document: String,

    /// Questions to process, in order.
    pub questions: Vec<String>,

    /// Optional per-question type tags; length must match `questions`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_types: Option<Vec<QueryType>>,

    /// Temperature applied to every question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max tokens applied to every question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Whether to consult and populate the response cache. Default: true.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl BatchQueryRequest {
    /// Create a batch request for the given document and questions.
    pub fn new(document: impl Into<String>, questions: Vec<String>) -> Self {
        Self {
            document: document.into(),
            questions,
            query_types: None,
            temperature: None,
            max_tokens: None,
            use_cache: true,
        }
    }

    /// Tag each question with a query type (must match `questions` in length).
    pub fn query_types(mut self, query_types: Vec<QueryType>) -> Self {
        self.query_types = Some(query_types);
        self
    }

    /// Override the default temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Override the default max tokens.
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Opt out of (or back into) response caching.
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Validate the document, every question, and the tag/question pairing.
    pub fn validate(&self) -> Result<()> {
        validate_document(&self.document)?;
        if self.questions.is_empty() {
            return Err(MuninnError::InvalidInput(
                "batch must contain at least one question".into(),
            ));
        }
        if self.questions.len() > MAX_BATCH_QUESTIONS {
            return Err(MuninnError::InvalidInput(format!(
                "batch is limited to {MAX_BATCH_QUESTIONS} questions, got {}",
                self.questions.len()
            )));
        }
        for question in &self.questions {
            validate_question(question)?;
        }
        validate_overrides(self.temperature, self.max_tokens)?;
        if let Some(query_types) = &self.query_types
            && query_types.len() != self.questions.len()
        {
            return Err(MuninnError::InvalidInput(format!(
                "query_types length ({}) must match questions length ({})",
                query_types.len(),
                self.questions.len()
            )));
        }
        Ok(())
    }
}

fn validate_question(question: &str) -> Result<()> {
    let chars = question.chars().count();
    if !(MIN_QUESTION_CHARS..=MAX_QUESTION_CHARS).contains(&chars) {
        return Err(MuninnError::InvalidInput(format!(
            "question must be {MIN_QUESTION_CHARS}..={MAX_QUESTION_CHARS} characters, got {chars}"
        )));
    }
    Ok(())
}

fn validate_overrides(temperature: Option<f32>, max_tokens: Option<usize>) -> Result<()> {
    if let Some(temperature) = temperature
        && !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature)
    {
        return Err(MuninnError::InvalidInput(format!(
            "temperature must be {MIN_TEMPERATURE}..={MAX_TEMPERATURE}, got {temperature}"
        )));
    }
    if let Some(max_tokens) = max_tokens
        && !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&max_tokens)
    {
        return Err(MuninnError::InvalidInput(format!(
            "max_tokens must be {MIN_MAX_TOKENS}..={MAX_MAX_TOKENS}, got {max_tokens}"
        )));
    }
    Ok(())
}

fn validate_document(document: &str) -> Result<()> {
    let chars = document.chars().count();
    if !(MIN_DOCUMENT_CHARS..=MAX_DOCUMENT_CHARS).contains(&chars) {
        return Err(MuninnError::InvalidInput(format!(
            "document must be {MIN_DOCUMENT_CHARS}..={MAX_DOCUMENT_CHARS} characters, got {chars}"
        )));
    }
    Ok(())
}

/// The canonical parameter set a query runs with, after defaults are
/// applied. Part of the cache key: identical parameters must always
/// serialize identically (see [`ResponseCache`](crate::cache::ResponseCache)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub temperature: f32,
    pub max_tokens: usize,
    pub query_type: Option<QueryType>,
}

/// Answer to a single (non-streaming) query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The question as asked.
    pub question: String,
    /// Generated (or cached) answer text.
    pub answer: String,
    /// Conversation the exchange was recorded under.
    pub conversation_id: String,
    /// Query-type tag, if one was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    /// Wall-clock time spent serving this request, in milliseconds.
    pub processing_time_ms: f64,
    /// Whether the answer came from the response cache.
    pub cached: bool,
}

/// Events emitted on a streaming query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[non_exhaustive]
pub enum QueryEvent {
    /// Incremental answer fragment.
    #[serde(rename = "answer")]
    Answer(String),

    /// Stream complete; history and cache have been committed.
    #[serde(rename = "done")]
    Done {
        conversation_id: String,
        processing_time_ms: f64,
    },

    /// Generation failed mid-stream. Fragments already emitted are not
    /// committed to history or cache; this is the final event.
    #[serde(rename = "error")]
    Error(String),
}

/// Answer to one question within a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnswer {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    pub processing_time_ms: f64,
    pub cached: bool,
}

/// Response for a whole batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub results: Vec<BatchAnswer>,
    pub total_processing_time_ms: f64,
    pub questions_processed: usize,
}
