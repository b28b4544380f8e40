//! Muninn error types

use std::time::Duration;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    /// The inference engine reports itself unloaded. All query operations
    /// are rejected until it comes up; the transport layer maps this to a
    /// service-unavailable signal.
    #[error("inference engine not loaded")]
    EngineUnavailable,

    /// The referenced conversation id is unknown or has expired.
    ///
    /// Surfaced distinctly so callers can tell "start a new conversation"
    /// apart from other failures.
    #[error("conversation not found or expired: {0}")]
    ConversationNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Admission denied by the rate limiter. `retry_after` is the time
    /// until the oldest recorded request rolls out of the window.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The engine failed during a non-streaming call. No cache or history
    /// mutation has happened when this is returned.
    #[error("generation failed: {0}")]
    Generation(String),

    // Streaming errors
    #[error("stream error: {0}")]
    Stream(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("no inference engine configured")]
    NoEngine,

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
