//! Muninn - stateful query gateway for document Q&A
//!
//! This crate provides the in-memory state layer between stateless request
//! handlers and an expensive, long-running inference engine: a
//! content-addressed response cache (LRU + TTL), a session-addressed
//! conversation store (LRU + TTL), and a per-client sliding-window rate
//! limiter, tied together by a request orchestrator. The engine itself is
//! pluggable behind the [`InferenceEngine`] trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use muninn::{CacheConfig, InferenceEngine, Muninn, QueryRequest};
//!
//! # async fn run(engine: Arc<dyn InferenceEngine>) -> muninn::Result<()> {
//! let gateway = Muninn::builder()
//!     .engine(engine)
//!     .response_cache(CacheConfig::default())
//!     .build()?;
//!
//! // New conversation: document plus first question.
//! let response = gateway
//!     .query(
//!         QueryRequest::new("What are the premium payment options?")
//!             .document("This comprehensive life insurance policy provides..."),
//!     )
//!     .await?;
//!
//! // Follow-up on the same conversation.
//! let follow_up = gateway
//!     .query(
//!         QueryRequest::new("What about annual payments?")
//!             .conversation(response.conversation_id),
//!     )
//!     .await?;
//! println!("{}", follow_up.answer);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod history;
pub mod limit;
pub mod prompt;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStats, ResponseCache};
pub use engine::{GenerateStream, InferenceEngine};
pub use error::{MuninnError, Result};
pub use gateway::{GatewayStatus, GenerationDefaults, Muninn, MuninnBuilder, QueryGateway};
pub use history::{ConversationStore, HistoryConfig};
pub use limit::{RateDecision, RateLimitConfig, RateLimiter};

// Re-export all types
pub use types::{
    BatchAnswer, BatchQueryRequest, BatchResponse, ChatMessage, GenerateEvent, GenerateOptions,
    GenerateResponse, QueryEvent, QueryParams, QueryRequest, QueryResponse, QueryType, Role,
};
