//! Inference engine boundary.
//!
//! The gateway treats text generation as an opaque collaborator behind
//! [`InferenceEngine`]: prompt in, text (or a token stream) out. The crate
//! ships no model binding — a llama.cpp wrapper, an HTTP client, or a
//! scripted test double all plug in the same way.
//!
//! The engine call is the dominant blocking point of every request
//! (seconds, CPU-bound). The gateway never holds a store lock across it,
//! and assumes the engine serializes concurrent generations internally if
//! it needs to — queuing is the engine's concern, not the gateway's.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::types::{GenerateEvent, GenerateOptions, GenerateResponse};
use crate::Result;

/// Boxed stream of generation events.
pub type GenerateStream = Pin<Box<dyn Stream<Item = Result<GenerateEvent>> + Send>>;

/// Text generation backend.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Non-streaming generation: the full answer text in one call.
    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<GenerateResponse>;

    /// Streaming generation: incremental text fragments terminated by
    /// [`GenerateEvent::Done`].
    async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerateStream>;

    /// Whether the backing model is loaded and ready. The gateway rejects
    /// all query operations while this is false.
    fn is_loaded(&self) -> bool;
}
