//! Shared test doubles: scripted inference engines.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use muninn::{
    GenerateEvent, GenerateOptions, GenerateResponse, GenerateStream, InferenceEngine,
    MuninnError, Result,
};

/// Engine that answers every prompt with a fixed reply and records each
/// prompt it saw. Streaming splits the reply into the configured chunks.
pub struct ScriptedEngine {
    reply: String,
    chunks: Vec<String>,
    loaded: AtomicBool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self {
            chunks: vec![reply.clone()],
            reply,
            loaded: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Override the fragments emitted by `generate_stream`.
    pub fn with_chunks(mut self, chunks: Vec<&str>) -> Self {
        self.chunks = chunks.into_iter().map(String::from).collect();
        self
    }

    pub fn unloaded(self) -> Self {
        self.loaded.store(false, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    fn record(&self, prompt: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_owned());
    }
}

#[async_trait]
impl InferenceEngine for ScriptedEngine {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<GenerateResponse> {
        self.record(prompt);
        Ok(GenerateResponse {
            text: self.reply.clone(),
        })
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<GenerateStream> {
        self.record(prompt);
        let events: Vec<Result<GenerateEvent>> = self
            .chunks
            .iter()
            .cloned()
            .map(|c| Ok(GenerateEvent::Text(c)))
            .chain(std::iter::once(Ok(GenerateEvent::Done)))
            .collect();
        Ok(Box::pin(tokio_stream::iter(events)))
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

/// Engine whose every generation fails. Streaming yields the configured
/// number of fragments before erroring mid-stream.
pub struct FailingEngine {
    pub chunks_before_error: usize,
    calls: AtomicUsize,
}

impl FailingEngine {
    pub fn new() -> Self {
        Self {
            chunks_before_error: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn chunks_before_error(mut self, n: usize) -> Self {
        self.chunks_before_error = n;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for FailingEngine {
    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<GenerateResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MuninnError::Generation("model exploded".into()))
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<GenerateStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let events: Vec<Result<GenerateEvent>> = (0..self.chunks_before_error)
            .map(|i| Ok(GenerateEvent::Text(format!("chunk-{i} "))))
            .chain(std::iter::once(Err(MuninnError::Generation(
                "model exploded".into(),
            ))))
            .collect();
        Ok(Box::pin(tokio_stream::iter(events)))
    }

    fn is_loaded(&self) -> bool {
        true
    }
}

/// Engine whose non-streaming calls succeed but whose streams always fail
/// after `chunks_before_error` fragments. Records prompts like
/// [`ScriptedEngine`].
pub struct BrokenStreamEngine {
    reply: String,
    chunks_before_error: usize,
    prompts: Mutex<Vec<String>>,
}

impl BrokenStreamEngine {
    pub fn new(reply: impl Into<String>, chunks_before_error: usize) -> Self {
        Self {
            reply: reply.into(),
            chunks_before_error,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl InferenceEngine for BrokenStreamEngine {
    async fn generate(&self, prompt: &str, _options: &GenerateOptions) -> Result<GenerateResponse> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        Ok(GenerateResponse {
            text: self.reply.clone(),
        })
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> Result<GenerateStream> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        let events: Vec<Result<GenerateEvent>> = (0..self.chunks_before_error)
            .map(|i| Ok(GenerateEvent::Text(format!("chunk-{i} "))))
            .chain(std::iter::once(Err(MuninnError::Generation(
                "model exploded".into(),
            ))))
            .collect();
        Ok(Box::pin(tokio_stream::iter(events)))
    }

    fn is_loaded(&self) -> bool {
        true
    }
}

pub fn engine(reply: &str) -> Arc<ScriptedEngine> {
    Arc::new(ScriptedEngine::new(reply))
}
