//! Prompt assembly for document queries.
//!
//! Embeds the document, the rendered conversation history, the new
//! question, and a query-type-specific instruction into a single prompt.
//! The document is truncated to [`DOCUMENT_WINDOW_CHARS`] to protect the
//! context window — this is independent of the cache key's 500-char
//! prefix, which only bounds hashing cost.

use crate::types::{ChatMessage, QueryType, Role};

/// Leading document characters included in the prompt.
pub const DOCUMENT_WINDOW_CHARS: usize = 8000;

/// Sequences that terminate generation — keep the model from continuing
/// past its answer into a fabricated next turn.
pub const STOP_SEQUENCES: &[&str] = &["###", "User:", "Question:"];

/// Build the generation prompt for one query turn.
pub fn build_prompt(
    document: &str,
    history: &[ChatMessage],
    question: &str,
    query_type: Option<QueryType>,
) -> String {
    let instruction = query_type
        .map(|q| q.instruction())
        .unwrap_or_else(QueryType::default_instruction);

    let mut transcript = String::new();
    if !history.is_empty() {
        transcript.push_str("--- Conversation History ---\n");
        for message in history {
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "Answer",
            };
            transcript.push_str(speaker);
            transcript.push_str(": ");
            transcript.push_str(&message.content);
            transcript.push('\n');
        }
        transcript.push_str("--- End History ---\n\n");
    }

    let window: String = document.chars().take(DOCUMENT_WINDOW_CHARS).collect();

    format!(
        "### Document:\n{window}\n\n{transcript}### New Question:\n{question}\n\n\
         ### Instructions:\n{instruction}\n\n### Answer:"
    )
}
