//! Conversation history storage

mod store;

pub use store::{ConversationStore, HistoryConfig};
