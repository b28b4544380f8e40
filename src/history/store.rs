//! Session-addressed conversation store with LRU + TTL eviction.
//!
//! [`ConversationStore`] owns every conversation outright: one document
//! (fixed at creation) plus an append-only message history, addressed by
//! an opaque UUID. Callers hold only the id — every read or write goes
//! through the store's lock, so read-modify-write is atomic per call and
//! two racing follow-ups on the same id cannot corrupt the history.
//!
//! # Eviction
//!
//! Maintenance runs at the start of every [`start`](ConversationStore::start)
//! call, in two phases whose order matters: first a TTL sweep removes every
//! conversation idle past its time-to-live (so stale sessions are reclaimed
//! even under capacity), then LRU trimming makes room for the incoming
//! conversation when TTL alone didn't. Expiry is otherwise lazy:
//! [`get`](ConversationStore::get) deletes a stale conversation on read,
//! and [`active_count`](ConversationStore::active_count) may briefly count
//! expired-but-unswept entries.
//!
//! Nothing in this module ever blocks on the inference engine; the lock
//! only ever covers short in-memory structure manipulation.

use std::collections::{HashMap, VecDeque};

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use uuid::Uuid;

use crate::telemetry;
use crate::types::{ChatMessage, Role};

/// Configuration for the conversation store.
///
/// ```rust
/// # use muninn::HistoryConfig;
/// # use std::time::Duration;
/// let config = HistoryConfig::new()
///     .max_conversations(200)
///     .ttl(Duration::from_secs(3600));
/// ```
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of resident conversations. Default: 50.
    pub max_conversations: usize,
    /// Idle time after which a conversation expires. Default: 2 hours.
    pub ttl: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_conversations: 50,
            ttl: Duration::from_secs(2 * 3600),
        }
    }
}

impl HistoryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of resident conversations.
    pub fn max_conversations(mut self, n: usize) -> Self {
        self.max_conversations = n.max(1);
        self
    }

    /// Set the idle time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

struct Conversation {
    document: String,
    history: Vec<ChatMessage>,
    last_access: Instant,
}

struct StoreState {
    conversations: HashMap<String, Conversation>,
    /// Recency list: front = least recently touched.
    recency: VecDeque<String>,
}

impl StoreState {
    fn touch(&mut self, id: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == id) {
            self.recency.remove(pos);
        }
        self.recency.push_back(id.to_owned());
    }

    fn remove(&mut self, id: &str) {
        self.conversations.remove(id);
        if let Some(pos) = self.recency.iter().position(|k| k == id) {
            self.recency.remove(pos);
        }
    }
}

/// In-memory store of active conversations.
pub struct ConversationStore {
    state: Mutex<StoreState>,
    max_conversations: usize,
    ttl: Duration,
}

impl ConversationStore {
    /// Create a new store with the given configuration.
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            state: Mutex::new(StoreState {
                conversations: HashMap::new(),
                recency: VecDeque::new(),
            }),
            max_conversations: config.max_conversations,
            ttl: config.ttl,
        }
    }

    /// Create a new conversation pinned to `document` and return its id.
    ///
    /// Runs eviction maintenance first (TTL sweep, then LRU trim), so the
    /// store never exceeds its capacity after this call returns.
    pub async fn start(&self, document: impl Into<String>) -> String {
        let mut state = self.state.lock().await;
        self.evict_locked(&mut state);

        let id = Uuid::new_v4().to_string();
        state.conversations.insert(
            id.clone(),
            Conversation {
                document: document.into(),
                history: Vec::new(),
                last_access: Instant::now(),
            },
        );
        state.recency.push_back(id.clone());
        tracing::debug!(conversation = %id, "started conversation");
        id
    }

    /// Fetch the document and history snapshot for a conversation.
    ///
    /// Returns `None` for an unknown id, or for one idle past its TTL —
    /// the stale conversation is deleted as a side effect. A successful
    /// read refreshes last-access and recency.
    pub async fn get(&self, id: &str) -> Option<(String, Vec<ChatMessage>)> {
        let mut state = self.state.lock().await;

        let expired = match state.conversations.get(id) {
            Some(conversation) => conversation.last_access.elapsed() > self.ttl,
            None => return None,
        };
        if expired {
            tracing::debug!(conversation = %id, "conversation expired on read");
            state.remove(id);
            metrics::counter!(telemetry::CONVERSATIONS_EVICTED_TOTAL, "reason" => "expired")
                .increment(1);
            return None;
        }

        let now = Instant::now();
        state.touch(id);
        let conversation = state.conversations.get_mut(id)?;
        conversation.last_access = now;
        Some((conversation.document.clone(), conversation.history.clone()))
    }

    /// Append a message to a conversation's history.
    ///
    /// Silent no-op for an unknown or expired id — callers are expected to
    /// have validated the id via [`get`](Self::get) first.
    pub async fn append(&self, id: &str, role: Role, content: impl Into<String>) {
        let mut state = self.state.lock().await;
        if state.conversations.contains_key(id) {
            state.touch(id);
        }
        if let Some(conversation) = state.conversations.get_mut(id) {
            conversation.history.push(ChatMessage {
                role,
                content: content.into(),
            });
            conversation.last_access = Instant::now();
        }
    }

    /// Number of resident conversations. Eviction is lazy, so this may
    /// include expired entries that haven't been swept yet.
    pub async fn active_count(&self) -> usize {
        self.state.lock().await.conversations.len()
    }

    /// Two-phase maintenance: TTL sweep, then LRU trim to make room for
    /// one incoming conversation.
    fn evict_locked(&self, state: &mut StoreState) {
        let expired: Vec<String> = state
            .conversations
            .iter()
            .filter(|(_, c)| c.last_access.elapsed() > self.ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            tracing::debug!(conversation = %id, "sweeping expired conversation");
            state.remove(id);
            metrics::counter!(telemetry::CONVERSATIONS_EVICTED_TOTAL, "reason" => "expired")
                .increment(1);
        }

        while state.conversations.len() >= self.max_conversations {
            let Some(oldest) = state.recency.pop_front() else {
                break;
            };
            tracing::debug!(conversation = %oldest, "evicting LRU conversation");
            state.conversations.remove(&oldest);
            metrics::counter!(telemetry::CONVERSATIONS_EVICTED_TOTAL, "reason" => "capacity")
                .increment(1);
        }
    }
}
