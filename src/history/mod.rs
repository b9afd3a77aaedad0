//! Session-scoped conversation history with a bounded sliding window.
//!
//! Each scope (session id) holds the most recent turns, capped at a fixed
//! maximum; when a completed exchange pushes the window past the cap, the
//! oldest human/ai pair is evicted. All mutations for a scope go through
//! the window's lock, so concurrent exchanges cannot interleave into a
//! corrupted order.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::llm::ChatMessage;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Role::Human),
            "ai" => Some(Role::Ai),
            _ => None,
        }
    }

    /// Role string on the model wire ("user" / "assistant").
    pub fn chat_role(&self) -> &'static str {
        match self {
            Role::Human => "user",
            Role::Ai => "assistant",
        }
    }
}

/// One (role, text) pair in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.chat_role().to_string(),
            content: self.content.clone(),
        }
    }

    fn chat_role(&self) -> &'static str {
        self.role.chat_role()
    }
}

/// Bounded per-session history, keyed by session id.
pub struct HistoryWindow {
    scopes: RwLock<HashMap<String, VecDeque<Turn>>>,
    max_turns: usize,
}

impl HistoryWindow {
    pub fn new(max_turns: usize) -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Append one turn to the end of the scoped sequence.
    pub async fn append(&self, scope: &str, turn: Turn) {
        let mut scopes = self.scopes.write().await;
        scopes.entry(scope.to_string()).or_default().push_back(turn);
    }

    /// Evict oldest pairs until the scoped sequence fits the window.
    pub async fn trim(&self, scope: &str) {
        let mut scopes = self.scopes.write().await;
        if let Some(turns) = scopes.get_mut(scope) {
            while turns.len() > self.max_turns {
                turns.pop_front();
                turns.pop_front();
            }
        }
    }

    /// Append a completed human/ai exchange and trim in one lock scope.
    pub async fn record_exchange(&self, scope: &str, question: &str, answer: &str) {
        let mut scopes = self.scopes.write().await;
        let turns = scopes.entry(scope.to_string()).or_default();
        turns.push_back(Turn::human(question));
        turns.push_back(Turn::ai(answer));
        while turns.len() > self.max_turns {
            turns.pop_front();
            turns.pop_front();
        }
        tracing::debug!(
            "[HistoryWindow] Scope '{}' now holds {} turns",
            scope,
            turns.len()
        );
    }

    /// Ordered copy of the scoped sequence, oldest first.
    pub async fn snapshot(&self, scope: &str) -> Vec<Turn> {
        let scopes = self.scopes.read().await;
        scopes
            .get(scope)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn contains_scope(&self, scope: &str) -> bool {
        let scopes = self.scopes.read().await;
        scopes.contains_key(scope)
    }

    /// Seed a scope from persisted history. No-op if the scope already
    /// exists: live turns win over stale persisted ones.
    pub async fn hydrate(&self, scope: &str, turns: Vec<Turn>) {
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(scope.to_string())
            .or_insert_with(|| turns.into_iter().collect());
    }

    pub async fn clear(&self, scope: &str) {
        let mut scopes = self.scopes.write().await;
        scopes.remove(scope);
    }
}
