//! Persistence abstractions for personas and chat history.
//!
//! Backend implementation details stay behind the traits so the SQLite
//! store and the in-memory store (tests, ephemeral runs) are
//! interchangeable without API changes.

use anyhow::Result;
use async_trait::async_trait;

use crate::history::Turn;

pub mod memory;
pub mod sqlite;

/// Personas every deployment ships with. Seeded into an empty store on
/// startup.
pub const DEFAULT_PERSONAS: &[(&str, &str)] = &[
    (
        "Grade 7",
        "Mentor vibe. Use detailed facts, proper terminology, and social analogies.",
    ),
    (
        "TVET",
        "Professional yet easy to understand for a career shifter or beginner, \
         assuming a technical skill-based vocational education setting.",
    ),
];

/// Key-value store of grade level -> persona description.
#[async_trait]
pub trait PersonaStore: Send + Sync {
    /// Description for a grade level, or None if absent.
    async fn get(&self, grade_level: &str) -> Result<Option<String>>;

    /// Insert or update a persona by grade level.
    async fn upsert(&self, grade_level: &str, description: &str) -> Result<()>;

    /// Delete a persona. Returns false if the grade level was absent.
    async fn delete(&self, grade_level: &str) -> Result<bool>;

    /// All personas, ordered by grade level.
    async fn list(&self) -> Result<Vec<(String, String)>>;
}

/// Append-only conversation log, scoped by session id.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<()>;

    /// Most recent turns for a session, ordered oldest first
    /// (most-recent-last), at most `limit` of them.
    async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>>;
}

/// Seed the default personas if the store is empty.
pub async fn seed_default_personas(store: &dyn PersonaStore) -> Result<()> {
    if !store.list().await?.is_empty() {
        return Ok(());
    }
    for (grade_level, description) in DEFAULT_PERSONAS {
        store.upsert(grade_level, description).await?;
    }
    tracing::info!("Seeded {} default personas", DEFAULT_PERSONAS.len());
    Ok(())
}
