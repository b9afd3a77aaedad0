//! In-memory persona and chat stores.
//!
//! Data is lost when the process terminates. Suitable for tests and
//! ephemeral runs.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChatStore, PersonaStore};
use crate::history::Turn;

pub struct InMemoryPersonaStore {
    personas: RwLock<HashMap<String, String>>,
}

impl InMemoryPersonaStore {
    pub fn new() -> Self {
        Self {
            personas: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPersonaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonaStore for InMemoryPersonaStore {
    async fn get(&self, grade_level: &str) -> Result<Option<String>> {
        let personas = self.personas.read().await;
        Ok(personas.get(grade_level).cloned())
    }

    async fn upsert(&self, grade_level: &str, description: &str) -> Result<()> {
        let mut personas = self.personas.write().await;
        personas.insert(grade_level.to_string(), description.to_string());
        tracing::debug!("[InMemoryPersonaStore] Upserted '{}'", grade_level);
        Ok(())
    }

    async fn delete(&self, grade_level: &str) -> Result<bool> {
        let mut personas = self.personas.write().await;
        let removed = personas.remove(grade_level).is_some();
        tracing::debug!(
            "[InMemoryPersonaStore] Delete '{}': existed={}",
            grade_level,
            removed
        );
        Ok(removed)
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let personas = self.personas.read().await;
        let mut entries: Vec<(String, String)> = personas
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

pub struct InMemoryChatStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_default()
            .push(turn.clone());
        tracing::debug!(
            "[InMemoryChatStore] Appended {} turn to session '{}'",
            turn.role.as_str(),
            session_id
        );
        Ok(())
    }

    async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let sessions = self.sessions.read().await;
        let turns = sessions.get(session_id).cloned().unwrap_or_default();
        let skip = turns.len().saturating_sub(limit);
        Ok(turns.into_iter().skip(skip).collect())
    }
}
