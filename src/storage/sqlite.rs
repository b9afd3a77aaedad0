//! SQLite-backed persona and chat stores.
//!
//! One store owns both tables; the connection sits behind an async mutex
//! so per-key reads and writes are serialized and never partially visible.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;

use super::{ChatStore, PersonaStore};
use crate::history::{Role, Turn};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        Self::init_schema(&conn)?;
        tracing::info!("[SqliteStore] Opened database at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private throwaway database, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS personas (
                 grade_level TEXT PRIMARY KEY,
                 description TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS chat_history (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 session_id TEXT NOT NULL,
                 role TEXT NOT NULL,
                 content TEXT NOT NULL,
                 created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
             );
             CREATE INDEX IF NOT EXISTS idx_chat_history_session
                 ON chat_history (session_id, id);",
        )
        .context("Failed to initialize database schema")?;
        Ok(())
    }
}

#[async_trait]
impl PersonaStore for SqliteStore {
    async fn get(&self, grade_level: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT description FROM personas WHERE grade_level = ?1")?;
        let mut rows = stmt.query_map(params![grade_level], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, grade_level: &str, description: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO personas (grade_level, description) VALUES (?1, ?2)
             ON CONFLICT(grade_level) DO UPDATE SET description = excluded.description",
            params![grade_level, description],
        )?;
        tracing::debug!("[SqliteStore] Upserted persona '{}'", grade_level);
        Ok(())
    }

    async fn delete(&self, grade_level: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let affected = conn.execute(
            "DELETE FROM personas WHERE grade_level = ?1",
            params![grade_level],
        )?;
        Ok(affected > 0)
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT grade_level, description FROM personas ORDER BY grade_level")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chat_history (session_id, role, content) VALUES (?1, ?2, ?3)",
            params![session_id, turn.role.as_str(), turn.content],
        )?;
        tracing::debug!(
            "[SqliteStore] Appended {} turn to session '{}'",
            turn.role.as_str(),
            session_id
        );
        Ok(())
    }

    async fn recent_turns(&self, session_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT role, content FROM chat_history
             WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![session_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut turns = Vec::new();
        for row in rows {
            let (role, content) = row?;
            if let Some(role) = Role::parse(&role) {
                turns.push(Turn { role, content });
            }
        }
        // Query returns newest first; callers want most-recent-last.
        turns.reverse();
        Ok(turns)
    }
}
