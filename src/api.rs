//! Simple async API facade.
//!
//! The caller surface over the actor system: single-shot and streaming
//! asks, persona administration, document ingestion, and the health
//! gate reading. The facade, not the pipeline, owns the history
//! window: it snapshots history before each ask and records the new
//! exchange afterwards.

use anyhow::Result;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::actors::messages::*;
use crate::history::Turn;
use crate::System;

/// Single-shot reply shape.
#[derive(Debug, Clone, Serialize)]
pub struct AskReply {
    pub status: String,
    pub answer: String,
}

/// Ask with the default grade and session.
///
/// # Example
/// ```no_run
/// use guro::{init, ask};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     init().await?;
///     let reply = ask("Why is the sky blue?").await?;
///     println!("{}", reply.answer);
///     Ok(())
/// }
/// ```
pub async fn ask(question: impl Into<String>) -> Result<AskReply> {
    ask_in_session(question, None, None).await
}

/// Ask as a specific grade level.
pub async fn ask_with_grade(
    question: impl Into<String>,
    grade: impl Into<String>,
) -> Result<AskReply> {
    ask_in_session(question, Some(grade.into()), None).await
}

/// Ask within a named conversation session, optionally as a specific
/// grade level.
pub async fn ask_in_session(
    question: impl Into<String>,
    grade: Option<String>,
    session: Option<String>,
) -> Result<AskReply> {
    let system = System::global();
    let question = question.into();
    let grade = grade.unwrap_or_else(|| system.settings.pipeline.default_grade.clone());
    let session = session.unwrap_or_else(|| system.settings.pipeline.default_session.clone());

    let history = history_snapshot(system, &session).await;

    let (tx, rx) = oneshot::channel();
    let request = AskRequest {
        question: question.clone(),
        grade,
        history,
        stream: false,
        response: tx,
    };

    system
        .router
        .send_message(RoutingMessage::Pipeline(PipelineMessage::Ask(request)))
        .await?;

    match rx.await? {
        AskResponse::Complete(answer) => {
            record_exchange(system, &session, &question, &answer).await?;
            Ok(AskReply {
                status: "success".to_string(),
                answer,
            })
        }
        AskResponse::Error(e) => Err(anyhow::anyhow!(e)),
        _ => Err(anyhow::anyhow!("Unexpected response")),
    }
}

/// Stream an answer fragment by fragment. The callback sees each
/// fragment in emission order; the accumulated text is returned and
/// recorded into the session history.
pub async fn ask_stream(
    question: impl Into<String>,
    grade: Option<String>,
    session: Option<String>,
    mut callback: impl FnMut(String),
) -> Result<String> {
    let system = System::global();
    let question = question.into();
    let grade = grade.unwrap_or_else(|| system.settings.pipeline.default_grade.clone());
    let session = session.unwrap_or_else(|| system.settings.pipeline.default_session.clone());

    let history = history_snapshot(system, &session).await;

    let (tx, rx) = oneshot::channel();
    let request = AskRequest {
        question: question.clone(),
        grade,
        history,
        stream: true,
        response: tx,
    };

    system
        .router
        .send_message(RoutingMessage::Pipeline(PipelineMessage::Ask(request)))
        .await?;

    match rx.await? {
        AskResponse::StreamFragments(mut stream_rx) => {
            let mut full_response = String::new();
            while let Some(fragment) = stream_rx.recv().await {
                callback(fragment.clone());
                full_response.push_str(&fragment);
            }
            record_exchange(system, &session, &question, &full_response).await?;
            Ok(full_response)
        }
        AskResponse::Complete(answer) => {
            record_exchange(system, &session, &question, &answer).await?;
            Ok(answer)
        }
        AskResponse::Error(e) => Err(anyhow::anyhow!(e)),
    }
}

/// Window snapshot for a session, hydrating from the chat store on first
/// touch so history survives restarts.
async fn history_snapshot(system: &System, session: &str) -> Vec<Turn> {
    if !system.window.contains_scope(session).await {
        match system
            .chat
            .recent_turns(session, system.window.max_turns())
            .await
        {
            Ok(turns) if !turns.is_empty() => system.window.hydrate(session, turns).await,
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to hydrate session '{}': {}", session, e),
        }
    }
    system.window.snapshot(session).await
}

async fn record_exchange(
    system: &System,
    session: &str,
    question: &str,
    answer: &str,
) -> Result<()> {
    system.window.record_exchange(session, question, answer).await;
    system
        .chat
        .append_turn(session, &Turn::human(question))
        .await?;
    system.chat.append_turn(session, &Turn::ai(answer)).await?;
    Ok(())
}

/// Persona administration.
pub mod personas {
    use super::*;
    use crate::error::GuroError;

    pub async fn list() -> Result<Vec<(String, String)>> {
        System::global().personas.list().await
    }

    /// Upsert: update the description if the grade level exists, else
    /// insert.
    pub async fn save(grade_level: &str, description: &str) -> Result<()> {
        System::global().personas.upsert(grade_level, description).await
    }

    /// Delete by grade level; NotFound if absent.
    pub async fn delete(grade_level: &str) -> Result<()> {
        let removed = System::global().personas.delete(grade_level).await?;
        if !removed {
            return Err(GuroError::NotFound(grade_level.to_string()).into());
        }
        Ok(())
    }
}

/// Document ingestion and retrieval.
pub mod documents {
    use super::*;

    /// Chunk, embed, and index a document, replacing any prior index.
    /// Returns the number of chunks indexed.
    pub async fn ingest(text: &str) -> Result<usize> {
        System::global().retriever.ingest(text).await
    }

    /// Passages most similar to the query, best first.
    pub async fn search(query: &str, k: usize) -> Result<Vec<String>> {
        System::global().retriever.retrieve(query, k).await
    }
}

/// Health gate reading.
pub mod health {
    use crate::pipeline::{HealthGate, HealthStatus};
    use crate::System;

    pub fn status() -> HealthStatus {
        let system = System::global();
        HealthGate::new(system.settings.health.memory_threshold_percent).check()
    }
}
