//! Response pipeline: the fixed-stage workflow behind every answer.
//!
//! Stages run sequentially: resolve persona, optionally retrieve context,
//! assemble the prompt, invoke the model. The retrieval stage is included
//! by configuration, not branching. State is created fresh per invocation
//! and mutated additively as it passes through the stages.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Settings;
use crate::core::llm::{ChatMessage, LLMClient};
use crate::error::{GuroError, Result};
use crate::history::Turn;
use crate::retrieval::ContextRetriever;
use crate::storage::PersonaStore;

pub mod health;
pub mod persona;
pub mod prompt;

pub use health::{HealthGate, HealthStatus, MemoryProbe, SystemMemoryProbe};
pub use persona::PersonaResolver;

/// Fixed response substituted when the health gate trips. Never an error:
/// the caller sees a normal answer and the model is never contacted.
pub const BUSY_MESSAGE: &str =
    "Pasensya na, Guro is helping too many students right now. Please try again in a moment.";

/// Ordered pipeline stages. `Retrieval` appears only when configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Persona,
    Retrieval,
    Prompt,
    Model,
}

/// Transient per-invocation record. Discarded once the response is out.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub question: String,
    pub grade: String,
    pub history: Vec<Turn>,
    pub persona: String,
    pub context: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub response: String,
}

impl PipelineState {
    fn new(question: &str, grade: &str, history: &[Turn]) -> Self {
        Self {
            question: question.to_string(),
            grade: grade.to_string(),
            history: history.to_vec(),
            ..Default::default()
        }
    }
}

pub struct ResponsePipeline {
    resolver: PersonaResolver,
    retriever: Option<ContextRetriever>,
    client: LLMClient,
    gate: HealthGate,
    context_top_k: usize,
}

impl ResponsePipeline {
    pub fn new(settings: &Settings, personas: Arc<dyn PersonaStore>) -> Self {
        let retriever = settings
            .pipeline
            .retrieval_enabled
            .then(|| ContextRetriever::new(settings));

        Self {
            resolver: PersonaResolver::new(personas, settings.pipeline.default_grade.clone()),
            retriever,
            client: LLMClient::new(settings.llm.clone(), Settings::api_key()),
            gate: HealthGate::new(settings.health.memory_threshold_percent),
            context_top_k: settings.pipeline.context_top_k,
        }
    }

    /// Replace the health gate, e.g. with a pinned probe in tests.
    pub fn with_gate(mut self, gate: HealthGate) -> Self {
        self.gate = gate;
        self
    }

    /// The stage list for this deployment, in execution order.
    pub fn stages(&self) -> Vec<PipelineStage> {
        let mut stages = vec![PipelineStage::Persona];
        if self.retriever.is_some() {
            stages.push(PipelineStage::Retrieval);
        }
        stages.push(PipelineStage::Prompt);
        stages.push(PipelineStage::Model);
        stages
    }

    /// Run every stage before model invocation, mutating the state
    /// additively.
    async fn prepare(&self, state: &mut PipelineState) -> Result<()> {
        for stage in self.stages() {
            match stage {
                PipelineStage::Persona => {
                    state.persona = self.resolver.resolve(&state.grade).await;
                }
                PipelineStage::Retrieval => {
                    if let Some(retriever) = &self.retriever {
                        state.context = retriever
                            .retrieve(&state.question, self.context_top_k)
                            .await
                            .map_err(|e| GuroError::Upstream(e.to_string()))?;
                    }
                }
                PipelineStage::Prompt => {
                    state.messages = prompt::assemble(
                        &state.persona,
                        &state.context,
                        &state.history,
                        &state.question,
                    );
                }
                PipelineStage::Model => break,
            }
        }
        Ok(())
    }

    /// Single-shot mode: awaits the complete response text.
    pub async fn invoke(&self, question: &str, grade: &str, history: &[Turn]) -> Result<String> {
        let status = self.gate.check();
        if !status.healthy {
            tracing::warn!("[Pipeline] {}, returning busy message", status.reason);
            return Ok(BUSY_MESSAGE.to_string());
        }

        let mut state = PipelineState::new(question, grade, history);
        self.prepare(&mut state).await?;

        state.response = self
            .client
            .chat(state.messages.clone())
            .await
            .map_err(|e| GuroError::Upstream(e.to_string()))?;

        Ok(state.response)
    }

    /// Streaming mode: fragments are forwarded through `tx` in emission
    /// order. A failure after emission has started just ends the stream.
    pub async fn invoke_stream(
        &self,
        question: &str,
        grade: &str,
        history: &[Turn],
        tx: mpsc::Sender<String>,
    ) -> Result<()> {
        let status = self.gate.check();
        if !status.healthy {
            tracing::warn!("[Pipeline] {}, returning busy message", status.reason);
            let _ = tx.send(BUSY_MESSAGE.to_string()).await;
            return Ok(());
        }

        let mut state = PipelineState::new(question, grade, history);
        self.prepare(&mut state).await?;

        self.client
            .stream_chat(state.messages, tx)
            .await
            .map_err(|e| GuroError::Upstream(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryPersonaStore;

    fn pipeline_with_retrieval(enabled: bool) -> ResponsePipeline {
        let mut settings = Settings::default();
        settings.pipeline.retrieval_enabled = enabled;
        ResponsePipeline::new(&settings, Arc::new(InMemoryPersonaStore::new()))
    }

    #[test]
    fn retrieval_stage_is_configuration_driven() {
        assert_eq!(
            pipeline_with_retrieval(false).stages(),
            vec![
                PipelineStage::Persona,
                PipelineStage::Prompt,
                PipelineStage::Model
            ]
        );
        assert_eq!(
            pipeline_with_retrieval(true).stages(),
            vec![
                PipelineStage::Persona,
                PipelineStage::Retrieval,
                PipelineStage::Prompt,
                PipelineStage::Model
            ]
        );
    }
}
