//! Guro: conversational tutoring backend.
//!
//! Routes a student's question, recent conversation history, and a
//! grade-level persona through a language-model pipeline and returns (or
//! streams) an answer. Optional document retrieval grounds answers in
//! locally ingested material.

pub mod actors;
mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod retrieval;
pub mod storage;
pub mod utils;

pub mod api;
pub mod cli;

pub use api::*;
pub use config::{
    HealthConfig, LLMConfig, LoggingConfig, PipelineConfig, Settings, StorageConfig, SystemConfig,
};
pub use error::GuroError;
pub use history::{HistoryWindow, Role, Turn};
pub use pipeline::{ResponsePipeline, BUSY_MESSAGE};

use std::sync::Arc;

use once_cell::sync::OnceCell;

use actors::MessageRouterHandle;
use retrieval::ContextRetriever;
use storage::memory::{InMemoryChatStore, InMemoryPersonaStore};
use storage::sqlite::SqliteStore;
use storage::{ChatStore, PersonaStore};

static SYSTEM: OnceCell<System> = OnceCell::new();

pub struct System {
    pub(crate) router: MessageRouterHandle,
    pub(crate) settings: Settings,
    pub(crate) personas: Arc<dyn PersonaStore>,
    pub(crate) chat: Arc<dyn ChatStore>,
    pub(crate) window: HistoryWindow,
    pub(crate) retriever: ContextRetriever,
}

impl System {
    fn new(settings: Settings) -> anyhow::Result<Self> {
        let (personas, chat): (Arc<dyn PersonaStore>, Arc<dyn ChatStore>) =
            match settings.storage.backend.as_str() {
                "memory" => (
                    Arc::new(InMemoryPersonaStore::new()),
                    Arc::new(InMemoryChatStore::new()),
                ),
                _ => {
                    let store = Arc::new(SqliteStore::new(&settings.storage.database_path)?);
                    (store.clone(), store)
                }
            };

        let router = MessageRouterHandle::new(settings.clone(), personas.clone());
        let window = HistoryWindow::new(settings.pipeline.history_max_turns);
        let retriever = ContextRetriever::new(&settings);

        Ok(Self {
            router,
            settings,
            personas,
            chat,
            window,
            retriever,
        })
    }

    pub(crate) fn global() -> &'static System {
        SYSTEM
            .get()
            .expect("System not initialized. Call init() first")
    }
}

/// Initialize the system. Must be called before using any API functions.
pub async fn init() -> anyhow::Result<()> {
    let settings = Settings::new()?;
    init_with_settings(settings).await
}

/// Initialize with explicit settings instead of the layered config
/// sources.
pub async fn init_with_settings(settings: Settings) -> anyhow::Result<()> {
    let system = System::new(settings)?;
    storage::seed_default_personas(system.personas.as_ref()).await?;

    SYSTEM
        .set(system)
        .map_err(|_| anyhow::anyhow!("System already initialized"))?;

    tracing::info!("Guro system initialized");
    Ok(())
}

/// Shutdown the system gracefully.
pub async fn shutdown() -> anyhow::Result<()> {
    if let Some(system) = SYSTEM.get() {
        system.router.shutdown().await?;
    }
    tracing::info!("Guro system shutdown complete");
    Ok(())
}
