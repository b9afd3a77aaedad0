use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub pipeline: PipelineConfig,
    pub health: HealthConfig,
    pub storage: StorageConfig,
    pub system: SystemConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL of an OpenAI-compatible chat/embeddings endpoint.
    /// A local Ollama daemon exposes one at http://localhost:11434/v1
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// When false the retrieval stage is skipped entirely.
    pub retrieval_enabled: bool,
    /// Passages fetched per question when retrieval is enabled.
    pub context_top_k: usize,
    /// Maximum turns kept in a conversation window (pairs evicted FIFO).
    pub history_max_turns: usize,
    /// Persona used when the requested grade level is unknown.
    pub default_grade: String,
    /// Session scope used when the caller does not name one.
    pub default_session: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Memory utilization above this percentage trips the gate.
    pub memory_threshold_percent: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    pub backend: String,
    pub database_path: String,
    pub index_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub channel_buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("GURO").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Optional bearer token for hosted OpenAI-compatible backends.
    /// A local Ollama daemon needs none.
    pub fn api_key() -> Option<String> {
        env::var("GURO_API_KEY").ok()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LLMConfig {
                base_url: "http://localhost:11434/v1".to_string(),
                model: "gemma3:4b".to_string(),
                embedding_model: "nomic-embed-text".to_string(),
                max_tokens: 1024,
                temperature: 0.7,
            },
            pipeline: PipelineConfig {
                retrieval_enabled: false,
                context_top_k: 2,
                history_max_turns: 6,
                default_grade: "Grade 7".to_string(),
                default_session: "default".to_string(),
            },
            health: HealthConfig {
                memory_threshold_percent: 90.0,
            },
            storage: StorageConfig {
                backend: "sqlite".to_string(),
                database_path: "data/guro.db".to_string(),
                index_path: "data/vectorstore/index.json".to_string(),
            },
            system: SystemConfig {
                channel_buffer_size: 32,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
