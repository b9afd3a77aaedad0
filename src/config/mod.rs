pub mod settings;

pub use settings::{
    HealthConfig, LLMConfig, LoggingConfig, PipelineConfig, Settings, StorageConfig, SystemConfig,
};
