//! Error types for the Guro domain.
//!
//! Uses `thiserror` for the typed taxonomy. Absence of a persona or of the
//! retrieval index is never an error; both have fallback behavior.

use thiserror::Error;

/// Domain errors surfaced to callers.
#[derive(Debug, Error)]
pub enum GuroError {
    /// Administrative delete of an unknown persona identifier.
    #[error("Grade level '{0}' not found")]
    NotFound(String),

    /// Client-side input that cannot be processed (e.g. ingestion with no
    /// extractable text chunks).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Model backend or retrieval index failure.
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

/// Result type alias using our error.
pub type Result<T> = std::result::Result<T, GuroError>;
