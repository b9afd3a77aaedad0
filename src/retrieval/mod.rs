//! Document context retrieval.
//!
//! Ingestion chunks raw text, embeds every chunk, and rebuilds the on-disk
//! index from scratch. Retrieval embeds the question and ranks stored
//! chunks by similarity. A missing index is a valid state: it means "no
//! context available" and retrieval returns an empty result.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Settings;
use crate::core::llm::LLMClient;
use crate::error::GuroError;

pub mod index;

pub use index::VectorIndex;

/// Split raw text into chunks on blank-line boundaries, trimming each
/// piece and dropping empties.
pub fn chunk_text(text: &str) -> std::result::Result<Vec<String>, GuroError> {
    let chunks: Vec<String> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(String::from)
        .collect();

    if chunks.is_empty() {
        return Err(GuroError::Validation(
            "No extractable text found in document".to_string(),
        ));
    }
    Ok(chunks)
}

/// Fetches passages relevant to a question from the on-disk index.
pub struct ContextRetriever {
    client: LLMClient,
    index_path: PathBuf,
}

impl ContextRetriever {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: LLMClient::new(settings.llm.clone(), Settings::api_key()),
            index_path: PathBuf::from(&settings.storage.index_path),
        }
    }

    pub fn exists(&self) -> bool {
        self.index_path.exists()
    }

    /// Up to `k` passages ranked by similarity, or an empty result when
    /// no index has been built yet.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<Vec<String>> {
        if !self.exists() {
            tracing::debug!("[ContextRetriever] No index at {:?}", self.index_path);
            return Ok(Vec::new());
        }

        let index = VectorIndex::load(&self.index_path).await?;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query_text = [question.to_string()];
        let query = self.client.embed(&query_text).await?;
        let query = query
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Backend returned no embedding for query"))?;

        Ok(index.search(&query, k))
    }

    /// Chunk, embed, and index a document, replacing any prior index.
    /// Returns the number of chunks indexed.
    pub async fn ingest(&self, text: &str) -> Result<usize> {
        let chunks = chunk_text(text)?;
        let embeddings = self.client.embed(&chunks).await?;
        let index = VectorIndex::build(chunks, embeddings)?;
        let count = index.len();
        index.save(&self.index_path).await?;
        tracing::info!("[ContextRetriever] Indexed {} chunks", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_trims_and_drops_empty_pieces() {
        let chunks = chunk_text("A\n\nB\n\n  \n\nC").unwrap();
        assert_eq!(chunks, vec!["A", "B", "C"]);
    }

    #[test]
    fn chunking_rejects_whitespace_only_input() {
        let err = chunk_text("   \n\n \t \n\n").unwrap_err();
        assert!(matches!(err, GuroError::Validation(_)));
    }

    #[test]
    fn chunking_keeps_inner_newlines() {
        let chunks = chunk_text("line one\nline two\n\nsecond chunk").unwrap();
        assert_eq!(chunks, vec!["line one\nline two", "second chunk"]);
    }
}
