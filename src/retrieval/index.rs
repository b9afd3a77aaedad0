//! On-disk similarity index over embedded text chunks.
//!
//! The index is a single JSON file rebuilt wholesale on each ingestion.
//! Saves go through a temp file plus rename, so concurrent readers see
//! either the old or the new index, never a half-written one.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    content: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build from parallel chunk/embedding sequences (same order, same
    /// length).
    pub fn build(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "Chunk/embedding count mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            );
        }
        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(content, embedding)| IndexEntry { content, embedding })
            .collect();
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k contents by cosine similarity to the query vector. Stable
    /// sort keeps insertion order among ties.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<String> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(_, entry)| entry.content.clone())
            .collect()
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create index directory")?;
        }

        let json = serde_json::to_string(self).context("Failed to serialize index")?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write index temp file {:?}", tmp))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to swap index into place at {:?}", path))?;

        tracing::info!(
            "[VectorIndex] Saved {} entries to {:?}",
            self.entries.len(),
            path
        );
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read index file {:?}", path))?;
        serde_json::from_str(&json).with_context(|| format!("Corrupt index file {:?}", path))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
