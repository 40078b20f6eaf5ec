//! Vector store abstraction for Docent.
//!
//! Provides a trait-based interface for different vector database backends. Stores are
//! append-only: entries are never updated, and each store also tracks the content
//! hashes of the files it holds so deduplication does not need to scan entries.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::chunking::{Chunk, ChunkMetadata};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk stored in the vector database together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Chunk text, including its locator prefix.
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this entry was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    /// Create a new entry from a chunk and its embedding.
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: chunk.text,
            metadata: chunk.metadata,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// The chunk this entry was built from.
    pub fn to_chunk(&self) -> Chunk {
        Chunk::new(self.text.clone(), self.metadata.clone())
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched entry.
    pub entry: IndexEntry,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append entries and record their source hashes. Returns the number written.
    async fn add_batch(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// Return the `limit` entries most similar to the query, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Whether any entry came from a file with this content hash.
    async fn has_hash(&self, hash: &str) -> Result<bool>;

    /// Total number of stored entries.
    async fn entry_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score entries against a query and keep the best `limit`.
pub(crate) fn rank<'a>(
    entries: impl Iterator<Item = &'a IndexEntry>,
    query_embedding: &[f32],
    limit: usize,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = entries
        .map(|entry| SearchResult {
            score: cosine_similarity(query_embedding, &entry.embedding),
            entry: entry.clone(),
        })
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let make = |text: &str, embedding: Vec<f32>| {
            IndexEntry::new(
                Chunk::new(
                    text.to_string(),
                    ChunkMetadata::Pdf {
                        page: 1,
                        source: "a.pdf".to_string(),
                        hash: "h".to_string(),
                    },
                ),
                embedding,
            )
        };
        let entries = vec![
            make("far", vec![0.0, 1.0]),
            make("near", vec![1.0, 0.1]),
            make("exact", vec![1.0, 0.0]),
        ];

        let results = rank(entries.iter(), &[1.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.text, "exact");
        assert_eq!(results[1].entry.text, "near");
    }
}
