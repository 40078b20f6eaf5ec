//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{rank, IndexEntry, SearchResult, VectorStore};
use crate::error::{DocentError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

/// In-memory vector store.
#[derive(Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<IndexEntry>>,
    hashes: RwLock<HashSet<String>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> DocentError {
    DocentError::VectorStore(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_batch(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut store = self.entries.write().map_err(poisoned)?;
        let mut hashes = self.hashes.write().map_err(poisoned)?;
        for entry in entries {
            hashes.insert(entry.metadata.hash().to_string());
            store.push(entry.clone());
        }
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let store = self.entries.read().map_err(poisoned)?;
        Ok(rank(store.iter(), query_embedding, limit))
    }

    async fn has_hash(&self, hash: &str) -> Result<bool> {
        let hashes = self.hashes.read().map_err(poisoned)?;
        Ok(hashes.contains(hash))
    }

    async fn entry_count(&self) -> Result<usize> {
        let store = self.entries.read().map_err(poisoned)?;
        Ok(store.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{Chunk, ChunkMetadata};

    fn entry(text: &str, hash: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            Chunk::new(
                text.to_string(),
                ChunkMetadata::Video {
                    start: 0.0,
                    end: 60.0,
                    source: "talk.mp4".to_string(),
                    hash: hash.to_string(),
                },
            ),
            embedding,
        )
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        store
            .add_batch(&[
                entry("Hello world", "h1", vec![1.0, 0.0, 0.0]),
                entry("Goodbye world", "h1", vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.entry_count().await.unwrap(), 2);
        assert!(store.has_hash("h1").await.unwrap());
        assert!(!store.has_hash("h2").await.unwrap());

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].entry.text, "Hello world");
    }
}
