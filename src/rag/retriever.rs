//! Top-K retrieval against the vector index.

use crate::chunking::Chunk;
use crate::error::Result;
use crate::index::VectorIndex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches the chunks most relevant to a question.
pub struct Retriever {
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, top_k: usize) -> Self {
        Self {
            index,
            top_k: top_k.max(1),
        }
    }

    /// Up to `top_k` chunks, most similar first. Fails with `NotReady` before any
    /// content has been indexed.
    #[instrument(skip(self))]
    pub async fn fetch(&self, question: &str) -> Result<Vec<Chunk>> {
        let results = self.index.search(question, self.top_k).await?;
        debug!("Retrieved {} chunks", results.len());
        Ok(results.iter().map(|r| r.entry.to_chunk()).collect())
    }
}

/// Join chunk texts into one context block, separated by blank lines.
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
