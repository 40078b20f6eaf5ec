//! Embedding generation for indexing and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Deterministic embedder for tests: one dimension per keyword, set when the text
/// mentions it, plus a constant dimension so no vector is all zeros.
#[cfg(test)]
pub(crate) struct KeywordEmbedder {
    keywords: Vec<String>,
}

#[cfg(test)]
impl KeywordEmbedder {
    pub(crate) fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|k| if text.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.1);
        vector
    }
}

#[cfg(test)]
#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}
