//! The persistent vector index behind ingestion and retrieval.
//!
//! A [`VectorIndex`] starts unset. It becomes ready either by loading a previously
//! persisted store at startup or by the first successful write. Readers always see
//! either no store or a fully-committed one.

use crate::chunking::Chunk;
use crate::embedding::Embedder;
use crate::error::{DocentError, Result};
use crate::vector_store::{
    IndexEntry, MemoryVectorStore, SearchResult, SqliteVectorStore, VectorStore,
};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// File name of the SQLite database inside the index directory.
pub const INDEX_FILE: &str = "index.db";

/// Outcome of [`VectorIndex::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// A persisted index was found and is now active.
    Loaded { entries: usize },
    /// Nothing has been persisted yet.
    NotFound,
    /// Something is persisted but could not be opened.
    Failed(String),
}

/// Opens or creates the store an index writes to.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Open the persisted store, or `None` when nothing has been written yet.
    async fn open_existing(&self) -> Result<Option<Arc<dyn VectorStore>>>;

    /// Create the store for a first write.
    async fn create(&self) -> Result<Arc<dyn VectorStore>>;
}

/// Index persisted as a SQLite file under a directory.
pub struct SqliteBackend {
    dir: PathBuf,
    collection: String,
}

impl SqliteBackend {
    pub fn new(dir: PathBuf, collection: &str) -> Self {
        Self {
            dir,
            collection: collection.to_string(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }
}

#[async_trait]
impl IndexBackend for SqliteBackend {
    async fn open_existing(&self) -> Result<Option<Arc<dyn VectorStore>>> {
        let path = self.db_path();
        if !path.exists() {
            debug!("No index database at {:?}", path);
            return Ok(None);
        }

        let store = SqliteVectorStore::open(&path, &self.collection)?;
        if store.entry_count().await? == 0 {
            return Ok(None);
        }
        Ok(Some(Arc::new(store)))
    }

    async fn create(&self) -> Result<Arc<dyn VectorStore>> {
        let store = SqliteVectorStore::open(&self.db_path(), &self.collection)?;
        Ok(Arc::new(store))
    }
}

/// Index kept in memory. Stores survive across [`VectorIndex`] instances sharing the
/// backend, which stands in for a restart in tests.
#[derive(Default)]
pub struct MemoryBackend {
    store: Arc<MemoryVectorStore>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexBackend for MemoryBackend {
    async fn open_existing(&self) -> Result<Option<Arc<dyn VectorStore>>> {
        if self.store.entry_count().await? == 0 {
            return Ok(None);
        }
        Ok(Some(self.store.clone()))
    }

    async fn create(&self) -> Result<Arc<dyn VectorStore>> {
        Ok(self.store.clone())
    }
}

/// Embedding-backed index of chunks.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn IndexBackend>,
    store: RwLock<Option<Arc<dyn VectorStore>>>,
}

impl VectorIndex {
    /// Create an unset index.
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn IndexBackend>) -> Self {
        Self {
            embedder,
            backend,
            store: RwLock::new(None),
        }
    }

    async fn current(&self) -> Option<Arc<dyn VectorStore>> {
        self.store.read().await.clone()
    }

    /// Whether a store is active.
    pub async fn exists(&self) -> bool {
        self.store.read().await.is_some()
    }

    /// Whether a file with this content hash has been indexed.
    pub async fn has_hash(&self, hash: &str) -> Result<bool> {
        match self.current().await {
            Some(store) => store.has_hash(hash).await,
            None => Ok(false),
        }
    }

    /// Embed and append chunks, creating the store on first write.
    ///
    /// The index only becomes ready once the write has committed, so a failed first
    /// write leaves it unset.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(DocentError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry::new(chunk, embedding))
            .collect();

        let (store, created) = match self.current().await {
            Some(store) => (store, false),
            None => {
                info!("Creating vector index");
                (self.backend.create().await?, true)
            }
        };

        let written = store.add_batch(&entries).await?;

        if created {
            let mut slot = self.store.write().await;
            if slot.is_none() {
                *slot = Some(store);
            }
        }

        Ok(written)
    }

    /// Activate a previously persisted store, if any.
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadStatus {
        let store = match self.backend.open_existing().await {
            Ok(Some(store)) => store,
            Ok(None) => {
                info!("No existing vector index found");
                return LoadStatus::NotFound;
            }
            Err(e) => {
                warn!("Failed to load vector index: {}", e);
                return LoadStatus::Failed(e.to_string());
            }
        };

        match store.entry_count().await {
            Ok(entries) => {
                *self.store.write().await = Some(store);
                info!("Loaded vector index with {} entries", entries);
                LoadStatus::Loaded { entries }
            }
            Err(e) => {
                warn!("Failed to read vector index: {}", e);
                LoadStatus::Failed(e.to_string())
            }
        }
    }

    /// The `k` entries most similar to the question.
    #[instrument(skip(self))]
    pub async fn search(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        let store = self.current().await.ok_or(DocentError::NotReady)?;
        let embedding = self.embedder.embed(question).await?;
        store.search(&embedding, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkMetadata;
    use crate::embedding::KeywordEmbedder;

    fn page_chunk(text: &str, page: u32, hash: &str) -> Chunk {
        Chunk::new(
            format!("[Page {}] {}", page, text),
            ChunkMetadata::Pdf {
                page,
                source: "uploads/doc.pdf".to_string(),
                hash: hash.to_string(),
            },
        )
    }

    fn memory_index() -> VectorIndex {
        VectorIndex::new(
            Arc::new(KeywordEmbedder::new(&["cats", "rust", "ocean"])),
            Arc::new(MemoryBackend::new()),
        )
    }

    #[tokio::test]
    async fn test_unset_index() {
        let index = memory_index();
        assert!(!index.exists().await);
        assert!(!index.has_hash("h1").await.unwrap());
        assert!(matches!(
            index.search("anything", 4).await,
            Err(DocentError::NotReady)
        ));
        assert_eq!(index.load().await, LoadStatus::NotFound);
        assert!(!index.exists().await);
    }

    #[tokio::test]
    async fn test_first_write_creates_index() {
        let index = memory_index();
        let written = index
            .add_chunks(vec![
                page_chunk("cats sleep a lot", 1, "h1"),
                page_chunk("rust is a language", 2, "h1"),
            ])
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert!(index.exists().await);
        assert!(index.has_hash("h1").await.unwrap());
        assert!(!index.has_hash("h2").await.unwrap());

        let results = index.search("tell me about rust", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.text, "[Page 2] rust is a language");
    }

    #[tokio::test]
    async fn test_empty_write_keeps_index_unset() {
        let index = memory_index();
        assert_eq!(index.add_chunks(Vec::new()).await.unwrap(), 0);
        assert!(!index.exists().await);
    }

    #[tokio::test]
    async fn test_load_after_restart() {
        let backend = Arc::new(MemoryBackend::new());
        let embedder = Arc::new(KeywordEmbedder::new(&["ocean"]));

        let first = VectorIndex::new(embedder.clone(), backend.clone());
        first
            .add_chunks(vec![page_chunk("the ocean is deep", 1, "h7")])
            .await
            .unwrap();

        let second = VectorIndex::new(embedder, backend);
        assert!(!second.exists().await);
        assert_eq!(second.load().await, LoadStatus::Loaded { entries: 1 });
        assert!(second.has_hash("h7").await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let index_dir = dir.path().join("index");
        let embedder = Arc::new(KeywordEmbedder::new(&["cats"]));

        let backend = Arc::new(SqliteBackend::new(index_dir.clone(), "docent_collection"));
        let index = VectorIndex::new(embedder.clone(), backend);
        assert_eq!(index.load().await, LoadStatus::NotFound);
        index
            .add_chunks(vec![page_chunk("cats", 1, "h1")])
            .await
            .unwrap();
        assert!(index_dir.join(INDEX_FILE).exists());

        let backend = Arc::new(SqliteBackend::new(index_dir, "docent_collection"));
        let reloaded = VectorIndex::new(embedder, backend);
        assert_eq!(reloaded.load().await, LoadStatus::Loaded { entries: 1 });
        assert!(reloaded.has_hash("h1").await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_backend_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), vec![0x13u8; 4096]).unwrap();

        let index = VectorIndex::new(
            Arc::new(KeywordEmbedder::new(&["cats"])),
            Arc::new(SqliteBackend::new(dir.path().to_path_buf(), "docent_collection")),
        );
        assert!(matches!(index.load().await, LoadStatus::Failed(_)));
        assert!(!index.exists().await);
    }
}
