//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity. Every row is
//! tagged with a collection name so several logical indexes can share one file.
//! Source hashes live in their own table, keyed by (collection, hash).

use super::{rank, IndexEntry, SearchResult, VectorStore};
use crate::chunking::ChunkMetadata;
use crate::error::{DocentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        id TEXT PRIMARY KEY,
        collection TEXT NOT NULL,
        text TEXT NOT NULL,
        metadata_json TEXT NOT NULL,
        source_hash TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection);

    CREATE TABLE IF NOT EXISTS source_hashes (
        collection TEXT NOT NULL,
        hash TEXT NOT NULL,
        first_indexed_at TEXT NOT NULL,
        PRIMARY KEY (collection, hash)
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    collection: String,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path` for the given collection.
    #[instrument(skip_all)]
    pub fn open(path: &Path, collection: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Fails here, not on first query, when the file is not a database
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened SQLite vector store at {:?} (collection {})", path, collection);

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory(collection: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DocentError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn load_entries(&self, conn: &Connection) -> Result<Vec<IndexEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, text, metadata_json, embedding, indexed_at
            FROM entries
            WHERE collection = ?1
            "#,
        )?;

        let rows = stmt.query_map(params![self.collection], |row| {
            let id: String = row.get(0)?;
            let text: String = row.get(1)?;
            let metadata_json: String = row.get(2)?;
            let embedding: Vec<u8> = row.get(3)?;
            let indexed_at: String = row.get(4)?;
            Ok((id, text, metadata_json, embedding, indexed_at))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, text, metadata_json, embedding, indexed_at) = row?;
            let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)?;
            entries.push(IndexEntry {
                id: uuid::Uuid::parse_str(&id).unwrap_or_default(),
                text,
                metadata,
                embedding: Self::bytes_to_embedding(&embedding),
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            });
        }

        Ok(entries)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn add_batch(&self, entries: &[IndexEntry]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for entry in entries {
            let metadata_json = serde_json::to_string(&entry.metadata)?;

            tx.execute(
                r#"
                INSERT INTO entries
                (id, collection, text, metadata_json, source_hash, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.id.to_string(),
                    self.collection,
                    entry.text,
                    metadata_json,
                    entry.metadata.hash(),
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;

            tx.execute(
                r#"
                INSERT OR IGNORE INTO source_hashes (collection, hash, first_indexed_at)
                VALUES (?1, ?2, ?3)
                "#,
                params![
                    self.collection,
                    entry.metadata.hash(),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Added {} entries", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;
        let entries = self.load_entries(&conn)?;
        let results = rank(entries.iter(), query_embedding, limit);
        debug!("Found {} matching entries", results.len());
        Ok(results)
    }

    async fn has_hash(&self, hash: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM source_hashes WHERE collection = ?1 AND hash = ?2",
            params![self.collection, hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn entry_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
