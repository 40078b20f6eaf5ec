//! Content chunking for uploaded sources.
//!
//! Every supported [`SourceKind`] has a [`SourceChunker`] that turns a [`SourceFile`]
//! into indexable [`Chunk`]s. The orchestrator only talks to the trait.

mod pdf;
pub mod splitter;
mod transcript;
mod video;

pub use pdf::{LopdfExtractor, PageText, PdfChunker, PdfExtractor};
pub use splitter::RecursiveTextSplitter;
pub use transcript::{format_clock, format_time_range, TranscriptChunker, TranscriptChunks};
pub use video::VideoChunker;

use crate::error::{DocentError, Result};
use crate::transcription::TranscriptEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported video file extensions (audio will be extracted).
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpeg", "mpg", "3gp",
];

/// Kind of uploaded source, decided from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Video,
}

impl SourceKind {
    /// Classify a filename by extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        if ext == "pdf" {
            Ok(SourceKind::Pdf)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(SourceKind::Video)
        } else {
            Err(DocentError::UnsupportedFile(filename.to_string()))
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Pdf => write!(f, "pdf"),
            SourceKind::Video => write!(f, "video"),
        }
    }
}

/// An uploaded file ready for chunking.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Name the file was uploaded under.
    pub filename: String,
    /// Where the upload was saved.
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Content hash of `bytes`.
    pub hash: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Path as recorded in chunk metadata.
    pub fn source_label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Locator and provenance attached to every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChunkMetadata {
    Pdf {
        page: u32,
        source: String,
        hash: String,
    },
    Video {
        start: f64,
        end: f64,
        source: String,
        hash: String,
    },
}

impl ChunkMetadata {
    /// Hash of the file this chunk came from.
    pub fn hash(&self) -> &str {
        match self {
            ChunkMetadata::Pdf { hash, .. } | ChunkMetadata::Video { hash, .. } => hash,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            ChunkMetadata::Pdf { source, .. } | ChunkMetadata::Video { source, .. } => source,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ChunkMetadata::Pdf { .. } => SourceKind::Pdf,
            ChunkMetadata::Video { .. } => SourceKind::Video,
        }
    }
}

/// The atomic unit that gets embedded, indexed and retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, prefixed with its locator.
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(text: String, metadata: ChunkMetadata) -> Self {
        Self { text, metadata }
    }
}

/// Result of chunking one source.
#[derive(Debug, Clone, Default)]
pub struct ChunkedSource {
    pub chunks: Vec<Chunk>,
    /// Raw transcript for display, present for video sources.
    pub transcript: Option<Vec<TranscriptEntry>>,
}

/// Turns one kind of source into chunks.
#[async_trait]
pub trait SourceChunker: Send + Sync {
    /// Chunk a source file.
    async fn chunk(&self, source: &SourceFile) -> Result<ChunkedSource>;
}
