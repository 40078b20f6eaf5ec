//! PDF chunking.
//!
//! Extracts text page by page and splits each page independently so every chunk can be
//! attributed to exactly one page.

use super::splitter::RecursiveTextSplitter;
use super::{Chunk, ChunkMetadata, ChunkedSource, SourceChunker, SourceFile};
use crate::error::{DocentError, Result};
use async_trait::async_trait;
use lopdf::Document;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Text of a single PDF page.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-indexed page number.
    pub number: u32,
    pub text: String,
}

/// Extracts per-page text from PDF bytes.
pub trait PdfExtractor: Send + Sync {
    /// Return the pages that carry text. Pages without extractable text may be omitted.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>>;
}

/// [`PdfExtractor`] backed by lopdf.
#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>> {
        let document =
            Document::load_mem(bytes).map_err(|e| DocentError::PdfParse(e.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            match document.extract_text(&[page_no]) {
                Ok(text) if !text.trim().is_empty() => pages.push(PageText {
                    number: page_no,
                    text,
                }),
                Ok(_) => debug!("Page {} has no extractable text", page_no),
                Err(e) => warn!("Skipping page {}: {}", page_no, e),
            }
        }

        Ok(pages)
    }
}

/// Chunker for PDF sources.
pub struct PdfChunker {
    extractor: Arc<dyn PdfExtractor>,
    splitter: RecursiveTextSplitter,
}

impl PdfChunker {
    /// Create a chunker using lopdf and the given chunk size/overlap.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self::with_extractor(Arc::new(LopdfExtractor), chunk_size, chunk_overlap)
    }

    /// Create a chunker with a custom extractor.
    pub fn with_extractor(
        extractor: Arc<dyn PdfExtractor>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            extractor,
            splitter: RecursiveTextSplitter::new(chunk_size, chunk_overlap),
        }
    }

    /// Split extracted pages into page-tagged chunks.
    pub fn chunk_pages(&self, pages: &[PageText], source: &str, hash: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }

            for piece in self.splitter.split_text(&page.text) {
                chunks.push(Chunk::new(
                    format!("[Page {}] {}", page.number, piece),
                    ChunkMetadata::Pdf {
                        page: page.number,
                        source: source.to_string(),
                        hash: hash.to_string(),
                    },
                ));
            }
        }

        chunks
    }
}

#[async_trait]
impl SourceChunker for PdfChunker {
    #[instrument(skip(self, source), fields(file = %source.filename))]
    async fn chunk(&self, source: &SourceFile) -> Result<ChunkedSource> {
        let extractor = Arc::clone(&self.extractor);
        let bytes = source.bytes.clone();

        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&bytes))
            .await
            .map_err(|e| DocentError::PdfParse(format!("Extraction task failed: {}", e)))??;

        let chunks = self.chunk_pages(&pages, &source.source_label(), &source.hash);
        info!("{} pages with text, {} chunks", pages.len(), chunks.len());

        Ok(ChunkedSource {
            chunks,
            transcript: None,
        })
    }
}
