//! Pipeline orchestrator for Docent.
//!
//! Coordinates uploads from raw bytes to indexed chunks, and questions from retrieval
//! to a validated answer. Ingestion is single-writer: the dedup check and the index
//! write happen under one lock.

use crate::chunking::{PdfChunker, SourceChunker, SourceFile, SourceKind, VideoChunker};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{DocentError, Result};
use crate::hashing::content_hash;
use crate::index::{IndexBackend, LoadStatus, SqliteBackend, VectorIndex};
use crate::rag::{
    join_context, AnswerModel, AnswerSynthesizer, OpenAIAnswerModel, Retriever, StructuredAnswer,
};
use crate::transcription::{Transcriber, TranscriptEntry, WhisperTranscriber};
use crate::transcripts::TranscriptStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// What happened to an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A file with the same content is already indexed.
    AlreadyIndexed,
    /// The file produced no chunks.
    NoContent,
    /// The file was chunked and added to the index.
    Indexed { chunks: usize },
}

impl UploadOutcome {
    pub fn status_message(&self) -> &'static str {
        match self {
            UploadOutcome::AlreadyIndexed => "File already exists in vectorstore.",
            UploadOutcome::NoContent => "No valid content found in file.",
            UploadOutcome::Indexed { .. } => "File processed and vectorstore updated.",
        }
    }
}

/// Whether the index can answer questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStatus {
    pub ready: bool,
}

impl IndexStatus {
    pub fn message(&self) -> &'static str {
        if self.ready {
            "Vectorstore is ready for queries."
        } else {
            "Vectorstore not ready. Please upload files."
        }
    }
}

/// The main orchestrator for the Docent pipeline.
pub struct Orchestrator {
    settings: Settings,
    index: Arc<VectorIndex>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    chunkers: HashMap<SourceKind, Arc<dyn SourceChunker>>,
    transcripts: TranscriptStore,
    uploads_dir: PathBuf,
    ingest_lock: Mutex<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the OpenAI, SQLite and ffmpeg collaborators.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let backend: Arc<dyn IndexBackend> = Arc::new(SqliteBackend::new(
            settings.index_dir(),
            &settings.index.collection,
        ));

        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::with_config(
            &settings.transcription.model,
            settings.transcription.split_duration_seconds,
            settings.transcription.max_concurrent_chunks,
            settings.transcription.language.clone(),
        )?);

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let mut chunkers: HashMap<SourceKind, Arc<dyn SourceChunker>> = HashMap::new();
        chunkers.insert(
            SourceKind::Pdf,
            Arc::new(PdfChunker::new(
                settings.chunking.pdf_chunk_size,
                settings.chunking.pdf_chunk_overlap,
            )),
        );
        chunkers.insert(
            SourceKind::Video,
            Arc::new(VideoChunker::new(
                transcriber,
                settings.chunking.transcript_chunk_seconds,
                temp_dir,
            )),
        );

        let answer_model: Arc<dyn AnswerModel> = Arc::new(OpenAIAnswerModel::new(
            &settings.rag.model,
            settings.rag.temperature,
        )?);

        info!(
            "Using {} for embeddings and {} for answers",
            settings.embedding.model, settings.rag.model
        );

        Self::with_components(settings, prompts, embedder, backend, chunkers, answer_model)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        backend: Arc<dyn IndexBackend>,
        chunkers: HashMap<SourceKind, Arc<dyn SourceChunker>>,
        answer_model: Arc<dyn AnswerModel>,
    ) -> Result<Self> {
        let uploads_dir = settings.uploads_dir();
        std::fs::create_dir_all(&uploads_dir)?;

        let index = Arc::new(VectorIndex::new(embedder, backend));
        let retriever = Retriever::new(index.clone(), settings.rag.top_k);

        Ok(Self {
            index,
            retriever,
            synthesizer: AnswerSynthesizer::new(answer_model, prompts),
            chunkers,
            transcripts: TranscriptStore::new(uploads_dir.clone()),
            uploads_dir,
            ingest_lock: Mutex::new(()),
            settings,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the vector index.
    pub fn index(&self) -> Arc<VectorIndex> {
        self.index.clone()
    }

    /// Load a previously persisted index, if any.
    pub async fn startup(&self) -> LoadStatus {
        let status = self.index.load().await;
        match &status {
            LoadStatus::Loaded { entries } => info!("Vector index ready ({} entries)", entries),
            LoadStatus::NotFound => info!("Vector index empty; waiting for uploads"),
            LoadStatus::Failed(reason) => info!("Starting without an index: {}", reason),
        }
        status
    }

    /// Save, deduplicate, chunk and index an uploaded file.
    #[instrument(skip(self, bytes), fields(filename = %filename, size = bytes.len()))]
    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadOutcome> {
        let kind = SourceKind::from_filename(filename)?;
        let chunker = self
            .chunkers
            .get(&kind)
            .cloned()
            .ok_or_else(|| DocentError::UnsupportedFile(filename.to_string()))?;

        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DocentError::InvalidInput(format!("Invalid file name: {}", filename)))?
            .to_string();

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let path = self.uploads_dir.join(&name);
        tokio::fs::write(&path, &bytes).await?;

        let hash = content_hash(&bytes);

        let _guard = self.ingest_lock.lock().await;

        if self.index.has_hash(&hash).await? {
            info!("{} is already indexed", name);
            return Ok(UploadOutcome::AlreadyIndexed);
        }

        let source = SourceFile {
            filename: name.clone(),
            path,
            kind,
            hash,
            bytes,
        };

        info!("Chunking {} as {}", name, kind);
        let chunked = chunker.chunk(&source).await?;

        if let Some(transcript) = &chunked.transcript {
            self.transcripts.save(&name, transcript).await?;
        }

        if chunked.chunks.is_empty() {
            info!("No content found in {}", name);
            return Ok(UploadOutcome::NoContent);
        }

        let chunks = self.index.add_chunks(chunked.chunks).await?;
        info!("Indexed {} chunks from {}", chunks, name);

        Ok(UploadOutcome::Indexed { chunks })
    }

    /// Whether questions can be answered.
    pub async fn status(&self) -> IndexStatus {
        IndexStatus {
            ready: self.index.exists().await,
        }
    }

    /// Answer a question from the indexed content.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn query(&self, question: &str) -> Result<StructuredAnswer> {
        let chunks = self.retriever.fetch(question).await?;
        let context = join_context(&chunks);
        self.synthesizer.answer(&context, question).await
    }

    /// The stored transcript of an uploaded video.
    pub async fn transcript(&self, filename: &str) -> Result<Option<Vec<TranscriptEntry>>> {
        self.transcripts.load(filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkedSource;
    use crate::testing::{fake_orchestrator, text_pdf_chunker};
    use crate::transcription::TranscriptSegment;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and delegates to the PDF chunker.
    struct CountingChunker {
        inner: PdfChunker,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceChunker for CountingChunker {
        async fn chunk(&self, source: &SourceFile) -> Result<ChunkedSource> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.inner.chunk(source).await
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        pdf: Arc<CountingChunker>,
        _dir: tempfile::TempDir,
    }

    fn harness(answer: &str, video: Vec<TranscriptSegment>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let pdf = Arc::new(CountingChunker {
            inner: text_pdf_chunker(),
            calls: AtomicUsize::new(0),
        });
        let orchestrator = fake_orchestrator(dir.path(), pdf.clone(), video, answer);

        Harness {
            orchestrator,
            pdf,
            _dir: dir,
        }
    }

    const PUMP_ANSWER: &str = r#"{"question":"How is the pump primed?","answer":"Open the valve and fill the housing.","citations":["(Page 1)"]}"#;

    #[tokio::test]
    async fn test_upload_is_idempotent() {
        let h = harness(PUMP_ANSWER, Vec::new());
        let bytes = b"Prime the pump by opening the valve.".to_vec();

        let first = h.orchestrator.upload("manual.pdf", bytes.clone()).await.unwrap();
        assert_eq!(first, UploadOutcome::Indexed { chunks: 1 });
        assert_eq!(first.status_message(), "File processed and vectorstore updated.");

        // Same content under another name is still a duplicate.
        let second = h.orchestrator.upload("copy.pdf", bytes).await.unwrap();
        assert_eq!(second, UploadOutcome::AlreadyIndexed);
        assert_eq!(second.status_message(), "File already exists in vectorstore.");

        assert_eq!(h.pdf.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.orchestrator.index().search("pump", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_saves_file_by_name_only() {
        let h = harness(PUMP_ANSWER, Vec::new());
        h.orchestrator
            .upload("../nested/manual.pdf", b"pump".to_vec())
            .await
            .unwrap();

        let saved = h.orchestrator.settings().uploads_dir().join("manual.pdf");
        assert_eq!(std::fs::read(saved).unwrap(), b"pump");
    }

    #[tokio::test]
    async fn test_empty_pdf_leaves_index_unready() {
        let h = harness(PUMP_ANSWER, Vec::new());
        assert!(!h.orchestrator.status().await.ready);

        let outcome = h
            .orchestrator
            .upload("blank.pdf", b"  \n\x0c\n".to_vec())
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::NoContent);
        assert_eq!(outcome.status_message(), "No valid content found in file.");

        let status = h.orchestrator.status().await;
        assert!(!status.ready);
        assert_eq!(status.message(), "Vectorstore not ready. Please upload files.");

        h.orchestrator.upload("real.pdf", b"valve".to_vec()).await.unwrap();
        let status = h.orchestrator.status().await;
        assert!(status.ready);
        assert_eq!(status.message(), "Vectorstore is ready for queries.");
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_uploads_index_once() {
        let h = harness(PUMP_ANSWER, Vec::new());
        let bytes = b"The river powers the pump.".to_vec();

        let (a, b) = tokio::join!(
            h.orchestrator.upload("a.pdf", bytes.clone()),
            h.orchestrator.upload("b.pdf", bytes.clone()),
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, UploadOutcome::Indexed { .. }));

        assert_eq!(
            outcomes,
            vec![
                UploadOutcome::AlreadyIndexed,
                UploadOutcome::Indexed { chunks: 1 }
            ]
        );
        assert_eq!(h.pdf.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_upload() {
        let h = harness(PUMP_ANSWER, Vec::new());
        let result = h.orchestrator.upload("notes.txt", b"text".to_vec()).await;
        assert!(matches!(result, Err(DocentError::UnsupportedFile(_))));
    }

    #[tokio::test]
    async fn test_video_upload_stores_transcript() {
        let segments = vec![
            TranscriptSegment::new(0.0, 30.0, " The river ".to_string()),
            TranscriptSegment::new(30.0, 65.0, "floods in spring.".to_string()),
            TranscriptSegment::new(65.0, 70.0, "The end.".to_string()),
        ];
        let h = harness(PUMP_ANSWER, segments);

        let outcome = h
            .orchestrator
            .upload("river talk.mp4", b"fake video".to_vec())
            .await
            .unwrap();
        assert_eq!(outcome, UploadOutcome::Indexed { chunks: 2 });

        let transcript = h
            .orchestrator
            .transcript("river talk.mp4")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].text, "The river");
        assert_eq!(transcript[1].start, 30.0);

        assert!(h.orchestrator.transcript("other.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_before_upload() {
        let h = harness(PUMP_ANSWER, Vec::new());
        assert!(matches!(
            h.orchestrator.query("How is the pump primed?").await,
            Err(DocentError::NotReady)
        ));
    }

    #[tokio::test]
    async fn test_query_answers_with_citations() {
        let h = harness(PUMP_ANSWER, Vec::new());
        h.orchestrator
            .upload("manual.pdf", b"Prime the pump by opening the valve.".to_vec())
            .await
            .unwrap();

        let answer = h.orchestrator.query("How is the pump primed?").await.unwrap();
        assert_eq!(answer.citations, vec!["(Page 1)".to_string()]);
    }

    #[tokio::test]
    async fn test_query_rejects_invalid_model_output() {
        let h = harness("not json at all", Vec::new());
        h.orchestrator
            .upload("manual.pdf", b"pump".to_vec())
            .await
            .unwrap();

        let err = h.orchestrator.query("pump?").await.unwrap_err();
        assert!(matches!(err, DocentError::Synthesis { .. }));
    }

    #[tokio::test]
    async fn test_startup_reports_not_found() {
        let h = harness(PUMP_ANSWER, Vec::new());
        assert_eq!(h.orchestrator.startup().await, LoadStatus::NotFound);
    }
}
