//! Fake collaborators shared by unit tests.

use crate::chunking::{
    ChunkedSource, PageText, PdfChunker, PdfExtractor, SourceChunker, SourceFile, SourceKind,
    TranscriptChunker,
};
use crate::config::{Prompts, Settings};
use crate::embedding::KeywordEmbedder;
use crate::error::{DocentError, Result};
use crate::index::MemoryBackend;
use crate::orchestrator::Orchestrator;
use crate::rag::{AnswerModel, AnswerRequest};
use crate::transcription::TranscriptSegment;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Treats the bytes as UTF-8 text with pages separated by form feeds.
pub(crate) struct PlainTextPages;

impl PdfExtractor for PlainTextPages {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>> {
        let text = String::from_utf8_lossy(bytes);
        Ok(text
            .split('\u{c}')
            .enumerate()
            .map(|(i, page)| PageText {
                number: i as u32 + 1,
                text: page.to_string(),
            })
            .collect())
    }
}

/// Video chunker with a fixed transcript in place of ffmpeg and Whisper.
pub(crate) struct ScriptedVideo(pub Vec<TranscriptSegment>);

#[async_trait]
impl SourceChunker for ScriptedVideo {
    async fn chunk(&self, source: &SourceFile) -> Result<ChunkedSource> {
        let result =
            TranscriptChunker::new(60.0).chunk(&self.0, &source.source_label(), &source.hash);
        Ok(ChunkedSource {
            chunks: result.chunks,
            transcript: Some(result.transcript),
        })
    }
}

/// Answer model that always replies with the same text.
pub(crate) struct FixedAnswer(pub String);

#[async_trait]
impl AnswerModel for FixedAnswer {
    async fn complete(&self, _request: AnswerRequest) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Answer model whose every call fails the way an unavailable chat API does.
pub(crate) struct UnavailableModel;

#[async_trait]
impl AnswerModel for UnavailableModel {
    async fn complete(&self, _request: AnswerRequest) -> Result<String> {
        Err(DocentError::OpenAI("Failed to generate response: 503".to_string()))
    }
}

/// Settings rooted in a scratch directory.
pub(crate) fn scratch_settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.general.uploads_dir = dir.join("uploads").display().to_string();
    settings.general.temp_dir = dir.join("tmp").display().to_string();
    settings.index.dir = dir.join("index").display().to_string();
    settings
}

/// An orchestrator wired entirely to fakes.
pub(crate) fn fake_orchestrator(
    dir: &Path,
    pdf: Arc<dyn SourceChunker>,
    video: Vec<TranscriptSegment>,
    answer: &str,
) -> Orchestrator {
    orchestrator_with_model(dir, pdf, video, Arc::new(FixedAnswer(answer.to_string())))
}

/// Like [`fake_orchestrator`], with a caller-supplied answer model.
pub(crate) fn orchestrator_with_model(
    dir: &Path,
    pdf: Arc<dyn SourceChunker>,
    video: Vec<TranscriptSegment>,
    model: Arc<dyn AnswerModel>,
) -> Orchestrator {
    let mut chunkers: HashMap<SourceKind, Arc<dyn SourceChunker>> = HashMap::new();
    chunkers.insert(SourceKind::Pdf, pdf);
    chunkers.insert(SourceKind::Video, Arc::new(ScriptedVideo(video)));

    Orchestrator::with_components(
        scratch_settings(dir),
        Prompts::default(),
        Arc::new(KeywordEmbedder::new(&["pump", "valve", "river"])),
        Arc::new(MemoryBackend::new()),
        chunkers,
        model,
    )
    .expect("orchestrator")
}

/// PDF chunker over [`PlainTextPages`].
pub(crate) fn text_pdf_chunker() -> PdfChunker {
    PdfChunker::with_extractor(Arc::new(PlainTextPages), 500, 50)
}
