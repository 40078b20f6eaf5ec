//! Video chunking: audio extraction, transcription, then time-based chunking.

use super::transcript::TranscriptChunker;
use super::{ChunkedSource, SourceChunker, SourceFile};
use crate::error::Result;
use crate::media::{AudioExtractor, FfmpegExtractor};
use crate::transcription::Transcriber;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Chunker for video sources.
pub struct VideoChunker {
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    chunker: TranscriptChunker,
    temp_dir: PathBuf,
}

impl VideoChunker {
    pub fn new(transcriber: Arc<dyn Transcriber>, chunk_duration: f64, temp_dir: PathBuf) -> Self {
        Self::with_extractor(Arc::new(FfmpegExtractor), transcriber, chunk_duration, temp_dir)
    }

    pub fn with_extractor(
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        chunk_duration: f64,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            chunker: TranscriptChunker::new(chunk_duration),
            temp_dir,
        }
    }
}

#[async_trait]
impl SourceChunker for VideoChunker {
    #[instrument(skip(self, source), fields(file = %source.filename))]
    async fn chunk(&self, source: &SourceFile) -> Result<ChunkedSource> {
        let audio_path = self
            .extractor
            .extract(&source.path, &source.hash, &self.temp_dir)
            .await?;

        let transcribed = self.transcriber.transcribe(&audio_path).await;

        // The audio is only needed for transcription, whatever its outcome
        if let Err(e) = tokio::fs::remove_file(&audio_path).await {
            warn!("Failed to cleanup audio file: {}", e);
        }

        let segments = transcribed?;
        info!("Transcribed {} segments", segments.len());

        let result = self
            .chunker
            .chunk(&segments, &source.source_label(), &source.hash);

        Ok(ChunkedSource {
            chunks: result.chunks,
            transcript: Some(result.transcript),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkMetadata, SourceKind};
    use crate::error::DocentError;
    use crate::transcription::TranscriptSegment;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Writes a placeholder audio file where ffmpeg would.
    struct FakeExtractor;

    #[async_trait]
    impl AudioExtractor for FakeExtractor {
        async fn extract(&self, _video: &Path, name: &str, output_dir: &Path) -> Result<PathBuf> {
            tokio::fs::create_dir_all(output_dir).await?;
            let path = output_dir.join(format!("{}.mp3", name));
            tokio::fs::write(&path, b"audio").await?;
            Ok(path)
        }
    }

    struct MissingFfmpeg;

    #[async_trait]
    impl AudioExtractor for MissingFfmpeg {
        async fn extract(&self, _video: &Path, _name: &str, _dir: &Path) -> Result<PathBuf> {
            Err(DocentError::ToolNotFound("ffmpeg".to_string()))
        }
    }

    /// Checks the audio exists when called, then replies with a fixed result.
    struct CheckingTranscriber {
        segments: Option<Vec<TranscriptSegment>>,
        calls: AtomicUsize,
    }

    impl CheckingTranscriber {
        fn new(segments: Option<Vec<TranscriptSegment>>) -> Arc<Self> {
            Arc::new(Self {
                segments,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transcriber for CheckingTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(audio_path.exists(), "audio must exist while transcribing");
            self.segments
                .clone()
                .ok_or_else(|| DocentError::Transcription("service unavailable".to_string()))
        }
    }

    fn video_source(dir: &Path) -> SourceFile {
        SourceFile {
            filename: "talk.mp4".to_string(),
            path: dir.join("uploads").join("talk.mp4"),
            kind: SourceKind::Video,
            hash: "abc123".to_string(),
            bytes: b"video".to_vec(),
        }
    }

    fn audio_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_transcribes_chunks_and_removes_audio() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("tmp");
        let transcriber = CheckingTranscriber::new(Some(vec![
            TranscriptSegment::new(0.0, 60.0, "Welcome to the river tour.".to_string()),
            TranscriptSegment::new(75.0, 90.0, "The valve sits upstream.".to_string()),
        ]));
        let chunker = VideoChunker::with_extractor(
            Arc::new(FakeExtractor),
            transcriber.clone(),
            60.0,
            temp.clone(),
        );

        let source = video_source(dir.path());
        let result = chunker.chunk(&source).await.unwrap();

        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.chunks.len(), 2);
        assert!(matches!(
            &result.chunks[0].metadata,
            ChunkMetadata::Video { source: label, .. } if *label == source.source_label()
        ));
        assert_eq!(result.transcript.unwrap().len(), 2);
        assert_eq!(audio_files(&temp), 0);
    }

    #[tokio::test]
    async fn test_audio_removed_when_transcription_fails() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("tmp");
        let chunker = VideoChunker::with_extractor(
            Arc::new(FakeExtractor),
            CheckingTranscriber::new(None),
            60.0,
            temp.clone(),
        );

        let result = chunker.chunk(&video_source(dir.path())).await;

        assert!(matches!(result, Err(DocentError::Transcription(_))));
        assert_eq!(audio_files(&temp), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let transcriber = CheckingTranscriber::new(Some(Vec::new()));
        let chunker = VideoChunker::with_extractor(
            Arc::new(MissingFfmpeg),
            transcriber.clone(),
            60.0,
            dir.path().join("tmp"),
        );

        let result = chunker.chunk(&video_source(dir.path())).await;

        assert!(matches!(result, Err(DocentError::ToolNotFound(_))));
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
    }
}
