//! OpenAI Whisper transcription implementation.

use super::{Transcriber, TranscriptSegment};
use crate::error::{DocentError, Result};
use crate::media::split_audio;
use crate::openai::create_client;
use async_openai::types::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based transcriber.
pub struct WhisperTranscriber {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    split_duration_seconds: u32,
    max_concurrent_chunks: usize,
    language: Option<String>,
}

impl WhisperTranscriber {
    /// Create a new Whisper transcriber with custom configuration.
    pub fn with_config(
        model: &str,
        split_duration_seconds: u32,
        max_concurrent_chunks: usize,
        language: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            split_duration_seconds,
            max_concurrent_chunks: max_concurrent_chunks.max(1),
            language,
        })
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        debug!("Transcribing audio file");

        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| DocentError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| DocentError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<TranscriptSegment> = response
            .segments
            .map(|segs| {
                segs.iter()
                    .map(|s| TranscriptSegment::new(s.start as f64, s.end as f64, s.text.clone()))
                    .collect()
            })
            .unwrap_or_else(|| {
                // No segment breakdown: treat the whole response as one segment
                vec![TranscriptSegment::new(
                    0.0,
                    response.duration as f64,
                    response.text.clone(),
                )]
            });

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }

    /// Transcribe an audio file, splitting long audio into pieces transcribed concurrently.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_with_splitting(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        let temp_dir = tempfile::tempdir()?;
        let pieces = split_audio(audio_path, temp_dir.path(), self.split_duration_seconds).await?;

        if pieces.len() == 1 {
            return self.transcribe_single(audio_path).await;
        }

        let piece_count = pieces.len();
        info!("Processing {} audio pieces with {}", piece_count, self.model);

        let mut results: Vec<(usize, f64, Vec<TranscriptSegment>)> = Vec::with_capacity(piece_count);

        let mut stream = stream::iter(pieces.into_iter().enumerate())
            .map(|(idx, (piece_path, time_offset))| async move {
                let result = self.transcribe_single(&piece_path).await;
                (idx, time_offset, result)
            })
            .buffer_unordered(self.max_concurrent_chunks);

        while let Some((idx, time_offset, result)) = stream.next().await {
            match result {
                Ok(segments) => results.push((idx, time_offset, segments)),
                Err(e) => {
                    return Err(DocentError::Transcription(format!(
                        "Piece {} at {:.0}s failed: {}",
                        idx, time_offset, e
                    )));
                }
            }
        }

        results.sort_by_key(|(idx, _, _)| *idx);

        let all_segments = results
            .into_iter()
            .flat_map(|(_, time_offset, segments)| {
                segments.into_iter().map(move |s| s.offset_by(time_offset))
            })
            .collect();

        Ok(all_segments)
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>> {
        self.transcribe_with_splitting(audio_path).await
    }
}
