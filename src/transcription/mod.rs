//! Transcription module for Docent.
//!
//! Speech-to-text is an external collaborator: it turns an audio file into a sequence
//! of timed text segments.

mod models;
mod whisper;

pub use models::{TranscriptEntry, TranscriptSegment};
pub use whisper::WhisperTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file and return segments with timestamps, in order.
    async fn transcribe(&self, audio_path: &Path) -> Result<Vec<TranscriptSegment>>;
}
