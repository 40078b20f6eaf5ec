//! Data models for transcription.

use serde::{Deserialize, Serialize};

/// A single timed segment returned by the speech-to-text service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new transcript segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Shift both timestamps by `offset` seconds.
    pub fn offset_by(mut self, offset: f64) -> Self {
        self.start_seconds += offset;
        self.end_seconds += offset;
        self
    }
}

/// Display form of a segment, persisted per video as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
}
