//! Time-based chunking of timed transcript segments.
//!
//! Consecutive segments are accumulated until the buffer spans at least the target
//! duration, then emitted as one chunk prefixed with its `[mm:ss - mm:ss]` range.

use super::{Chunk, ChunkMetadata};
use crate::transcription::{TranscriptEntry, TranscriptSegment};

/// Chunks produced from a transcript, plus the raw transcript for display.
#[derive(Debug, Clone, Default)]
pub struct TranscriptChunks {
    pub chunks: Vec<Chunk>,
    pub transcript: Vec<TranscriptEntry>,
}

/// Fixed-duration transcript chunker.
pub struct TranscriptChunker {
    chunk_duration: f64,
}

impl TranscriptChunker {
    pub fn new(chunk_duration: f64) -> Self {
        Self { chunk_duration }
    }

    /// Aggregate segments into chunks of at least `chunk_duration` seconds.
    ///
    /// The duration is checked after each segment is appended, so a single long segment
    /// closes its own chunk. A trailing shorter buffer is emitted as a final chunk.
    pub fn chunk(&self, segments: &[TranscriptSegment], source: &str, hash: &str) -> TranscriptChunks {
        let mut chunks = Vec::new();
        let mut transcript = Vec::with_capacity(segments.len());

        let mut buffer: Vec<&str> = Vec::new();
        let mut start: Option<f64> = None;
        let mut end = 0.0;

        for segment in segments {
            let text = segment.text.trim();
            transcript.push(TranscriptEntry {
                text: text.to_string(),
                start: segment.start_seconds,
            });

            let chunk_start = *start.get_or_insert(segment.start_seconds);
            if !text.is_empty() {
                buffer.push(text);
            }
            end = segment.end_seconds;

            if end - chunk_start >= self.chunk_duration {
                if let Some(chunk) = build_chunk(&buffer, chunk_start, end, source, hash) {
                    chunks.push(chunk);
                }
                buffer.clear();
                start = None;
            }
        }

        if let Some(chunk_start) = start {
            if let Some(chunk) = build_chunk(&buffer, chunk_start, end, source, hash) {
                chunks.push(chunk);
            }
        }

        TranscriptChunks { chunks, transcript }
    }
}

impl Default for TranscriptChunker {
    fn default() -> Self {
        Self::new(60.0)
    }
}

fn build_chunk(buffer: &[&str], start: f64, end: f64, source: &str, hash: &str) -> Option<Chunk> {
    if buffer.is_empty() {
        return None;
    }

    Some(Chunk::new(
        format!("{} {}", format_time_range(start, end), buffer.join(" ")),
        ChunkMetadata::Video {
            start,
            end,
            source: source.to_string(),
            hash: hash.to_string(),
        },
    ))
}

/// Format a time range as `[mm:ss - mm:ss]`.
///
/// Seconds are truncated; minutes are not wrapped into hours.
pub fn format_time_range(start: f64, end: f64) -> String {
    format!("[{} - {}]", format_clock(start), format_clock(end))
}

/// Format seconds as `mm:ss`, truncating fractions.
pub fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
