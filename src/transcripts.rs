//! Raw transcripts kept next to uploaded videos for display.

use crate::error::Result;
use crate::transcription::TranscriptEntry;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Suffix of persisted transcript files.
const TRANSCRIPT_SUFFIX: &str = ".transcript.json";

/// Reads and writes `<stem>.transcript.json` files in one directory.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File a video's transcript is stored in. Only the file name of `filename` is
    /// used, and whitespace in its stem becomes `_`.
    pub fn path_for(&self, filename: &str) -> PathBuf {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let key: String = stem
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        self.dir.join(format!("{}{}", key, TRANSCRIPT_SUFFIX))
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub async fn save(&self, filename: &str, entries: &[TranscriptEntry]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(filename);
        let json = serde_json::to_string(entries)?;
        tokio::fs::write(&path, json).await?;
        debug!("Saved transcript to {:?}", path);
        Ok(path)
    }

    /// The stored transcript, or `None` if there is none.
    pub async fn load(&self, filename: &str) -> Result<Option<Vec<TranscriptEntry>>> {
        let path = self.path_for(filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}
