//! Transcript command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::transcripts::TranscriptStore;
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(filename: &str, settings: Settings) -> Result<()> {
    let store = TranscriptStore::new(settings.uploads_dir());

    match store.load(filename).await? {
        Some(entries) => {
            for entry in &entries {
                Output::transcript_line(entry.start, &entry.text);
            }
        }
        None => {
            Output::warning("Transcript not found.");
            Output::info(&format!("Looked in {}", store.path_for(filename).display()));
        }
    }

    Ok(())
}
