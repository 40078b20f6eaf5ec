//! Ingest command implementation.

use crate::chunking::SourceKind;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, UploadOutcome};
use anyhow::{Context, Result};
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(file: &str, settings: Settings) -> Result<()> {
    let path = Settings::expand_path(file);
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file: {}", file))?
        .to_string();

    let kind = SourceKind::from_filename(&filename)?;

    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ingest(kind)) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let bytes = tokio::fs::read(Path::new(&path))
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.startup().await;

    let spinner = Output::spinner(&format!("Processing {} ({})...", filename, kind));
    let outcome = orchestrator.upload(&filename, bytes).await;
    spinner.finish_and_clear();

    match outcome {
        Ok(outcome @ UploadOutcome::Indexed { chunks }) => {
            Output::success(outcome.status_message());
            Output::kv("Chunks", &chunks.to_string());
        }
        Ok(outcome) => {
            Output::warning(outcome.status_message());
        }
        Err(e) => {
            Output::error(&format!("Failed to process {}: {}", filename, e));
            return Err(e.into());
        }
    }

    Ok(())
}
