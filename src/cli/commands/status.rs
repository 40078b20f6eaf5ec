//! Status command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::index::LoadStatus;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the status command.
pub async fn run_status(settings: Settings) -> Result<()> {
    let index_dir = settings.index_dir();
    let uploads_dir = settings.uploads_dir();

    let orchestrator = Orchestrator::new(settings)?;
    let load = orchestrator.startup().await;
    let status = orchestrator.status().await;

    if status.ready {
        Output::success(status.message());
    } else {
        Output::warning(status.message());
    }

    Output::kv("Index", &index_dir.display().to_string());
    Output::kv("Uploads", &uploads_dir.display().to_string());
    match load {
        LoadStatus::Loaded { entries } => Output::kv("Chunks", &entries.to_string()),
        LoadStatus::NotFound => Output::kv("Chunks", "0"),
        LoadStatus::Failed(reason) => Output::kv("Load error", &reason),
    }

    Ok(())
}
