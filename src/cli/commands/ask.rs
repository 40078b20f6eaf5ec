//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::DocentError;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.startup().await;

    let spinner = Output::spinner("Searching your documents...");
    let result = orchestrator.query(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer.answer);

            if !answer.citations.is_empty() {
                Output::header("Citations");
                for citation in &answer.citations {
                    Output::list_item(citation);
                }
            }
        }
        Err(DocentError::NotReady) => {
            Output::warning("Nothing has been indexed yet. Run 'docent ingest <file>' first.");
            return Err(DocentError::NotReady.into());
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
