//! Docent CLI entry point.

use anyhow::Result;
use clap::Parser;
use docent::cli::{commands, Cli, Commands};
use docent::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("docent={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.uploads_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Ingest { file } => {
            commands::run_ingest(file, settings).await?;
        }

        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::Status => {
            commands::run_status(settings).await?;
        }

        Commands::Transcript { filename } => {
            commands::run_transcript(filename, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &config_path, settings)?;
        }
    }

    Ok(())
}
