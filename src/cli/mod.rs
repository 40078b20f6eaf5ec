//! CLI module for Docent.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Docent - question answering over your PDFs and videos
///
/// Upload documents and recordings, then ask questions and get answers that cite
/// the pages and timestamps they came from.
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Index a PDF or video file
    Ingest {
        /// Path to the file
        file: String,
    },

    /// Ask a question about the indexed content
    Ask {
        /// The question to ask
        question: String,
    },

    /// Show whether the index is ready for questions
    Status,

    /// Print the stored transcript of an uploaded video
    Transcript {
        /// File name the video was uploaded under
        filename: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["docent", "-vv", "ask", "What is on page 2?"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Ask { ref question } if question == "What is on page 2?"));
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["docent", "serve", "--port", "9000"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
