//! Docent - question answering over PDFs and videos
//!
//! Upload documents and recordings, then ask natural-language questions and get
//! structured answers that cite the pages and timestamps they came from.
//!
//! # Overview
//!
//! Docent allows you to:
//! - Index PDF documents page by page
//! - Transcribe videos and index the transcript in timed windows
//! - Skip files whose content has already been indexed
//! - Ask questions and get answers with validated citations
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `hashing` - Content fingerprints for deduplication
//! - `media` - Audio extraction from video files (ffmpeg)
//! - `transcription` - Speech-to-text transcription
//! - `chunking` - PDF and transcript chunking
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `index` - The lazily created, persistent vector index
//! - `rag` - Retrieval and structured answer synthesis
//! - `transcripts` - Stored transcripts for display
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use docent::config::Settings;
//! use docent::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     orchestrator.startup().await;
//!
//!     let bytes = std::fs::read("manual.pdf")?;
//!     let outcome = orchestrator.upload("manual.pdf", bytes).await?;
//!     println!("{}", outcome.status_message());
//!
//!     let answer = orchestrator.query("How is the pump primed?").await?;
//!     println!("{} {:?}", answer.answer, answer.citations);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcription;
pub mod transcripts;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DocentError, Result};
