//! Configuration module for Docent.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, IndexSettings, PromptSettings,
    RagSettings, ServerSettings, Settings, TranscriptionSettings,
};
