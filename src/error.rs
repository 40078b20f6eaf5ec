//! Error types for Docent.

use thiserror::Error;

/// Library-level error type for Docent operations.
#[derive(Error, Debug)]
pub enum DocentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("PDF parsing failed: {0}")]
    PdfParse(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Queried before anything was indexed.
    #[error("Vectorstore not initialized.")]
    NotReady,

    /// Retrieval produced only blank context.
    #[error("No content found to answer the question.")]
    NoContent,

    /// The language model failed or returned an answer that did not validate.
    #[error("Failed to parse LLM response: {details}")]
    Synthesis { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DocentError {
    /// Build a synthesis error from any displayable cause.
    pub fn synthesis(details: impl std::fmt::Display) -> Self {
        DocentError::Synthesis {
            details: details.to_string(),
        }
    }

    /// Whether the caller can fix this by changing the request (as opposed to a broken collaborator).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocentError::NotReady
                | DocentError::NoContent
                | DocentError::UnsupportedFile(_)
                | DocentError::InvalidInput(_)
        )
    }
}

/// Result type alias for Docent operations.
pub type Result<T> = std::result::Result<T, DocentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(DocentError::NotReady.to_string(), "Vectorstore not initialized.");
        assert_eq!(
            DocentError::NoContent.to_string(),
            "No content found to answer the question."
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(DocentError::NotReady.is_client_error());
        assert!(DocentError::UnsupportedFile("a.txt".into()).is_client_error());
        assert!(!DocentError::synthesis("bad json").is_client_error());
        assert!(!DocentError::Embedding("down".into()).is_client_error());
    }
}
