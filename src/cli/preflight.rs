//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::chunking::SourceKind;
use crate::error::{DocentError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingesting a file of the given kind.
    Ingest(SourceKind),
    /// Asking questions requires the API key.
    Ask,
    /// Serving accepts every kind of upload.
    Serve,
}

/// Tools needed to turn a video into audio.
const MEDIA_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Run pre-flight checks for the given operation.
///
/// Returns warnings for optional requirements that are missing, or an error
/// describing the first hard requirement that is.
pub fn check(operation: Operation) -> Result<Vec<String>> {
    check_with(operation, check_api_key, check_tool)
}

fn check_with(
    operation: Operation,
    api_key: impl Fn() -> Result<()>,
    tool: impl Fn(&str) -> Result<()>,
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    match operation {
        Operation::Ingest(SourceKind::Pdf) | Operation::Ask => {
            api_key()?;
        }
        Operation::Ingest(SourceKind::Video) => {
            api_key()?;
            for name in MEDIA_TOOLS {
                tool(name)?;
            }
        }
        // PDF uploads still work without ffmpeg
        Operation::Serve => {
            api_key()?;
            for name in MEDIA_TOOLS {
                if let Err(e) = tool(name) {
                    warnings.push(format!("{} Video uploads will fail.", e));
                }
            }
        }
    }
    Ok(warnings)
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(DocentError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(DocentError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(DocentError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocentError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(DocentError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
