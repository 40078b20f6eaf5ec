//! Audio extraction and splitting with ffmpeg.
//!
//! Video uploads are reduced to an MP3 audio track before transcription, and long
//! tracks are cut into pieces small enough for the transcription API.

use crate::error::{DocentError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Produces an audio track from a video file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Write the audio of `video_path` into `output_dir` and return the new file.
    async fn extract(&self, video_path: &Path, name: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// Extraction through the `ffmpeg` binary.
pub struct FfmpegExtractor;

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, video_path: &Path, name: &str, output_dir: &Path) -> Result<PathBuf> {
        extract_audio(video_path, name, output_dir).await
    }
}

/// An ffmpeg invocation that overwrites its output and only reports errors.
fn ffmpeg() -> Command {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-loglevel")
        .arg("error")
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

/// Run a media tool, mapping a missing binary and a failed exit to typed errors.
async fn run(tool: &str, cmd: &mut Command, what: &str) -> Result<Output> {
    let output = match cmd.output().await {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DocentError::ToolNotFound(tool.to_string()));
        }
        Err(e) => {
            return Err(DocentError::AudioExtraction(format!("{tool} error: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DocentError::AudioExtraction(format!(
            "{what} failed: {}",
            stderr.trim()
        )));
    }

    Ok(output)
}

/// Extracts the audio track of a video into `<output_dir>/<name>.mp3`.
#[instrument(skip(output_dir), fields(video = %video_path.display()))]
async fn extract_audio(video_path: &Path, name: &str, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let target_path = output_dir.join(format!("{}.mp3", name));
    info!("Extracting audio to {:?}", target_path);

    let mut cmd = ffmpeg();
    cmd.arg("-i")
        .arg(video_path)
        .arg("-vn")
        .args(["-codec:a", "libmp3lame", "-qscale:a", "2"])
        .arg(&target_path);
    run("ffmpeg", &mut cmd, "Audio extraction").await?;

    Ok(target_path)
}

/// Cut a long audio file into pieces of about `piece_seconds` each.
///
/// Returns `(piece_path, offset_seconds)` in order. Audio no longer than one piece is
/// returned as-is.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    piece_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    let total_duration = probe_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let piece_len = f64::from(piece_seconds.max(1));
    if total_duration <= piece_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    tokio::fs::create_dir_all(output_dir).await?;
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut pieces = Vec::new();
    for (idx, offset) in piece_offsets(total_duration, piece_len).into_iter().enumerate() {
        let piece_path = output_dir.join(format!("{}_{:04}.mp3", stem, idx));
        let length = piece_len.min(total_duration - offset);

        extract_piece(source, &piece_path, offset, length).await?;
        debug!("Created piece {} at offset {:.1}s", idx, offset);
        pieces.push((piece_path, offset));
    }

    info!("Created {} audio pieces", pieces.len());
    Ok(pieces)
}

/// Start offsets of consecutive pieces covering `total` seconds.
fn piece_offsets(total: f64, piece_len: f64) -> Vec<f64> {
    let count = (total / piece_len).ceil() as usize;
    (0..count).map(|i| i as f64 * piece_len).collect()
}

/// Extracts a time range from an audio file.
async fn extract_piece(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let range = |cmd: &mut Command| {
        cmd.arg("-ss")
            .arg(format!("{:.3}", start))
            .arg("-i")
            .arg(source)
            .arg("-t")
            .arg(format!("{:.3}", length));
    };

    // Stream copy is lossless; fall back to re-encoding when the container refuses it
    let mut copy = ffmpeg();
    range(&mut copy);
    copy.args(["-c", "copy"]).arg(dest);
    if run("ffmpeg", &mut copy, "Piece copy").await.is_ok() && dest.exists() {
        return Ok(());
    }

    warn!("Stream copy failed, re-encoding piece");

    let mut encode = ffmpeg();
    range(&mut encode);
    encode
        .args(["-codec:a", "libmp3lame", "-qscale:a", "2"])
        .arg(dest);
    run("ffmpeg", &mut encode, "Piece extraction").await?;
    Ok(())
}

/// Queries the duration of an audio file using ffprobe with JSON output.
async fn probe_duration(path: &Path) -> Result<f64> {
    let mut cmd = Command::new("ffprobe");
    cmd.args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path);
    let output = run("ffprobe", &mut cmd, "ffprobe").await?;

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_duration(json_str: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|_| DocentError::AudioExtraction("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| DocentError::AudioExtraction("Could not determine audio duration".into()))
}
