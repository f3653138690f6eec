use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{CoachError, Result};

/// Sample rate of the intermediate WAV handed to the analyzers and transcriber.
pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        CoachError::AudioExtraction(format!(
            "FFmpeg not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(CoachError::AudioExtraction("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Convert any FFmpeg-readable recording to a mono 16-bit PCM WAV at 16kHz.
///
/// A non-zero FFmpeg exit means the input is missing or its container or
/// codec could not be read, and is reported as `Decode`. Callers check that
/// FFmpeg itself is installed.
pub async fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    info!("Converting {} to WAV", input.display());

    let ffmpeg = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
        .arg(TARGET_SAMPLE_RATE.to_string())
        .args(["-ac", "1"])
        .arg(output)
        .output()
        .map_err(|e| CoachError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !ffmpeg.status.success() {
        let stderr = String::from_utf8_lossy(&ffmpeg.stderr);
        return Err(CoachError::Decode(format!(
            "FFmpeg could not convert {}: {}",
            input.display(),
            stderr.trim()
        )));
    }

    if !output.exists() {
        return Err(CoachError::AudioExtraction(
            "Output file was not created".to_string(),
        ));
    }

    info!("Audio converted to {}", output.display());
    Ok(())
}
