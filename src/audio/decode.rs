use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::{debug, info};

use crate::error::{CoachError, Result};

use super::AudioSignal;

/// Read a WAV file into a mono signal.
///
/// Integer samples are scaled to `-1.0..1.0` by their bit depth; multichannel
/// audio is averaged down to one channel. Any unreadable header or sample is a
/// `Decode` error, never a silent zero.
pub fn decode_wav(path: &Path) -> Result<AudioSignal> {
    let reader = WavReader::open(path)
        .map_err(|e| CoachError::Decode(format!("Failed to open WAV file: {e}")))?;

    let spec = reader.spec();
    info!(
        "Decoding audio: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1) as u32)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
        }
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>(),
    }
    .map_err(|e| CoachError::Decode(format!("Corrupt sample data: {e}")))?;

    let samples = downmix(&interleaved, spec.channels);
    debug!("Decoded {} mono samples", samples.len());

    AudioSignal::new(samples, spec.sample_rate)
}

fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    let channels = channels as usize;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
