use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::AudioSignal;
use crate::error::{CoachError, Result};

use super::frames::{FrameSeries, Framing};
use super::mean;

/// Configuration for pause/speech segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Silence threshold as a fraction of the mean frame energy.
    pub silence_fraction: f64,

    /// Minimum run of silence counted as a pause.
    pub min_pause_ms: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_fraction: 0.1,
            min_pause_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub total_duration_ms: f64,
    pub total_silence_ms: f64,
    pub total_speech_ms: f64,
    pub pause_to_speech_ratio: f64,
    pub pause_count: usize,
    pub longest_pause_ms: f64,
}

/// Split a signal into speech and silence frames.
///
/// The threshold adapts to the recording: frames at or below
/// `silence_fraction` of the mean RMS energy are silence. Durations count
/// whole hops only, so `total_duration_ms` slightly under-reports the clip
/// length (the trailing partial frame is never analysed).
pub fn segment(signal: &AudioSignal, config: &SegmenterConfig) -> Result<SegmentationResult> {
    let series = FrameSeries::rms(signal);
    if series.is_empty() {
        debug!(
            "Signal shorter than one frame ({} samples), nothing to segment",
            signal.len()
        );
        return Ok(SegmentationResult::default());
    }

    let threshold = config.silence_fraction * mean(&series.energies);
    if !threshold.is_finite() {
        return Err(CoachError::Compute(
            "frame energies are not finite".to_string(),
        ));
    }

    let speech_frames = detect_speech_frames(&series.energies, threshold);
    let ms_per_frame = series.framing.ms_per_hop(signal.sample_rate());

    let speech = speech_frames.iter().filter(|&&s| s).count();
    let silence = speech_frames.len() - speech;

    let total_speech_ms = speech as f64 * ms_per_frame;
    let total_silence_ms = silence as f64 * ms_per_frame;
    let pause_to_speech_ratio = if speech == 0 {
        0.0
    } else {
        total_silence_ms / total_speech_ms
    };

    let pauses = silent_runs(&speech_frames, min_pause_frames(&series.framing, signal, config));
    let longest_pause_ms = pauses.iter().max().copied().unwrap_or(0) as f64 * ms_per_frame;

    debug!(
        "Segmented {} frames: {} speech, {} silence, {} pauses (threshold {:.5})",
        speech_frames.len(),
        speech,
        silence,
        pauses.len(),
        threshold
    );

    Ok(SegmentationResult {
        total_duration_ms: speech_frames.len() as f64 * ms_per_frame,
        total_silence_ms,
        total_speech_ms,
        pause_to_speech_ratio,
        pause_count: pauses.len(),
        longest_pause_ms,
    })
}

/// Classify frames as speech (true) or silence (false).
fn detect_speech_frames(energy_values: &[f64], threshold: f64) -> Vec<bool> {
    energy_values.iter().map(|&e| e > threshold).collect()
}

fn min_pause_frames(framing: &Framing, signal: &AudioSignal, config: &SegmenterConfig) -> usize {
    let ms_per_frame = framing.ms_per_hop(signal.sample_rate());
    ((config.min_pause_ms / ms_per_frame).ceil() as usize).max(1)
}

/// Lengths (in frames) of silent runs at least `min_frames` long.
fn silent_runs(speech_frames: &[bool], min_frames: usize) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0;

    for &is_speech in speech_frames {
        if is_speech {
            if current >= min_frames {
                runs.push(current);
            }
            current = 0;
        } else {
            current += 1;
        }
    }

    if current >= min_frames {
        runs.push(current);
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(samples: Vec<f32>) -> AudioSignal {
        AudioSignal::new(samples, 16000).unwrap()
    }

    #[test]
    fn test_detect_speech_frames() {
        let energy = vec![0.001, 0.02, 0.03, 0.005, 0.001];
        let frames = detect_speech_frames(&energy, 0.01);
        assert_eq!(frames, vec![false, true, true, false, false]);
    }

    #[test]
    fn test_silent_runs() {
        let frames = vec![false, false, true, false, true, false, false, false];
        assert_eq!(silent_runs(&frames, 2), vec![2, 3]);
        assert_eq!(silent_runs(&frames, 1), vec![2, 1, 3]);
        assert!(silent_runs(&[true, true], 1).is_empty());
    }

    #[test]
    fn test_sub_frame_signal_is_all_zero() {
        let result = segment(&signal(vec![0.3; 100]), &SegmenterConfig::default()).unwrap();
        assert_eq!(result, SegmentationResult::default());

        let result = segment(&signal(vec![]), &SegmenterConfig::default()).unwrap();
        assert_eq!(result.total_duration_ms, 0.0);
    }

    #[test]
    fn test_silence_then_speech() {
        // 1s of silence followed by 1s of a loud square-ish signal.
        let mut samples = vec![0.0f32; 16000];
        samples.extend((0..16000).map(|i| if (i / 40) % 2 == 0 { 0.5 } else { -0.5 }));

        let result = segment(&signal(samples), &SegmenterConfig::default()).unwrap();

        // 199 whole frames at 10ms per hop.
        assert!((result.total_duration_ms - 1990.0).abs() < 1e-6);
        assert!(
            (result.total_silence_ms + result.total_speech_ms - result.total_duration_ms).abs()
                < 1e-6
        );
        // Frames straddling the boundary carry energy and count as speech.
        assert!((result.total_silence_ms - 990.0).abs() < 1e-6);
        assert!((result.total_speech_ms - 1000.0).abs() < 1e-6);
        assert!((result.pause_to_speech_ratio - 0.99).abs() < 1e-9);
        assert_eq!(result.pause_count, 1);
        assert!((result.longest_pause_ms - 990.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_gap_is_not_a_pause() {
        let loud = |n: usize| (0..n).map(|i| if i % 2 == 0 { 0.5f32 } else { -0.5 });
        let mut samples: Vec<f32> = loud(8000).collect();
        samples.extend(vec![0.0f32; 3200]);
        samples.extend(loud(8000));

        let result = segment(&signal(samples), &SegmenterConfig::default()).unwrap();
        assert!(result.total_silence_ms > 0.0);
        assert_eq!(result.pause_count, 0);
    }
}
