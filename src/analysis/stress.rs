use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::AudioSignal;
use crate::error::{CoachError, Result};

use super::frames::FrameSeries;
use super::pitch::{track_pitch, PitchMethod};
use super::spectral::{mfcc_variance, Spectrogram};
use super::{mean, std_dev};

/// Guards ratios against a zero denominator.
const EPS: f64 = 1e-9;

/// Weights of the composite stress score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressWeights {
    pub pitch_std: f64,
    pub jitter: f64,
    pub shimmer: f64,
    pub mfcc_var: f64,
}

impl Default for StressWeights {
    fn default() -> Self {
        Self {
            pitch_std: 1.0 / 50.0,
            jitter: 5.0,
            shimmer: 5.0,
            mfcc_var: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub weights: StressWeights,
    /// Scores below this are `low`.
    pub low_threshold: f64,
    /// Scores below this (and at or above `low_threshold`) are `medium`.
    pub high_threshold: f64,
    /// Pitch search range in Hz.
    pub fmin: f64,
    pub fmax: f64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            weights: StressWeights::default(),
            low_threshold: 0.5,
            high_threshold: 1.2,
            fmin: 50.0,
            fmax: 400.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StressLevel::Low => write!(f, "low"),
            StressLevel::Medium => write!(f, "medium"),
            StressLevel::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StressFeatures {
    pub pitch_mean: f64,
    pub pitch_std: f64,
    pub jitter: f64,
    pub shimmer: f64,
    pub avg_rms: f64,
    pub rms_std: f64,
    pub spectral_centroid_std: f64,
    pub mfcc_var: f64,
    pub voiced_frames: usize,
    pub pitch_method: Option<PitchMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub stress_level: StressLevel,
    pub stress_score: f64,
    pub features: StressFeatures,
}

impl StressConfig {
    /// Weighted sum of the variability features, rounded to 3 decimals.
    pub fn score(&self, features: &StressFeatures) -> f64 {
        let w = &self.weights;
        let raw = features.pitch_std * w.pitch_std
            + features.jitter * w.jitter
            + features.shimmer * w.shimmer
            + features.mfcc_var * w.mfcc_var;
        (raw * 1000.0).round() / 1000.0
    }

    pub fn level(&self, score: f64) -> StressLevel {
        if score < self.low_threshold {
            StressLevel::Low
        } else if score < self.high_threshold {
            StressLevel::Medium
        } else {
            StressLevel::High
        }
    }
}

/// Estimate vocal stress from pitch, energy and spectral variability.
pub fn analyze_stress(signal: &AudioSignal, config: &StressConfig) -> Result<StressResult> {
    if signal.is_empty() {
        return Err(CoachError::Compute("signal is empty".to_string()));
    }

    let rms = FrameSeries::rms(signal);
    if rms.is_empty() {
        return Err(CoachError::Compute(format!(
            "signal of {} samples is shorter than one analysis frame",
            signal.len()
        )));
    }

    let avg_rms = mean(&rms.energies);
    let rms_std = std_dev(&rms.energies);

    let spectrogram = Spectrogram::compute(signal);
    let pitch = track_pitch(signal, &spectrogram, config.fmin, config.fmax);

    let pitch_mean = mean(&pitch.f0);
    let pitch_std = std_dev(&pitch.f0);
    let jitter = if pitch.f0.len() > 1 {
        let diffs: Vec<f64> = pitch.f0.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        mean(&diffs) / (pitch_mean + EPS)
    } else {
        0.0
    };

    let features = StressFeatures {
        pitch_mean,
        pitch_std,
        jitter,
        shimmer: rms_std / (avg_rms + EPS),
        avg_rms,
        rms_std,
        spectral_centroid_std: std_dev(&spectrogram.centroids()),
        mfcc_var: mfcc_variance(&spectrogram.mfcc()),
        voiced_frames: pitch.f0.len(),
        pitch_method: Some(pitch.method),
    };

    let stress_score = config.score(&features);
    if !stress_score.is_finite() {
        return Err(CoachError::Compute(format!(
            "stress score is not finite: {features:?}"
        )));
    }

    let stress_level = config.level(stress_score);
    debug!(
        "Stress score {:.3} ({}) from {} voiced frames via {:?}",
        stress_score, stress_level, features.voiced_frames, pitch.method
    );

    Ok(StressResult {
        stress_level,
        stress_score,
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        let config = StressConfig::default();
        assert_eq!(config.level(0.0), StressLevel::Low);
        assert_eq!(config.level(0.499), StressLevel::Low);
        assert_eq!(config.level(0.5), StressLevel::Medium);
        assert_eq!(config.level(1.199), StressLevel::Medium);
        assert_eq!(config.level(1.2), StressLevel::High);
    }

    #[test]
    fn test_alternate_threshold_policy() {
        let config = StressConfig {
            low_threshold: 0.3,
            high_threshold: 0.6,
            ..StressConfig::default()
        };
        assert_eq!(config.level(0.4), StressLevel::Medium);
        assert_eq!(config.level(0.7), StressLevel::High);
    }

    #[test]
    fn test_score_weights() {
        let config = StressConfig::default();
        let features = StressFeatures {
            pitch_std: 25.0,
            jitter: 0.02,
            shimmer: 0.1,
            mfcc_var: 3.0,
            ..StressFeatures::default()
        };
        // 0.5 + 0.1 + 0.5 + 0.3
        assert!((config.score(&features) - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_empty_signal_is_failure() {
        let signal = AudioSignal::new(vec![], 16000).unwrap();
        assert!(matches!(
            analyze_stress(&signal, &StressConfig::default()),
            Err(CoachError::Compute(_))
        ));
    }

    #[test]
    fn test_sub_frame_signal_is_failure() {
        let signal = AudioSignal::new(vec![0.2; 100], 16000).unwrap();
        assert!(analyze_stress(&signal, &StressConfig::default()).is_err());
    }

    #[test]
    fn test_silence_is_low_with_no_pitch() {
        let signal = AudioSignal::new(vec![0.0; 16000], 16000).unwrap();
        let result = analyze_stress(&signal, &StressConfig::default()).unwrap();
        assert_eq!(result.stress_level, StressLevel::Low);
        assert_eq!(result.features.voiced_frames, 0);
        assert_eq!(result.features.pitch_std, 0.0);
        assert_eq!(result.features.pitch_method, Some(PitchMethod::None));
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(StressLevel::Medium).unwrap(),
            serde_json::json!("medium")
        );
    }
}
