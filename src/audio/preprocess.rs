use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AudioSignal;

/// Conditioning applied to a decoded signal before analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Scale so the loudest sample sits at +/-1.0.
    pub normalize: bool,
    /// Pre-emphasis coefficient; `None` disables the filter.
    pub preemphasis: Option<f32>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            normalize: true,
            preemphasis: None,
        }
    }
}

/// Apply the configured conditioning in place.
pub fn preprocess(signal: &mut AudioSignal, config: &PreprocessConfig) {
    if let Some(coef) = config.preemphasis {
        apply_preemphasis(signal.samples_mut(), coef);
    }
    if config.normalize {
        normalize_peak(signal.samples_mut());
    }
}

/// `y[n] = x[n] - coef * x[n-1]`, first sample unchanged.
fn apply_preemphasis(samples: &mut [f32], coef: f32) {
    let mut prev = match samples.first() {
        Some(&s) => s,
        None => return,
    };
    for sample in samples.iter_mut().skip(1) {
        let current = *sample;
        *sample = current - coef * prev;
        prev = current;
    }
}

fn normalize_peak(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |acc, &s| acc.max(s.abs()));

    if peak > 0.0 {
        debug!("Normalizing peak {:.4} to 1.0", peak);
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
    }
}
