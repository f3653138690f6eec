//! Fundamental frequency tracking.
//!
//! YIN is tried first; when it cannot run or finds no voiced frame, a
//! spectral peak picker takes over.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::AudioSignal;
use crate::error::{CoachError, Result};

use super::frames::Framing;
use super::spectral::Spectrogram;

/// Cumulative mean normalized difference below which a lag is voiced.
const YIN_THRESHOLD: f64 = 0.1;

/// Relative magnitude a spectral peak needs to count as voiced.
const PEAK_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchMethod {
    Yin,
    Peak,
    /// Neither estimator found a voiced frame.
    None,
}

/// Voiced f0 estimates in Hz, in frame order.
#[derive(Debug, Clone)]
pub struct PitchTrack {
    pub method: PitchMethod,
    pub f0: Vec<f64>,
}

/// Track pitch within `fmin..=fmax`, falling back from YIN to peak picking.
pub fn track_pitch(
    signal: &AudioSignal,
    spectrogram: &Spectrogram,
    fmin: f64,
    fmax: f64,
) -> PitchTrack {
    match yin(signal, fmin, fmax) {
        Ok(f0) if !f0.is_empty() => {
            return PitchTrack {
                method: PitchMethod::Yin,
                f0,
            }
        }
        Ok(_) => debug!("YIN found no voiced frames, falling back to peak picking"),
        Err(e) => debug!("YIN failed ({}), falling back to peak picking", e),
    }

    let f0 = peak_pick(spectrogram, fmin, fmax);
    let method = if f0.is_empty() {
        PitchMethod::None
    } else {
        PitchMethod::Peak
    };
    PitchTrack { method, f0 }
}

/// YIN estimator, one estimate per hop over a window of two maximum periods.
pub fn yin(signal: &AudioSignal, fmin: f64, fmax: f64) -> Result<Vec<f64>> {
    let sr = signal.sample_rate() as f64;
    let tau_max = (sr / fmin).ceil() as usize;
    let tau_min = ((sr / fmax).floor() as usize).max(2);
    if tau_min >= tau_max {
        return Err(CoachError::Compute(format!(
            "pitch range {fmin}..{fmax} Hz is unusable at {sr} Hz"
        )));
    }

    let framing = Framing {
        frame_length: 2 * tau_max,
        hop_length: Framing::for_rate(signal.sample_rate()).hop_length,
    };
    if framing.frame_count(signal.len()) == 0 {
        return Err(CoachError::Compute(format!(
            "signal of {} samples is shorter than one pitch window ({})",
            signal.len(),
            framing.frame_length
        )));
    }

    let mut diff = vec![0.0f64; tau_max + 1];
    let mut f0 = Vec::new();

    for frame in framing.frames(signal.samples()) {
        difference_function(frame, tau_max, &mut diff);
        cumulative_mean_normalize(&mut diff);

        if let Some(tau) = absolute_threshold(&diff, tau_min, tau_max) {
            let refined = parabolic_interpolation(&diff, tau);
            let freq = sr / refined;
            if freq.is_finite() && freq >= fmin && freq <= fmax {
                f0.push(freq);
            }
        }
    }

    Ok(f0)
}

/// `d(tau) = sum_j (x[j] - x[j + tau])^2` over the first half of the frame.
fn difference_function(frame: &[f32], tau_max: usize, diff: &mut [f64]) {
    let window = frame.len() - tau_max;
    diff[0] = 0.0;
    for tau in 1..=tau_max {
        diff[tau] = (0..window)
            .map(|j| {
                let d = frame[j] as f64 - frame[j + tau] as f64;
                d * d
            })
            .sum();
    }
}

/// Replace `d(tau)` with `d(tau) * tau / sum_{1..=tau} d`. Silence maps to 1.
fn cumulative_mean_normalize(diff: &mut [f64]) {
    diff[0] = 1.0;
    let mut running = 0.0;
    for tau in 1..diff.len() {
        running += diff[tau];
        diff[tau] = if running > 0.0 {
            diff[tau] * tau as f64 / running
        } else {
            1.0
        };
    }
}

/// First lag under the threshold, walked down to its local minimum.
fn absolute_threshold(cmnd: &[f64], tau_min: usize, tau_max: usize) -> Option<usize> {
    let mut tau = tau_min;
    while tau <= tau_max {
        if cmnd[tau] < YIN_THRESHOLD {
            while tau < tau_max && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }
    None
}

fn parabolic_interpolation(values: &[f64], idx: usize) -> f64 {
    if idx == 0 || idx + 1 >= values.len() {
        return idx as f64;
    }
    let (a, b, c) = (values[idx - 1], values[idx], values[idx + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f64::EPSILON {
        return idx as f64;
    }
    idx as f64 + 0.5 * (a - c) / denom
}

/// Strongest in-range spectral peak per frame, refined by parabolic fit.
pub fn peak_pick(spectrogram: &Spectrogram, fmin: f64, fmax: f64) -> Vec<f64> {
    let bin_hz = spectrogram.bin_frequency(1);
    if bin_hz <= 0.0 {
        return Vec::new();
    }
    let lo = (fmin / bin_hz).ceil() as usize;
    let hi = (fmax / bin_hz).floor() as usize;

    spectrogram
        .frames
        .iter()
        .filter_map(|mags| {
            let hi = hi.min(mags.len().saturating_sub(1));
            if lo > hi {
                return None;
            }
            let frame_peak = mags.iter().cloned().fold(0.0f64, f64::max);
            let (k, &mag) = mags[lo..=hi]
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))?;
            if frame_peak <= 0.0 || mag < PEAK_THRESHOLD * frame_peak {
                return None;
            }
            let freq = parabolic_interpolation(mags, lo + k) * bin_hz;
            (freq.is_finite() && freq > 0.0).then_some(freq)
        })
        .collect()
}
