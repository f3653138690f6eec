use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use crate::audio::AudioSignal;

use super::frames::Framing;
use super::{mean, variance};

pub const N_MELS: usize = 40;
pub const N_MFCC: usize = 13;

/// Dynamic range kept when converting power to decibels.
const TOP_DB: f64 = 80.0;
const AMIN: f64 = 1e-10;

/// Short-time magnitude spectrum over the standard 20 ms / 10 ms framing.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub sample_rate: u32,
    pub n_fft: usize,
    /// One row per frame, `n_fft / 2 + 1` magnitude bins each.
    pub frames: Vec<Vec<f64>>,
}

impl Spectrogram {
    pub fn compute(signal: &AudioSignal) -> Self {
        let framing = Framing::for_rate(signal.sample_rate());
        let n_fft = framing.frame_length.next_power_of_two();
        let window = hann_window(framing.frame_length);

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut buffer = vec![Complex { re: 0.0, im: 0.0 }; n_fft];

        let frames = framing
            .frames(signal.samples())
            .map(|frame| {
                for (slot, (&s, &w)) in buffer.iter_mut().zip(frame.iter().zip(window.iter())) {
                    *slot = Complex {
                        re: s as f64 * w,
                        im: 0.0,
                    };
                }
                for slot in buffer.iter_mut().skip(frame.len()) {
                    *slot = Complex { re: 0.0, im: 0.0 };
                }
                fft.process(&mut buffer);
                buffer[..n_fft / 2 + 1]
                    .iter()
                    .map(|c| c.norm())
                    .collect::<Vec<f64>>()
            })
            .collect();

        Self {
            sample_rate: signal.sample_rate(),
            n_fft,
            frames,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Centre frequency of FFT bin `k` in Hz.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / self.n_fft as f64
    }

    /// Magnitude-weighted mean frequency of each frame; silent frames give 0.
    pub fn centroids(&self) -> Vec<f64> {
        self.frames
            .iter()
            .map(|mags| {
                let total: f64 = mags.iter().sum();
                if total <= 0.0 {
                    return 0.0;
                }
                mags.iter()
                    .enumerate()
                    .map(|(k, m)| self.bin_frequency(k) * m)
                    .sum::<f64>()
                    / total
            })
            .collect()
    }

    /// MFCCs per frame (`N_MFCC` each) from a log-power mel spectrogram.
    pub fn mfcc(&self) -> Vec<Vec<f64>> {
        if self.frames.is_empty() {
            return Vec::new();
        }

        let filters = mel_filterbank(self.sample_rate, self.n_fft, N_MELS);
        let mel_power: Vec<Vec<f64>> = self
            .frames
            .iter()
            .map(|mags| {
                filters
                    .iter()
                    .map(|filter| {
                        filter
                            .iter()
                            .zip(mags.iter())
                            .map(|(w, m)| w * m * m)
                            .sum::<f64>()
                    })
                    .collect()
            })
            .collect();

        let mel_db = power_to_db(&mel_power);
        mel_db.iter().map(|row| dct_ortho(row, N_MFCC)).collect()
    }
}

/// Mean over coefficients of the per-coefficient variance across frames.
pub fn mfcc_variance(mfcc: &[Vec<f64>]) -> f64 {
    let Some(first) = mfcc.first() else {
        return 0.0;
    };

    let per_coefficient: Vec<f64> = (0..first.len())
        .map(|c| {
            let column: Vec<f64> = mfcc.iter().map(|row| row[c]).collect();
            variance(&column)
        })
        .collect();

    mean(&per_coefficient)
}

/// Periodic Hann window.
fn hann_window(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / len as f64).cos())
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters evenly spaced on the mel scale from 0 Hz to Nyquist.
fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f64>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;
    let max_mel = hz_to_mel(nyquist);

    let edges: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lower, centre, upper) = (edges[m], edges[m + 1], edges[m + 2]);
            (0..n_bins)
                .map(|k| {
                    let f = k as f64 * sample_rate as f64 / n_fft as f64;
                    if f <= lower || f >= upper {
                        0.0
                    } else if f <= centre {
                        (f - lower) / (centre - lower)
                    } else {
                        (upper - f) / (upper - centre)
                    }
                })
                .collect()
        })
        .collect()
}

/// `10 * log10(power)`, floored `TOP_DB` below the loudest value overall.
fn power_to_db(power: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let db: Vec<Vec<f64>> = power
        .iter()
        .map(|row| row.iter().map(|&p| 10.0 * p.max(AMIN).log10()).collect())
        .collect();

    let peak = db
        .iter()
        .flatten()
        .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let floor = peak - TOP_DB;

    db.into_iter()
        .map(|row| row.into_iter().map(|v| v.max(floor)).collect())
        .collect()
}

/// Orthonormal DCT-II, first `n_out` coefficients.
fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..n_out)
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}
