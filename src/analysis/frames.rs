use crate::audio::AudioSignal;

/// Analysis window length in seconds.
pub const FRAME_SECONDS: f64 = 0.02;

/// Stride between window starts in seconds.
pub const HOP_SECONDS: f64 = 0.01;

/// Window geometry in samples for a given sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub frame_length: usize,
    pub hop_length: usize,
}

impl Framing {
    pub fn for_rate(sample_rate: u32) -> Self {
        Self {
            frame_length: ((FRAME_SECONDS * sample_rate as f64) as usize).max(1),
            hop_length: ((HOP_SECONDS * sample_rate as f64) as usize).max(1),
        }
    }

    /// Number of whole frames that fit in `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        if len < self.frame_length {
            0
        } else {
            (len - self.frame_length) / self.hop_length + 1
        }
    }

    /// Iterate over every whole frame; the trailing partial frame is dropped.
    pub fn frames<'a>(&self, samples: &'a [f32]) -> impl Iterator<Item = &'a [f32]> + 'a {
        let Framing {
            frame_length,
            hop_length,
        } = *self;
        (0..self.frame_count(samples.len()))
            .map(move |i| &samples[i * hop_length..i * hop_length + frame_length])
    }

    /// Milliseconds represented by one hop.
    pub fn ms_per_hop(&self, sample_rate: u32) -> f64 {
        self.hop_length as f64 * 1000.0 / sample_rate as f64
    }
}

/// Per-frame RMS energies of a signal.
#[derive(Debug, Clone)]
pub struct FrameSeries {
    pub framing: Framing,
    pub energies: Vec<f64>,
}

impl FrameSeries {
    pub fn rms(signal: &AudioSignal) -> Self {
        let framing = Framing::for_rate(signal.sample_rate());
        let energies = framing.frames(signal.samples()).map(calculate_rms).collect();
        Self { framing, energies }
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }
}

/// Root-mean-square amplitude of a window.
pub fn calculate_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let s = s as f64;
            s * s
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt()
}
