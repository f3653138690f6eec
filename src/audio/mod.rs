pub mod decode;
pub mod extract;
pub mod preprocess;

pub use decode::decode_wav;
pub use extract::{check_ffmpeg, extract_audio, TARGET_SAMPLE_RATE};
pub use preprocess::{preprocess, PreprocessConfig};

use std::time::Duration;

use crate::error::{CoachError, Result};

/// Decoded mono audio, samples nominally in `-1.0..=1.0`.
#[derive(Debug, Clone)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(CoachError::Decode("sample rate must be non-zero".to_string()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Exact length of the signal.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}
