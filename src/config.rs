use crate::analysis::filler::FillerConfig;
use crate::analysis::pause::SegmenterConfig;
use crate::analysis::stress::StressConfig;
use crate::audio::PreprocessConfig;
use crate::error::{CoachError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default transcription endpoint host.
pub const DEFAULT_WHISPER_URL: &str = "https://api.openai.com";

/// Lowest accepted pitch floor; the YIN window grows as `1 / fmin`.
pub const MIN_PITCH_HZ: f64 = 1.0;

/// Tunables for the three analyzers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub segmenter: SegmenterConfig,
    pub filler: FillerConfig,
    pub stress: StressConfig,
    pub preprocess: PreprocessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub whisper_url: String,
    pub language: Option<String>,
    /// Per-analyzer time budget in seconds.
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            whisper_url: DEFAULT_WHISPER_URL.to_string(),
            language: Some("en".to_string()),
            timeout_secs: 120,
            output_dir: PathBuf::from("analyses"),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = Self::from_toml(&contents)?;
            }
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("COACH_WHISPER_URL") {
            config.whisper_url = url;
        }
        if let Ok(threshold) = std::env::var("COACH_FUZZY_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                config.analysis.filler.fuzzy_threshold = t;
            }
        }
        if let Ok(timeout) = std::env::var("COACH_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                config.timeout_secs = t;
            }
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str::<Config>(contents)
            .map_err(|e| CoachError::Config(format!("Invalid config file: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(CoachError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        let filler = &self.analysis.filler;
        if !(0.0..=100.0).contains(&filler.fuzzy_threshold) {
            return Err(CoachError::Config(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                filler.fuzzy_threshold
            )));
        }

        let segmenter = &self.analysis.segmenter;
        if !(segmenter.silence_fraction > 0.0 && segmenter.silence_fraction < 1.0) {
            return Err(CoachError::Config(format!(
                "silence_fraction must be within (0, 1), got {}",
                segmenter.silence_fraction
            )));
        }
        if !(segmenter.min_pause_ms >= 0.0 && segmenter.min_pause_ms.is_finite()) {
            return Err(CoachError::Config(format!(
                "min_pause_ms must be a non-negative number, got {}",
                segmenter.min_pause_ms
            )));
        }

        let stress = &self.analysis.stress;
        if stress.low_threshold >= stress.high_threshold {
            return Err(CoachError::Config(format!(
                "stress low_threshold ({}) must be below high_threshold ({})",
                stress.low_threshold, stress.high_threshold
            )));
        }
        if !(stress.fmin >= MIN_PITCH_HZ && stress.fmin < stress.fmax) {
            return Err(CoachError::Config(format!(
                "pitch range {}..{} Hz is invalid",
                stress.fmin, stress.fmax
            )));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("interview-coach").join("config.toml"))
    }
}
