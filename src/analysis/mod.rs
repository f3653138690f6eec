//! Acoustic and transcript heuristics.
//!
//! Each analyzer is a pure function over an in-memory buffer. Callers wrap
//! the outcome in [`Analysis`] so a failed analyzer is visibly distinct from a
//! valid all-zero result.

pub mod filler;
pub mod frames;
pub mod pause;
pub mod pitch;
pub mod spectral;
pub mod stress;

pub use filler::{detect_fillers, FillerConfig, FillerOccurrence, FillerResult, MatchKind};
pub use frames::FrameSeries;
pub use pause::{segment, SegmentationResult, SegmenterConfig};
pub use pitch::PitchMethod;
pub use stress::{analyze_stress, StressConfig, StressFeatures, StressLevel, StressResult};

use serde::Serialize;

use crate::error::Result;

/// Outcome of one analyzer.
///
/// Serializes as the bare result on success and as `{"error": "..."}` on
/// failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Analysis<T> {
    Success(T),
    Failure { error: String },
}

impl<T> Analysis<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        Analysis::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Analysis::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Analysis::Success(value) => Some(value),
            Analysis::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Analysis::Success(_) => None,
            Analysis::Failure { error } => Some(error),
        }
    }
}

impl<T> From<Result<T>> for Analysis<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Analysis::Success(value),
            Err(e) => Analysis::failure(e.to_string()),
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Population variance.
pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;

    #[test]
    fn test_stats() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(variance(&values), 4.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_analysis_from_result() {
        let ok = Analysis::from(Ok::<u32, CoachError>(3));
        assert_eq!(ok.success(), Some(&3));
        assert!(ok.error().is_none());

        let failed = Analysis::from(Err::<u32, _>(CoachError::Compute(
            "empty signal".to_string(),
        )));
        assert!(!failed.is_success());
        assert_eq!(failed.error(), Some("Analysis failed: empty signal"));
    }

    #[test]
    fn test_analysis_json_shape() {
        let failed: Analysis<u32> = Analysis::failure("boom");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"error": "boom"})
        );

        let ok: Analysis<u32> = Analysis::Success(7);
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!(7));
    }
}
