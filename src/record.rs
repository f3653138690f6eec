//! Merged analysis record and its persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::analysis::{Analysis, FillerResult, SegmentationResult, StressLevel, StressResult};
use crate::error::Result;

/// Everything produced for one recording, keyed by `file_id`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub file_id: String,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub transcription: Option<String>,
    pub pause_to_speech_analysis: Analysis<SegmentationResult>,
    pub filler_word_analysis: Analysis<FillerResult>,
    pub stress_analysis: Analysis<StressResult>,
    pub summary: SessionSummary,
}

impl AnalysisRecord {
    pub fn new(
        user_id: Option<i64>,
        transcription: Option<String>,
        pause_to_speech_analysis: Analysis<SegmentationResult>,
        filler_word_analysis: Analysis<FillerResult>,
        stress_analysis: Analysis<StressResult>,
    ) -> Self {
        let summary = SessionSummary::from_analyses(
            &pause_to_speech_analysis,
            &filler_word_analysis,
            &stress_analysis,
        );
        Self {
            file_id: Uuid::new_v4().to_string(),
            user_id,
            created_at: Utc::now(),
            transcription,
            pause_to_speech_analysis,
            filler_word_analysis,
            stress_analysis,
            summary,
        }
    }
}

/// Headline metrics; fields are `None` where the analyzer failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub pause_ratio: Option<f64>,
    pub filler_count: Option<usize>,
    /// Fillers per transcript word.
    pub filler_rate: Option<f64>,
    pub stress_score: Option<f64>,
    pub stress_level: Option<StressLevel>,
}

impl SessionSummary {
    pub fn from_analyses(
        pause: &Analysis<SegmentationResult>,
        fillers: &Analysis<FillerResult>,
        stress: &Analysis<StressResult>,
    ) -> Self {
        let fillers = fillers.success();
        let stress = stress.success();

        let filler_rate = fillers.and_then(|f| {
            let words = f.transcription.split_whitespace().count();
            (words > 0).then(|| f.total_count as f64 / words as f64)
        });

        Self {
            pause_ratio: pause.success().map(|p| p.pause_to_speech_ratio),
            filler_count: fillers.map(|f| f.total_count),
            filler_rate,
            stress_score: stress.map(|s| s.stress_score),
            stress_level: stress.map(|s| s.stress_level),
        }
    }
}

/// Destination for finished analysis records.
pub trait RecordStore {
    /// Persist a record and return where it went.
    fn save(&self, record: &AnalysisRecord) -> Result<PathBuf>;
}

/// Stores each record as `<dir>/<file_id>.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordStore for JsonFileStore {
    fn save(&self, record: &AnalysisRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", record.file_id));
        let body = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, body)?;
        info!("Saved analysis {} to {}", record.file_id, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{detect_fillers, FillerConfig};

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord::new(
            Some(7),
            Some("um I think so".to_string()),
            Analysis::Success(SegmentationResult {
                total_duration_ms: 1000.0,
                total_silence_ms: 200.0,
                total_speech_ms: 800.0,
                pause_to_speech_ratio: 0.25,
                ..SegmentationResult::default()
            }),
            Analysis::Success(detect_fillers("um I think so", &FillerConfig::default())),
            Analysis::failure("signal is empty"),
        )
    }

    #[test]
    fn test_record_json_shape() {
        let value = serde_json::to_value(sample_record()).unwrap();

        assert_eq!(value["user_id"], 7);
        assert_eq!(value["transcription"], "um I think so");
        assert_eq!(value["pause_to_speech_analysis"]["pause_to_speech_ratio"], 0.25);
        assert_eq!(value["filler_word_analysis"]["um"], 2);
        assert_eq!(value["filler_word_analysis"]["so"], 2);
        assert_eq!(value["filler_word_analysis"]["total_count"], 4);
        assert_eq!(value["stress_analysis"]["error"], "signal is empty");
        assert!(Uuid::parse_str(value["file_id"].as_str().unwrap()).is_ok());
        assert_eq!(value["summary"]["pause_ratio"], 0.25);
        assert_eq!(value["summary"]["filler_rate"], 1.0);
        assert!(value["summary"]["stress_level"].is_null());
    }

    #[test]
    fn test_summary_skips_failed_analyzers() {
        let summary = sample_record().summary;
        assert_eq!(summary.pause_ratio, Some(0.25));
        assert_eq!(summary.filler_count, Some(4));
        assert_eq!(summary.filler_rate, Some(1.0));
        assert!(summary.stress_score.is_none());
        assert!(summary.stress_level.is_none());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let record = sample_record();

        let path = store.save(&record).unwrap();
        assert_eq!(path, store.dir().join(format!("{}.json", record.file_id)));

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved["file_id"], record.file_id);
    }
}
