pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod transcribe;

pub use config::Config;
pub use error::{CoachError, Result};
pub use pipeline::{analyze_file, analyze_signal, print_summary, PipelineConfig, PipelineResult};
pub use record::{AnalysisRecord, JsonFileStore, RecordStore, SessionSummary};
