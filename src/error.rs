use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Analysis failed: {0}")]
    Compute(String),

    #[error("{0} exceeded its time budget of {1:?}")]
    Timeout(String, std::time::Duration),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoachError>;
