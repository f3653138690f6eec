pub mod whisper;

pub use whisper::{WhisperClient, WhisperModel};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
}

/// Speech-to-text collaborator feeding the filler detector.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
}

/// Transcript supplied by the caller instead of a speech-to-text service.
pub struct StaticTranscriber {
    text: String,
}

impl StaticTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<Transcript> {
        Ok(Transcript {
            text: self.text.clone(),
            language: None,
        })
    }

    fn name(&self) -> &'static str {
        "Provided transcript"
    }
}
