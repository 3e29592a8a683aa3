//! Transcription seam between the batch pipeline and the speech engine.
//!
//! The pipeline only ever talks to the [`TranscriptionAdapter`] trait, so
//! tests can script outcomes with a fake adapter while production uses the
//! whisper.cpp-backed [`WhisperAdapter`].

mod clean;
mod profiles;
mod whisper;

pub use clean::clean_transcript;
pub use profiles::{build_initial_prompt, language_code, sampling_temperature, LanguageProfile};
pub use whisper::{ModelCache, WhisperAdapter};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// One transcription request: an audio file plus the knobs that bias the
/// engine (language profile, model name, free-text context).
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    pub audio_path: PathBuf,
    /// Language profile name (e.g. "es-chile")
    pub language: String,
    /// Model name, resolved to `ggml-<name>.bin` in the models directory
    pub model: String,
    /// Free-text priming context supplied by the caller
    pub context: String,
}

/// Successful engine output after post-processing.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// Cleaned transcript text
    pub text: String,
    /// Language code actually used (e.g. "es")
    pub language: String,
    /// Number of segments the engine produced
    pub segments: usize,
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Audio file not found: {0}")]
    AudioMissing(String),

    #[error("Model {model} not available: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("Failed to decode {file}: {reason}")]
    Decode { file: String, reason: String },

    #[error("Transcription engine failed: {0}")]
    Engine(String),
}

/// The speech engine as the pipeline sees it.
#[async_trait]
pub trait TranscriptionAdapter: Send + Sync {
    async fn transcribe(&self, request: &TranscribeRequest)
        -> Result<Transcription, TranscribeError>;
}
