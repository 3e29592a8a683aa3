use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub folders: FoldersConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Directory served as the static frontend
    pub static_dir: String,
}

/// The three well-known directories of the ingestion pipeline.
/// Recordings land in `pending`, text output goes to `transcribed`,
/// processed sources move to `archived`.
#[derive(Debug, Clone, Deserialize)]
pub struct FoldersConfig {
    pub pending: PathBuf,
    pub transcribed: PathBuf,
    pub archived: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub default_language: String,
    pub default_model: String,
    /// Directory holding ggml model files (`ggml-<name>.bin`)
    pub models_dir: PathBuf,
    /// Seconds between the two size samples of the stability scan
    pub settle_secs: u64,
}

impl FoldersConfig {
    /// Create all three directories if they don't exist yet.
    pub async fn ensure(&self) -> Result<()> {
        for dir in [&self.pending, &self.transcribed, &self.archived] {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from an optional TOML file, falling back to
    /// built-in defaults for anything the file doesn't set.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "lectern")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 8000)?
            .set_default("service.http.static_dir", "static")?
            .set_default("folders.pending", "data/pending")?
            .set_default("folders.transcribed", "data/transcribed")?
            .set_default("folders.archived", "data/archived")?
            .set_default("transcription.default_language", "es-chile")?
            .set_default("transcription.default_model", "large-v3-turbo")?
            .set_default("transcription.models_dir", "models")?
            .set_default("transcription.settle_secs", 1)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Audio extensions the pipeline accepts, matched case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["m4a", "mp3", "wav"];

/// Whether a path carries one of the allowed audio extensions.
pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
