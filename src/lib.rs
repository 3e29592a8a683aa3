pub mod audio;
pub mod batch;
pub mod config;
pub mod export;
pub mod http;
pub mod scanner;
pub mod transcribe;

pub use batch::{format_elapsed, BatchJob, BatchRunner, ItemResult, ProgressEvent};
pub use config::{Config, FoldersConfig, ALLOWED_EXTENSIONS};
pub use http::{create_router, AppState};
pub use scanner::{scan_stable, AudioItem};
pub use transcribe::{
    ModelCache, TranscribeError, TranscribeRequest, Transcription, TranscriptionAdapter,
    WhisperAdapter,
};
