use crate::config::Config;
use crate::transcribe::TranscriptionAdapter;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// The transcription engine behind its adapter seam
    pub adapter: Arc<dyn TranscriptionAdapter>,

    /// Single-flight guard: one folder batch at a time, so two runs never
    /// race on the same pending files
    pub batch_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: Config, adapter: Arc<dyn TranscriptionAdapter>) -> Self {
        Self {
            config: Arc::new(config),
            adapter,
            batch_guard: Arc::new(Mutex::new(())),
        }
    }
}
