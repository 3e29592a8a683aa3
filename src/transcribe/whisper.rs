//! whisper.cpp-backed implementation of [`TranscriptionAdapter`].

use super::{profiles, TranscribeError, TranscribeRequest, Transcription, TranscriptionAdapter};
use crate::audio::decode_to_mono_16k;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Process-wide model cache. Holds at most one loaded whisper context,
/// swapped out when a different model name is requested. Loading happens
/// under the lock so two callers never race on the same model file.
pub struct ModelCache {
    models_dir: PathBuf,
    loaded: Mutex<Option<(String, Arc<WhisperContext>)>>,
}

impl ModelCache {
    pub fn new(models_dir: PathBuf) -> Self {
        Self {
            models_dir,
            loaded: Mutex::new(None),
        }
    }

    /// Return the context for `model`, loading (and evicting the previous
    /// model) if it isn't the one currently resident.
    pub fn get_or_load(&self, model: &str) -> Result<Arc<WhisperContext>, TranscribeError> {
        let mut guard = self.loaded.lock().unwrap_or_else(|e| e.into_inner());

        if let Some((name, ctx)) = guard.as_ref() {
            if name == model {
                return Ok(Arc::clone(ctx));
            }
            info!("Swapping model {} for {}", name, model);
        }

        let path = self.models_dir.join(format!("ggml-{model}.bin"));
        if !path.is_file() {
            return Err(TranscribeError::ModelUnavailable {
                model: model.to_string(),
                reason: format!("model file {} not found", path.display()),
            });
        }

        info!("Loading whisper model {} from {}", model, path.display());
        let ctx = WhisperContext::new_with_params(
            &path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| TranscribeError::ModelUnavailable {
            model: model.to_string(),
            reason: e.to_string(),
        })?;

        let ctx = Arc::new(ctx);
        *guard = Some((model.to_string(), Arc::clone(&ctx)));
        Ok(ctx)
    }
}

/// Adapter running whisper.cpp in-process. The engine call is blocking and
/// not reentrant for a given model, so it runs on the blocking pool and
/// callers are expected to serialize batches.
pub struct WhisperAdapter {
    cache: Arc<ModelCache>,
}

impl WhisperAdapter {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TranscriptionAdapter for WhisperAdapter {
    async fn transcribe(
        &self,
        request: &TranscribeRequest,
    ) -> Result<Transcription, TranscribeError> {
        if !request.audio_path.is_file() {
            return Err(TranscribeError::AudioMissing(
                request.audio_path.display().to_string(),
            ));
        }

        let cache = Arc::clone(&self.cache);
        let req = request.clone();

        tokio::task::spawn_blocking(move || run_engine(&cache, &req))
            .await
            .map_err(|e| TranscribeError::Engine(format!("engine task failed: {e}")))?
    }
}

fn run_engine(
    cache: &ModelCache,
    req: &TranscribeRequest,
) -> Result<Transcription, TranscribeError> {
    let file = req
        .audio_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| req.audio_path.display().to_string());

    let samples = decode_to_mono_16k(&req.audio_path).map_err(|e| TranscribeError::Decode {
        file: file.clone(),
        reason: format!("{e:#}"),
    })?;

    let lang = profiles::language_code(&req.language);
    let prompt = profiles::build_initial_prompt(&req.language, &req.context);
    let temperature = profiles::sampling_temperature(&req.language);

    let ctx = cache.get_or_load(&req.model)?;

    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_language(Some(lang));
    params.set_initial_prompt(&prompt);
    params.set_translate(false);
    params.set_temperature(temperature);
    params.set_no_speech_thold(0.6);
    params.set_entropy_thold(2.4);
    params.set_suppress_blank(true);
    params.set_print_special(false);
    params.set_print_progress(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    let mut state = ctx
        .create_state()
        .map_err(|e| TranscribeError::Engine(e.to_string()))?;
    state
        .full(params, &samples)
        .map_err(|e| TranscribeError::Engine(e.to_string()))?;

    let segments = state
        .full_n_segments()
        .map_err(|e| TranscribeError::Engine(e.to_string()))?;

    let mut text = String::new();
    for i in 0..segments {
        if let Ok(segment) = state.full_get_segment_text_lossy(i) {
            let segment = segment.trim();
            if !segment.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(segment);
            }
        }
    }

    Ok(Transcription {
        text: super::clean_transcript(&text),
        language: lang.to_string(),
        segments: segments.max(0) as usize,
    })
}
