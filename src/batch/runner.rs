use super::events::{format_elapsed, ItemResult, ProgressEvent};
use crate::config::FoldersConfig;
use crate::scanner::AudioItem;
use crate::transcribe::{TranscribeRequest, TranscriptionAdapter};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// One scan-transcribe-relocate pass. Immutable after creation.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Items in scan order
    pub items: Vec<AudioItem>,
    /// Language profile name
    pub language: String,
    /// Model name
    pub model: String,
    /// Free-text priming context
    pub context: String,
}

/// Processes a batch strictly sequentially, isolating per-item failures.
///
/// A failed item stays in the pending directory and is retried naturally
/// on the next run; nothing aborts the batch.
pub struct BatchRunner {
    adapter: Arc<dyn TranscriptionAdapter>,
    folders: FoldersConfig,
}

impl BatchRunner {
    pub fn new(adapter: Arc<dyn TranscriptionAdapter>, folders: FoldersConfig) -> Self {
        Self { adapter, folders }
    }

    /// Run the batch, emitting every event on `tx` in production order.
    ///
    /// If the receiver goes away the current item still completes (its
    /// outcome is never recomputed), then the batch stops; unprocessed
    /// items remain pending for the next run.
    pub async fn run(&self, job: BatchJob, tx: mpsc::Sender<ProgressEvent>) {
        let total = job.items.len();
        info!("Starting batch of {} file(s)", total);

        if !emit(&tx, ProgressEvent::Start { total }).await {
            return;
        }
        if total == 0 {
            return;
        }

        let mut succeeded = 0;
        let mut failed = 0;
        let mut results = Vec::new();

        for (i, item) in job.items.iter().enumerate() {
            if !emit(
                &tx,
                ProgressEvent::Progress {
                    done: i,
                    total,
                    file: item.name.clone(),
                    elapsed: None,
                },
            )
            .await
            {
                return;
            }

            let started = Instant::now();
            match self.process_item(&job, item).await {
                Ok(text) => {
                    let secs = started.elapsed().as_secs_f64().round() as u64;
                    let elapsed = format_elapsed(secs);
                    info!("Transcribed {} in {}", item.name, elapsed);

                    succeeded += 1;
                    results.push(ItemResult {
                        name: item.name.clone(),
                        text,
                        elapsed: elapsed.clone(),
                    });

                    if !emit(
                        &tx,
                        ProgressEvent::Progress {
                            done: i + 1,
                            total,
                            file: item.name.clone(),
                            elapsed: Some(elapsed),
                        },
                    )
                    .await
                    {
                        return;
                    }
                }
                Err(e) => {
                    // Full diagnostics stay server-side; the stream only
                    // carries the item name and a short message.
                    error!("Batch item {} failed: {:#}", item.name, e);
                    failed += 1;

                    if !emit(
                        &tx,
                        ProgressEvent::Error {
                            file: item.name.clone(),
                            message: e.to_string(),
                        },
                    )
                    .await
                    {
                        return;
                    }
                }
            }
        }

        info!(
            "Batch finished: {} succeeded, {} failed of {}",
            succeeded, failed, total
        );
        emit(
            &tx,
            ProgressEvent::Done {
                total,
                succeeded,
                failed,
                results,
            },
        )
        .await;
    }

    /// Transcribe one item, write its text and archive the source.
    /// The source file is only moved once everything else succeeded.
    async fn process_item(&self, job: &BatchJob, item: &AudioItem) -> Result<String> {
        let request = TranscribeRequest {
            audio_path: item.path.clone(),
            language: job.language.clone(),
            model: job.model.clone(),
            context: job.context.clone(),
        };

        let transcription = self.adapter.transcribe(&request).await?;

        if !transcription.text.trim().is_empty() {
            let stem = Path::new(&item.name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&item.name);
            let out_path = self.folders.transcribed.join(format!("{stem}.txt"));
            tokio::fs::write(&out_path, &transcription.text)
                .await
                .with_context(|| format!("Failed to write transcript {}", out_path.display()))?;
        }

        let dest = archive_destination(&self.folders.archived, &item.name).await;
        tokio::fs::rename(&item.path, &dest)
            .await
            .with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    item.path.display(),
                    dest.display()
                )
            })?;

        Ok(transcription.text)
    }
}

async fn emit(tx: &mpsc::Sender<ProgressEvent>, event: ProgressEvent) -> bool {
    if tx.send(event).await.is_err() {
        warn!("Progress consumer disconnected, stopping batch after current item");
        return false;
    }
    true
}

/// Destination for an archived source file. On a name collision the stem
/// gets a UTC timestamp suffix instead of overwriting the existing file.
async fn archive_destination(archived: &Path, name: &str) -> PathBuf {
    let dest = archived.join(name);
    if !tokio::fs::try_exists(&dest).await.unwrap_or(false) {
        return dest;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording");
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");

    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => archived.join(format!("{stem}-{stamp}.{ext}")),
        None => archived.join(format!("{stem}-{stamp}")),
    }
}
