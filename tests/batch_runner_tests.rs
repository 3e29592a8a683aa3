// Integration tests for the batch runner
//
// These tests drive a scripted fake adapter through the full
// scan-transcribe-relocate pass and verify the event sequence, the file
// movements and the failure isolation guarantees.

use anyhow::Result;
use async_trait::async_trait;
use lectern::batch::{BatchJob, BatchRunner, ProgressEvent};
use lectern::config::FoldersConfig;
use lectern::scanner::scan_stable;
use lectern::transcribe::{
    TranscribeError, TranscribeRequest, Transcription, TranscriptionAdapter,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

const SETTLE: Duration = Duration::from_millis(50);

/// Adapter with a scripted outcome per file name.
struct FakeAdapter {
    outcomes: HashMap<String, Result<String, String>>,
    delay: Duration,
}

impl FakeAdapter {
    fn new(outcomes: &[(&str, Result<&str, &str>)]) -> Arc<Self> {
        Self::delayed(outcomes, Duration::ZERO)
    }

    fn delayed(outcomes: &[(&str, Result<&str, &str>)], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcomes: outcomes
                .iter()
                .map(|(name, outcome)| {
                    (
                        name.to_string(),
                        outcome.map(str::to_string).map_err(str::to_string),
                    )
                })
                .collect(),
            delay,
        })
    }
}

#[async_trait]
impl TranscriptionAdapter for FakeAdapter {
    async fn transcribe(
        &self,
        request: &TranscribeRequest,
    ) -> Result<Transcription, TranscribeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let name = request
            .audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.outcomes.get(&name) {
            Some(Ok(text)) => Ok(Transcription {
                text: text.clone(),
                language: "es".to_string(),
                segments: 1,
            }),
            Some(Err(message)) => Err(TranscribeError::Engine(message.clone())),
            None => Err(TranscribeError::AudioMissing(name)),
        }
    }
}

struct BatchFixture {
    _root: TempDir,
    folders: FoldersConfig,
}

fn setup_folders() -> Result<BatchFixture> {
    let root = TempDir::new()?;
    let folders = FoldersConfig {
        pending: root.path().join("pending"),
        transcribed: root.path().join("transcribed"),
        archived: root.path().join("archived"),
    };
    for dir in [&folders.pending, &folders.transcribed, &folders.archived] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(BatchFixture {
        _root: root,
        folders,
    })
}

async fn run_batch(
    adapter: Arc<dyn TranscriptionAdapter>,
    folders: &FoldersConfig,
    job: BatchJob,
) -> Vec<ProgressEvent> {
    let (tx, mut rx) = mpsc::channel(16);
    let runner = BatchRunner::new(adapter, folders.clone());

    let run = tokio::spawn(async move { runner.run(job, tx).await });

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    run.await.expect("runner task");
    events
}

fn job_for(items: Vec<lectern::AudioItem>) -> BatchJob {
    BatchJob {
        items,
        language: "es-chile".to_string(),
        model: "large-v3-turbo".to_string(),
        context: String::new(),
    }
}

#[tokio::test]
async fn test_batch_success_event_sequence_and_file_movement() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"audio-1")?;
    std::fs::write(fx.folders.pending.join("lecture2.mp3"), b"audio-2")?;

    let adapter = FakeAdapter::new(&[
        ("lecture1.m4a", Ok("first transcript")),
        ("lecture2.mp3", Ok("second transcript")),
    ]);

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    assert_eq!(events.len(), 6, "start + 2x2 progress + done");
    assert!(matches!(events[0], ProgressEvent::Start { total: 2 }));
    assert!(matches!(
        &events[1],
        ProgressEvent::Progress { done: 0, total: 2, elapsed: None, .. }
    ));
    assert!(matches!(
        &events[2],
        ProgressEvent::Progress { done: 1, elapsed: Some(_), .. }
    ));
    assert!(matches!(
        &events[3],
        ProgressEvent::Progress { done: 1, elapsed: None, .. }
    ));
    assert!(matches!(
        &events[4],
        ProgressEvent::Progress { done: 2, elapsed: Some(_), .. }
    ));

    match &events[5] {
        ProgressEvent::Done {
            total,
            succeeded,
            failed,
            results,
        } => {
            assert_eq!((*total, *succeeded, *failed), (2, 2, 0));
            let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["lecture1.m4a", "lecture2.mp3"]);
        }
        other => panic!("Expected Done, got {:?}", other),
    }

    // Sources archived, transcripts written byte-for-byte
    assert!(!fx.folders.pending.join("lecture1.m4a").exists());
    assert!(fx.folders.archived.join("lecture1.m4a").exists());
    assert_eq!(
        std::fs::read_to_string(fx.folders.transcribed.join("lecture1.txt"))?,
        "first transcript"
    );
    assert_eq!(
        std::fs::read_to_string(fx.folders.transcribed.join("lecture2.txt"))?,
        "second transcript"
    );
    Ok(())
}

#[tokio::test]
async fn test_batch_failure_is_isolated_and_file_retained() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"audio-1")?;
    std::fs::write(fx.folders.pending.join("lecture2.m4a"), b"audio-2")?;

    let adapter = FakeAdapter::new(&[
        ("lecture1.m4a", Err("model not found")),
        ("lecture2.m4a", Ok("still works")),
    ]);

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Error { file, message } => Some((file.clone(), message.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "lecture1.m4a");
    assert!(errors[0].1.contains("model not found"));

    match events.last() {
        Some(ProgressEvent::Done {
            succeeded, failed, ..
        }) => assert_eq!((*succeeded, *failed), (1, 1)),
        other => panic!("Expected Done, got {:?}", other),
    }

    // Failed item stays pending for the next run; successful one is archived
    assert!(fx.folders.pending.join("lecture1.m4a").exists());
    assert!(!fx.folders.pending.join("lecture2.m4a").exists());
    assert!(fx.folders.archived.join("lecture2.m4a").exists());
    assert!(!fx.folders.transcribed.join("lecture1.txt").exists());
    Ok(())
}

#[tokio::test]
async fn test_all_failures_archive_nothing() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"audio-1")?;

    let adapter = FakeAdapter::new(&[("lecture1.m4a", Err("model not found"))]);

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    match events.last() {
        Some(ProgressEvent::Done {
            succeeded,
            failed,
            results,
            ..
        }) => {
            assert_eq!((*succeeded, *failed), (0, 1));
            assert!(results.is_empty());
        }
        other => panic!("Expected Done, got {:?}", other),
    }
    assert!(fx.folders.pending.join("lecture1.m4a").exists());
    Ok(())
}

#[tokio::test]
async fn test_empty_transcript_archives_without_writing_text() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("silence.wav"), b"audio")?;

    let adapter = FakeAdapter::new(&[("silence.wav", Ok("   \n  "))]);

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    match events.last() {
        Some(ProgressEvent::Done {
            succeeded, failed, ..
        }) => assert_eq!((*succeeded, *failed), (1, 0)),
        other => panic!("Expected Done, got {:?}", other),
    }

    assert!(!fx.folders.transcribed.join("silence.txt").exists());
    assert!(fx.folders.archived.join("silence.wav").exists());
    Ok(())
}

#[tokio::test]
async fn test_empty_batch_emits_start_only() -> Result<()> {
    let fx = setup_folders()?;
    let adapter = FakeAdapter::new(&[]);

    let events = run_batch(adapter, &fx.folders, job_for(Vec::new())).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ProgressEvent::Start { total: 0 }));
    Ok(())
}

#[tokio::test]
async fn test_rerun_after_success_finds_nothing() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"audio")?;

    let adapter = FakeAdapter::new(&[("lecture1.m4a", Ok("text"))]);

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    run_batch(adapter.clone(), &fx.folders, job_for(items)).await;

    // Second pass over the now-empty pending directory
    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ProgressEvent::Start { total: 0 }));
    Ok(())
}

#[tokio::test]
async fn test_archive_collision_keeps_both_files() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"new recording")?;
    std::fs::write(fx.folders.archived.join("lecture1.m4a"), b"old recording")?;

    let adapter = FakeAdapter::new(&[("lecture1.m4a", Ok("text"))]);

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    match events.last() {
        Some(ProgressEvent::Done { succeeded, .. }) => assert_eq!(*succeeded, 1),
        other => panic!("Expected Done, got {:?}", other),
    }

    // The earlier archive entry is untouched, the new one got a suffix
    assert_eq!(
        std::fs::read(fx.folders.archived.join("lecture1.m4a"))?,
        b"old recording"
    );
    let archived: Vec<String> = std::fs::read_dir(&fx.folders.archived)?
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(archived.len(), 2);
    assert!(archived
        .iter()
        .any(|n| n != "lecture1.m4a" && n.starts_with("lecture1-") && n.ends_with(".m4a")));
    Ok(())
}

#[tokio::test]
async fn test_consumer_disconnect_stops_batch_without_rerun() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"audio-1")?;
    std::fs::write(fx.folders.pending.join("lecture2.m4a"), b"audio-2")?;

    // Slow enough that the disconnect lands while the first item is in flight
    let adapter = FakeAdapter::delayed(
        &[
            ("lecture1.m4a", Ok("first transcript")),
            ("lecture2.m4a", Ok("second transcript")),
        ],
        Duration::from_millis(200),
    );

    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let (tx, mut rx) = mpsc::channel(16);
    let runner = BatchRunner::new(adapter, fx.folders.clone());
    let run = tokio::spawn(async move { runner.run(job_for(items), tx).await });

    // Take the start event and the announce for the first item, then hang up
    assert!(matches!(
        rx.recv().await,
        Some(ProgressEvent::Start { total: 2 })
    ));
    assert!(matches!(
        rx.recv().await,
        Some(ProgressEvent::Progress { done: 0, elapsed: None, .. })
    ));
    drop(rx);

    run.await.expect("runner task");

    // The in-flight item completed exactly once: transcript written, source
    // archived with no duplicate or suffixed copy
    assert!(!fx.folders.pending.join("lecture1.m4a").exists());
    assert_eq!(
        std::fs::read_to_string(fx.folders.transcribed.join("lecture1.txt"))?,
        "first transcript"
    );
    let archived: Vec<String> = std::fs::read_dir(&fx.folders.archived)?
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(archived, vec!["lecture1.m4a"]);

    // The rest of the batch never ran
    assert!(fx.folders.pending.join("lecture2.m4a").exists());
    assert!(!fx.folders.transcribed.join("lecture2.txt").exists());
    Ok(())
}

#[tokio::test]
async fn test_event_stream_serializes_as_ndjson_records() -> Result<()> {
    let fx = setup_folders()?;
    std::fs::write(fx.folders.pending.join("lecture1.m4a"), b"audio")?;

    let adapter = FakeAdapter::new(&[("lecture1.m4a", Ok("hello"))]);
    let items = scan_stable(&fx.folders.pending, SETTLE).await?;
    let events = run_batch(adapter, &fx.folders, job_for(items)).await;

    let lines: Vec<String> = events
        .iter()
        .map(|e| serde_json::to_string(e).expect("serialize event"))
        .collect();

    assert!(lines[0].contains(r#""type":"start"#));
    assert!(lines[0].contains(r#""total":1"#));
    assert!(lines.last().expect("done line").contains(r#""type":"done"#));
    for line in &lines {
        assert!(!line.contains('\n'), "one event per record");
    }
    Ok(())
}
