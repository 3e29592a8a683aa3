use super::state::AppState;
use crate::batch::{BatchJob, BatchRunner, ProgressEvent};
use crate::config::has_allowed_extension;
use crate::export::{self, ArchiveItem, DocumentKind, ExportError};
use crate::scanner;
use crate::transcribe::TranscribeRequest;
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    /// Language profile name (default: configured default_language)
    pub language: Option<String>,

    /// Model name (default: configured default_model)
    pub model: Option<String>,

    /// Free-text priming context (default: empty)
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub language: String,
    pub model: String,
    pub segments_count: usize,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportDocumentRequest {
    #[serde(default)]
    pub text: String,

    #[serde(default = "default_export_name")]
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportArchiveRequest {
    #[serde(default)]
    pub items: Vec<ArchiveItem>,
}

fn default_export_name() -> String {
    "transcript".to_string()
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/transcribe
/// Transcribe a single uploaded audio file
pub async fn transcribe_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let defaults = &state.config.transcription;
    let mut language = defaults.default_language.clone();
    let mut model = defaults.default_model.clone();
    let mut context = String::new();
    let mut upload: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid multipart request: {e}"),
                );
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes)),
                    Err(e) => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read upload: {e}"),
                        );
                    }
                }
            }
            "language" => language = field.text().await.unwrap_or(language),
            "model" => model = field.text().await.unwrap_or(model),
            "context" => context = field.text().await.unwrap_or(context),
            _ => {}
        }
    }

    let Some((filename, bytes)) = upload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing file field");
    };

    if !has_allowed_extension(Path::new(&filename)) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Unsupported format. Use .m4a, .mp3 or .wav",
        );
    }

    // Validated above, extension is present
    let ext = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin")
        .to_ascii_lowercase();
    let tmp = std::env::temp_dir().join(format!("lectern-upload-{}.{ext}", uuid::Uuid::new_v4()));

    if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
        error!("Failed to stage upload {}: {}", tmp.display(), e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to stage upload");
    }

    info!("Transcribing upload {} ({} bytes)", filename, bytes.len());
    let request = TranscribeRequest {
        audio_path: tmp.clone(),
        language,
        model: model.clone(),
        context,
    };
    let result = state.adapter.transcribe(&request).await;
    let _ = tokio::fs::remove_file(&tmp).await;

    match result {
        Ok(transcription) => Json(TranscribeResponse {
            text: transcription.text,
            language: transcription.language,
            model,
            segments_count: transcription.segments,
            filename,
        })
        .into_response(),
        Err(e) => {
            error!("Transcription of {} failed: {}", filename, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /api/transcribe-folder
/// Scan the pending directory, transcribe every stable file and stream
/// progress as newline-delimited JSON
pub async fn transcribe_folder(
    State(state): State<AppState>,
    Json(req): Json<FolderRequest>,
) -> Response {
    if let Err(e) = state.config.folders.ensure().await {
        error!("Failed to prepare folders: {:#}", e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to prepare folders",
        );
    }

    // Only one batch may run at a time; concurrent callers get a conflict
    // instead of racing on the same pending files
    let guard = match state.batch_guard.clone().try_lock_owned() {
        Ok(guard) => guard,
        Err(_) => {
            return error_response(
                StatusCode::CONFLICT,
                "A folder batch is already running",
            );
        }
    };

    let config = state.config.clone();
    let adapter = state.adapter.clone();
    let language = req
        .language
        .unwrap_or_else(|| config.transcription.default_language.clone());
    let model = req
        .model
        .unwrap_or_else(|| config.transcription.default_model.clone());
    let context = req.context.unwrap_or_default();

    let (tx, rx) = mpsc::channel::<ProgressEvent>(16);

    tokio::spawn(async move {
        // Held until the batch ends, including early exits
        let _guard = guard;

        let settle = Duration::from_secs(config.transcription.settle_secs);
        let items = match scanner::scan_stable(&config.folders.pending, settle).await {
            Ok(items) => items,
            Err(e) => {
                error!("Stability scan failed: {:#}", e);
                return;
            }
        };

        let job = BatchJob {
            items,
            language,
            model,
            context,
        };
        BatchRunner::new(adapter, config.folders.clone())
            .run(job, tx)
            .await;
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let mut line =
            serde_json::to_string(&event).unwrap_or_else(|_| String::from("{}"));
        line.push('\n');
        Ok::<_, Infallible>(Bytes::from(line))
    });

    (
        [
            (header::CONTENT_TYPE, "application/x-ndjson"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// POST /api/export/pdf
pub async fn export_pdf(Json(req): Json<ExportDocumentRequest>) -> Response {
    export_document(DocumentKind::Pdf, req).await
}

/// POST /api/export/docx
pub async fn export_docx(Json(req): Json<ExportDocumentRequest>) -> Response {
    export_document(DocumentKind::Docx, req).await
}

async fn export_document(kind: DocumentKind, req: ExportDocumentRequest) -> Response {
    match export::render_document(kind, &req.text, &req.filename).await {
        Ok(bytes) => attachment(
            kind.content_type(),
            &format!("{}.{}", req.filename, kind.extension()),
            bytes,
        ),
        Err(e) => export_error(e),
    }
}

/// POST /api/export/zip
pub async fn export_zip(Json(req): Json<ExportArchiveRequest>) -> Response {
    match export::render_archive(&req.items) {
        Ok(bytes) => attachment("application/zip", "transcripts.zip", bytes),
        Err(e) => export_error(e),
    }
}

fn export_error(e: ExportError) -> Response {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        error!("Export failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, e.to_string())
}

fn attachment(content_type: &str, filename: &str, bytes: Vec<u8>) -> Response {
    let safe_name = filename.replace(['"', '\r', '\n'], "");
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
