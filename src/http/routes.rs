use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.service.http.static_dir.clone();

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Transcription
        .route("/api/transcribe", post(handlers::transcribe_file))
        .route("/api/transcribe-folder", post(handlers::transcribe_folder))
        // Export
        .route("/api/export/pdf", post(handlers::export_pdf))
        .route("/api/export/docx", post(handlers::export_docx))
        .route("/api/export/zip", post(handlers::export_zip))
        // Lecture recordings run long; the default 2 MB body cap is far too small
        .layer(DefaultBodyLimit::max(512 * 1024 * 1024))
        // Static frontend
        .fallback_service(ServeDir::new(static_dir))
        // Request logging and browser access
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
