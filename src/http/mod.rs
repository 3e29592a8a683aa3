//! HTTP API for the transcription service
//!
//! - POST /api/transcribe - Transcribe one uploaded audio file
//! - POST /api/transcribe-folder - Run a folder batch, streaming NDJSON progress
//! - POST /api/export/pdf | /api/export/docx - Render a transcript as a document
//! - POST /api/export/zip - Download transcripts as a zip archive
//! - GET /health - Health check
//!
//! Anything else falls through to the static frontend directory.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
