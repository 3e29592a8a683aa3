//! Document and archive export.
//!
//! Rendering fidelity is not this crate's business: PDF and DOCX are
//! delegated to an installed `pandoc` binary, and the archive download is
//! a flat zip of `.txt` entries. The interface validates input up front
//! and distinguishes "bad request" from "renderer not installed".

use std::io::{Cursor, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, Copy)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No text to export")]
    EmptyText,

    #[error("No items to export")]
    EmptyItems,

    #[error("pandoc is not installed")]
    RendererMissing,

    #[error("Renderer failed: {0}")]
    Renderer(String),
}

impl ExportError {
    /// Whether the failure is the caller's fault (maps to a 4xx status).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExportError::EmptyText | ExportError::EmptyItems)
    }
}

/// One transcript going into an archive download.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ArchiveItem {
    pub filename: String,
    pub text: String,
}

/// Render `text` as a PDF or DOCX document via pandoc.
pub async fn render_document(
    kind: DocumentKind,
    text: &str,
    title: &str,
) -> Result<Vec<u8>, ExportError> {
    if text.trim().is_empty() {
        return Err(ExportError::EmptyText);
    }

    let id = uuid::Uuid::new_v4();
    let input = std::env::temp_dir().join(format!("lectern-export-{id}.md"));
    let output = std::env::temp_dir().join(format!("lectern-export-{id}.{}", kind.extension()));

    let markdown = format!("# {}\n\n{}\n", title.trim(), text.trim());
    tokio::fs::write(&input, markdown)
        .await
        .map_err(|e| ExportError::Renderer(e.to_string()))?;

    debug!("Rendering {} via pandoc", output.display());
    let run = tokio::process::Command::new("pandoc")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .output()
        .await;

    let result = match run {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExportError::RendererMissing),
        Err(e) => Err(ExportError::Renderer(e.to_string())),
        Ok(out) if !out.status.success() => Err(ExportError::Renderer(
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        )),
        Ok(_) => tokio::fs::read(&output)
            .await
            .map_err(|e| ExportError::Renderer(e.to_string())),
    };

    let _ = tokio::fs::remove_file(&input).await;
    let _ = tokio::fs::remove_file(&output).await;

    result
}

/// Build a zip of `<stem>.txt` entries, skipping empty texts.
pub fn render_archive(items: &[ArchiveItem]) -> Result<Vec<u8>, ExportError> {
    if items.is_empty() {
        return Err(ExportError::EmptyItems);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for item in items {
        let text = item.text.trim();
        if text.is_empty() {
            continue;
        }

        let stem = Path::new(&item.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("transcript");

        writer
            .start_file(format!("{stem}.txt"), options)
            .map_err(|e| ExportError::Renderer(e.to_string()))?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| ExportError::Renderer(e.to_string()))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| ExportError::Renderer(e.to_string()))?;
    Ok(cursor.into_inner())
}
