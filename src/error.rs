//! Error types for the pdf2img library.
//!
//! A conversion never raises: every failure is caught at
//! [`crate::convert::Converter::convert`] and reported as
//! [`crate::output::ConversionOutcome::Failed`]. The variants below carry
//! enough detail for a log line, while [`ErrorKind`] gives callers a small,
//! stable taxonomy to branch on.
//!
//! `ConversionError` is `Clone` because a failed engine initialization is
//! handed to every caller that was waiting on the same attempt.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse category of a failed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The rendering engine or its library could not be loaded.
    EngineUnavailable,
    /// The bytes are not a readable document, or the page does not exist.
    DocumentOpenFailure,
    /// The host could not provide a drawing surface.
    SurfaceUnavailable,
    /// The surface could not be serialised to PNG.
    EncodingFailure,
    /// The caller aborted the conversion.
    Cancelled,
    /// The conversion exceeded its configured deadline.
    TimedOut,
    /// Anything else.
    Unknown,
}

/// All errors produced while converting a document.
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    // ── Engine ────────────────────────────────────────────────────────────
    /// pdfium (or another engine) could not be located, downloaded or bound.
    #[error(
        "Rendering engine unavailable: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy."
    )]
    EngineUnavailable(String),

    // ── Document ──────────────────────────────────────────────────────────
    /// The input bytes could not be parsed as a document.
    #[error("Failed to open document '{name}': {detail}")]
    DocumentOpen { name: String, detail: String },

    /// The document is encrypted and no (or a wrong) password was supplied.
    #[error("Document '{name}' is encrypted; a valid password is required")]
    PasswordRequired { name: String },

    /// The requested page does not exist.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Host ──────────────────────────────────────────────────────────────
    /// No drawing context could be acquired for a surface of this size.
    #[error("Could not get a drawing context for a {width}x{height} surface")]
    SurfaceUnavailable { width: u32, height: u32 },

    /// PNG encoding failed or produced no bytes.
    #[error("Failed to encode surface as PNG: {0}")]
    Encoding(String),

    /// The engine reported an error while drawing the page.
    #[error("Rendering page {page} failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    // ── Input ─────────────────────────────────────────────────────────────
    #[error("Input file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    #[error("Failed to write output file '{path}': {reason}")]
    OutputWriteFailed { path: PathBuf, reason: String },

    // ── Control ───────────────────────────────────────────────────────────
    #[error("Conversion timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    #[error("Conversion was cancelled")]
    Cancelled,

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Failed to convert PDF: {0}")]
    Internal(String),
}

impl ConversionError {
    /// Map this error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            ConversionError::DocumentOpen { .. }
            | ConversionError::PasswordRequired { .. }
            | ConversionError::PageOutOfRange { .. } => ErrorKind::DocumentOpenFailure,
            ConversionError::SurfaceUnavailable { .. } => ErrorKind::SurfaceUnavailable,
            ConversionError::Encoding(_) => ErrorKind::EncodingFailure,
            ConversionError::Cancelled => ErrorKind::Cancelled,
            ConversionError::TimedOut { .. } => ErrorKind::TimedOut,
            ConversionError::RenderFailed { .. }
            | ConversionError::FileNotFound { .. }
            | ConversionError::PermissionDenied { .. }
            | ConversionError::InvalidInput { .. }
            | ConversionError::DownloadFailed { .. }
            | ConversionError::DownloadTimeout { .. }
            | ConversionError::OutputWriteFailed { .. }
            | ConversionError::InvalidConfig(_)
            | ConversionError::Internal(_) => ErrorKind::Unknown,
        }
    }
}
