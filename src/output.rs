//! Result types returned by a conversion.

use crate::error::{ConversionError, ErrorKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Media type of every produced image.
pub const PNG_MIME: &str = "image/png";

/// An encoded image held in memory, named after its source document.
#[derive(Debug, Clone, Serialize)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: &'static str,
    /// Encoded size in bytes.
    pub size: usize,
    #[serde(skip)]
    bytes: Arc<[u8]>,
}

impl ImageFile {
    /// Wrap PNG bytes under `name`.
    pub fn png(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: PNG_MIME,
            size: bytes.len(),
            bytes,
        }
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// `data:image/png;base64,…`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Write to `path` atomically: temp file next to it, then rename.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ConversionError> {
        let path = path.as_ref();
        let write_failed = |e: std::io::Error| ConversionError::OutputWriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }

        let tmp_path = path.with_extension("png.tmp");
        tokio::fs::write(&tmp_path, &self.bytes)
            .await
            .map_err(write_failed)?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(write_failed)?;

        debug!("Wrote {} bytes to {}", self.size, path.display());
        Ok(())
    }
}

/// Outcome of one conversion: a displayable image or the reason there is none.
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    Converted { image_url: String, file: ImageFile },
    Failed(ConversionError),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }

    pub fn file(&self) -> Option<&ImageFile> {
        match self {
            ConversionOutcome::Converted { file, .. } => Some(file),
            ConversionOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match self {
            ConversionOutcome::Converted { .. } => None,
            ConversionOutcome::Failed(e) => Some(e),
        }
    }

    /// Flatten into the `{ image_url, file, error }` record.
    pub fn into_result(self) -> PdfConversionResult {
        self.into()
    }

    /// Convert into a plain `Result` for `?`-style callers.
    pub fn into_std_result(self) -> Result<(String, ImageFile), ConversionError> {
        match self {
            ConversionOutcome::Converted { image_url, file } => Ok((image_url, file)),
            ConversionOutcome::Failed(e) => Err(e),
        }
    }
}

/// Flat conversion record.
///
/// `error` is set exactly when `file` is `None`; on failure `image_url` is
/// the empty string.
#[derive(Debug, Clone, Serialize)]
pub struct PdfConversionResult {
    pub image_url: String,
    pub file: Option<ImageFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl From<ConversionOutcome> for PdfConversionResult {
    fn from(outcome: ConversionOutcome) -> Self {
        match outcome {
            ConversionOutcome::Converted { image_url, file } => Self {
                image_url,
                file: Some(file),
                error: None,
                error_kind: None,
            },
            ConversionOutcome::Failed(e) => Self {
                image_url: String::new(),
                file: None,
                error: Some(e.to_string()),
                error_kind: Some(e.kind()),
            },
        }
    }
}
