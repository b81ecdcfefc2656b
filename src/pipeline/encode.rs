//! PNG encoding and output naming.
//!
//! PNG is lossless, so "maximum quality" only means maximum zlib effort:
//! the default [`PngCompression::Best`] costs CPU, not fidelity.

use crate::config::PngCompression;
use crate::error::ConversionError;
use crate::host::{RasterHost, RasterSurface};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").expect("static regex"));

/// Output name for a document: a trailing `.pdf` (any case) becomes `.png`,
/// anything else just gains `.png`.
///
/// ```rust
/// use pdf2img::pipeline::encode::derive_image_name;
///
/// assert_eq!(derive_image_name("Resume.PDF"), "Resume.png");
/// assert_eq!(derive_image_name("notes"), "notes.png");
/// ```
pub fn derive_image_name(name: &str) -> String {
    format!("{}.png", PDF_SUFFIX.replace(name, ""))
}

/// Encode `surface` on the blocking pool.
pub async fn encode_surface(
    host: Arc<dyn RasterHost>,
    surface: RasterSurface,
    compression: PngCompression,
) -> Result<Vec<u8>, ConversionError> {
    tokio::task::spawn_blocking(move || encode_surface_blocking(host.as_ref(), &surface, compression))
        .await
        .map_err(|e| ConversionError::Internal(format!("Encode task panicked: {}", e)))?
}

/// Blocking implementation; an empty buffer counts as failure.
pub fn encode_surface_blocking(
    host: &dyn RasterHost,
    surface: &RasterSurface,
    compression: PngCompression,
) -> Result<Vec<u8>, ConversionError> {
    let png = host.encode_png(surface, compression)?;
    if png.is_empty() {
        return Err(ConversionError::Encoding("encoder produced no bytes".into()));
    }
    debug!("Encoded surface → {} bytes", png.len());
    Ok(png)
}
