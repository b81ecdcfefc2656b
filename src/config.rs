//! Configuration types for PDF-to-PNG conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Setters clamp obviously out-of-range
//! values; [`ConversionConfigBuilder::build`] rejects what cannot be clamped.

use crate::error::ConversionError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default magnification applied to the page's natural size (in points).
pub const DEFAULT_SCALE: f32 = 3.0;

/// Largest surface a host will hand out, in pixels (the common browser cap).
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 268_435_456;

/// Configuration for a PDF-to-PNG conversion.
///
/// # Example
/// ```rust
/// use pdf2img::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .page(2)
///     .scale(2.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.page, 2);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Magnification factor. Range: (0, 10]. Default: 3.0.
    ///
    /// A 612×792 pt letter page renders at 1836×2376 px at the default,
    /// which keeps résumé text crisp in a preview card.
    pub scale: f32,

    /// Page to render, 1-indexed. Default: 1.
    pub page: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// zlib effort used by the PNG encoder. Default: [`PngCompression::Best`].
    pub compression: PngCompression,

    /// Kind of displayable handle returned with a successful conversion.
    pub handle_style: HandleStyle,

    /// Upper bound on `width × height` for the raster surface.
    pub max_surface_pixels: u64,

    /// Conversions in flight for [`crate::stream::convert_stream`]. Default: 4.
    pub concurrency: usize,

    /// Optional deadline for one conversion, in milliseconds.
    ///
    /// `None` (default) waits for the engine indefinitely.
    pub timeout_ms: Option<u64>,

    /// Optional callback receiving per-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            page: 1,
            password: None,
            compression: PngCompression::default(),
            handle_style: HandleStyle::default(),
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            concurrency: 4,
            timeout_ms: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("page", &self.page)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("compression", &self.compression)
            .field("handle_style", &self.handle_style)
            .field("max_surface_pixels", &self.max_surface_pixels)
            .field("concurrency", &self.concurrency)
            .field("timeout_ms", &self.timeout_ms)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The configured deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.config.page = page;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn compression(mut self, compression: PngCompression) -> Self {
        self.config.compression = compression;
        self
    }

    pub fn handle_style(mut self, style: HandleStyle) -> Self {
        self.config.handle_style = style;
        self
    }

    pub fn max_surface_pixels(mut self, px: u64) -> Self {
        self.config.max_surface_pixels = px.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = Some(ms);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConversionError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 || c.scale > 10.0 {
            return Err(ConversionError::InvalidConfig(format!(
                "Scale must be in (0, 10], got {}",
                c.scale
            )));
        }
        if c.page == 0 {
            return Err(ConversionError::InvalidConfig(
                "Pages are 1-indexed, minimum is 1".into(),
            ));
        }
        if c.timeout_ms == Some(0) {
            return Err(ConversionError::InvalidConfig(
                "Timeout must be at least 1ms".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// zlib effort for the PNG encoder. PNG is lossless at every level; higher
/// effort only trades CPU time for a smaller file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PngCompression {
    Fast,
    Default,
    /// Smallest output (default).
    #[default]
    Best,
}

impl From<PngCompression> for image::codecs::png::CompressionType {
    fn from(c: PngCompression) -> Self {
        use image::codecs::png::CompressionType;
        match c {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// How the displayable handle for a converted image is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleStyle {
    /// `blob:pdf2img/<n>` registered with the host; must be revoked. (default)
    #[default]
    ObjectUrl,
    /// Self-contained `data:image/png;base64,…` URL; nothing to release.
    DataUrl,
}
