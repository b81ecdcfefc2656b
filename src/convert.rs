//! Conversion entry points.
//!
//! [`Converter::convert`] is a linear pipeline with one exit per failure:
//!
//! ```text
//! engine ─▶ read ─▶ open ─▶ page ─▶ viewport ─▶ surface ─▶ draw ─▶ encode ─▶ name ─▶ handle
//! ```
//!
//! Nothing is retried and nothing is raised: every error, including a panic
//! on the blocking pool, ends up in [`ConversionOutcome::Failed`].

use crate::config::{ConversionConfig, HandleStyle};
use crate::engine::{pdfium::shared_pdfium, EngineCell};
use crate::error::ConversionError;
use crate::host::{MemoryHost, RasterHost};
use crate::output::{ConversionOutcome, ImageFile, PdfConversionResult};
use crate::pipeline::encode::{derive_image_name, encode_surface};
use crate::pipeline::input::InputFile;
use crate::pipeline::render::{render_page, RenderRequest};
use futures::future::{AbortRegistration, Abortable};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts documents with a shared engine and host.
///
/// Cloning is cheap; clones share the engine cell and host.
#[derive(Clone)]
pub struct Converter {
    engine: Arc<EngineCell>,
    host: Arc<dyn RasterHost>,
    config: ConversionConfig,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionConfig::default())
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// A converter using the process-wide pdfium engine and an in-memory host.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            engine: shared_pdfium(),
            host: Arc::new(MemoryHost::new(config.max_surface_pixels)),
            config,
        }
    }

    /// Use a different engine cell (another library, or a test double).
    pub fn with_engine(mut self, engine: Arc<EngineCell>) -> Self {
        self.engine = engine;
        self
    }

    /// Use a different host runtime.
    pub fn with_host(mut self, host: Arc<dyn RasterHost>) -> Self {
        self.host = host;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<EngineCell> {
        &self.engine
    }

    /// Convert the configured page of `file` to PNG.
    ///
    /// On success the returned handle stays registered with the host until
    /// the caller releases it.
    pub async fn convert(&self, file: &InputFile) -> ConversionOutcome {
        let start = Instant::now();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_start(file.name());
        }

        let result = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, self.try_convert(file))
                .await
                .unwrap_or_else(|_| {
                    Err(ConversionError::TimedOut {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    })
                }),
            None => self.try_convert(file).await,
        };

        self.finish(file, result, start)
    }

    /// Like [`Self::convert`], but stops when the paired
    /// [`futures::future::AbortHandle`] fires.
    ///
    /// Engine work already running on the blocking pool finishes in the
    /// background; its result is discarded.
    pub async fn convert_abortable(
        &self,
        file: &InputFile,
        registration: AbortRegistration,
    ) -> ConversionOutcome {
        let start = Instant::now();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_start(file.name());
        }

        let result = Abortable::new(self.try_convert(file), registration)
            .await
            .unwrap_or(Err(ConversionError::Cancelled));

        self.finish(file, result, start)
    }

    fn finish(
        &self,
        file: &InputFile,
        result: Result<(String, ImageFile), ConversionError>,
        start: Instant,
    ) -> ConversionOutcome {
        let outcome = match result {
            Ok((image_url, image)) => {
                info!(
                    "Converted '{}' → '{}' ({} bytes) in {}ms",
                    file.name(),
                    image.name,
                    image.size,
                    start.elapsed().as_millis()
                );
                ConversionOutcome::Converted {
                    image_url,
                    file: image,
                }
            }
            Err(e) => {
                warn!("Conversion of '{}' failed: {}", file.name(), e);
                ConversionOutcome::Failed(e)
            }
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_conversion_complete(file.name(), outcome.is_success());
        }
        outcome
    }

    async fn try_convert(&self, file: &InputFile) -> Result<(String, ImageFile), ConversionError> {
        let config = &self.config;
        let name = file.name();

        // ── Step 1: Engine ───────────────────────────────────────────────
        let engine = self.engine.get().await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_engine_ready(engine.name());
        }

        // ── Step 2: Bytes ────────────────────────────────────────────────
        let bytes = file.read_bytes().await?;
        debug!("'{}': {} bytes", name, bytes.len());

        // ── Steps 3–7: Open, select page, viewport, surface, draw ────────
        let request = RenderRequest {
            name: name.to_string(),
            page: config.page,
            scale: config.scale,
            password: config.password.clone(),
        };
        let rendered = render_page(engine, Arc::clone(&self.host), bytes, request).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_rendered(
                name,
                rendered.page,
                rendered.viewport.width,
                rendered.viewport.height,
            );
        }

        // ── Step 8: Encode ───────────────────────────────────────────────
        let png = encode_surface(Arc::clone(&self.host), rendered.surface, config.compression).await?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_encoded(name, png.len());
        }

        // ── Steps 9–10: Name and handle ──────────────────────────────────
        let image = ImageFile::png(derive_image_name(name), png);
        let image_url = match config.handle_style {
            HandleStyle::ObjectUrl => self.host.create_handle(&image),
            HandleStyle::DataUrl => image.to_data_url(),
        };

        Ok((image_url, image))
    }
}

/// Convert the first page of `file` with default settings and the
/// process-wide pdfium engine.
///
/// # Example
/// ```rust,no_run
/// use pdf2img::{convert_pdf_to_image, InputFile};
///
/// # #[tokio::main]
/// # async fn main() {
/// let bytes = std::fs::read("Resume.pdf").unwrap();
/// let result = convert_pdf_to_image(&InputFile::from_bytes("Resume.pdf", bytes)).await;
/// match result.error {
///     None => println!("{} → {}", result.file.unwrap().name, result.image_url),
///     Some(e) => eprintln!("{e}"),
/// }
/// # }
/// ```
pub async fn convert_pdf_to_image(file: &InputFile) -> PdfConversionResult {
    Converter::default().convert(file).await.into_result()
}

/// Synchronous wrapper around [`Converter::convert`].
///
/// Creates a temporary tokio runtime internally; do not call from async code.
pub fn convert_sync(file: &InputFile, config: &ConversionConfig) -> ConversionOutcome {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(Converter::new(config.clone()).convert(file)),
        Err(e) => ConversionOutcome::Failed(ConversionError::Internal(format!(
            "Failed to create tokio runtime: {}",
            e
        ))),
    }
}
