//! # pdf2img
//!
//! Render one page of a PDF (by default the first) to a PNG preview: the
//! thumbnail a résumé tracker shows next to each uploaded CV.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Engine   shared pdfium binding, loaded once per process
//!  ├─ 2. Read     input bytes from memory, disk or URL
//!  ├─ 3. Render   open → page → viewport (3×) → surface → draw  (spawn_blocking)
//!  ├─ 4. Encode   lossless PNG, maximum compression             (spawn_blocking)
//!  └─ 5. Output   `Resume.PDF` → `Resume.png` + a `blob:` handle
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2img::{Converter, InputFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::default();
//!     let input = InputFile::from_path("Resume.pdf");
//!     let (url, image) = converter.convert(&input).await.into_std_result()?;
//!     image.write_to(&image.name).await?;
//!     println!("{} ({} bytes) at {}", image.name, image.size, url);
//!     pdf2img::host::object_urls().revoke(&url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Finding pdfium
//!
//! The shared library is resolved from `PDFIUM_LIB_PATH`, then a per-version
//! cache directory, then downloaded once (unless `PDF2IMG_NO_DOWNLOAD` is
//! set), then the system library. See [`engine::library`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod host;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, HandleStyle, PngCompression};
pub use convert::{convert_pdf_to_image, convert_sync, Converter};
pub use engine::{EngineCell, EngineDocument, EngineHandle, EnginePage, PageSize, RenderEngine, Viewport};
pub use error::{ConversionError, ErrorKind};
pub use host::{MemoryHost, ObjectUrlRegistry, RasterHost, RasterSurface};
pub use output::{ConversionOutcome, ImageFile, PdfConversionResult, PNG_MIME};
pub use pipeline::input::InputFile;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_all, convert_stream};
