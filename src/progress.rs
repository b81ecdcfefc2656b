//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`]. The library
//! itself draws nothing; the CLI forwards these events to a progress bar.
//!
//! # Example
//!
//! ```rust
//! use pdf2img::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     encoded: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_encoded(&self, _file_name: &str, png_bytes: usize) {
//!         self.encoded.fetch_add(png_bytes, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { encoded: AtomicUsize::new(0) });
//! let config = ConversionConfig::builder()
//!     .progress_callback(cb as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the converter as a document moves through the pipeline.
///
/// Implementations must be `Send + Sync`: batch conversions run several
/// documents at once and call these methods from different tasks. All
/// methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called before the engine is requested.
    fn on_conversion_start(&self, file_name: &str) {
        let _ = file_name;
    }

    /// Called once the shared engine handle is available.
    fn on_engine_ready(&self, engine: &str) {
        let _ = engine;
    }

    /// Called after the page has been drawn into its surface.
    ///
    /// # Arguments
    /// * `page`   — 1-indexed page number
    /// * `width`, `height` — surface size in pixels
    fn on_page_rendered(&self, file_name: &str, page: usize, width: u32, height: u32) {
        let _ = (file_name, page, width, height);
    }

    /// Called with the size of the encoded PNG.
    fn on_encoded(&self, file_name: &str, png_bytes: usize) {
        let _ = (file_name, png_bytes);
    }

    /// Called exactly once per conversion, success or not.
    fn on_conversion_complete(&self, file_name: &str, success: bool) {
        let _ = (file_name, success);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
