//! Host runtime: raster surfaces, PNG encoding and displayable handles.
//!
//! The converter never allocates pixels or mints handles itself; it asks a
//! [`RasterHost`]. [`MemoryHost`] is the in-process implementation. Handles
//! are `blob:` URLs backed by an [`ObjectUrlRegistry`] and stay alive until
//! the caller revokes them.

use crate::config::PngCompression;
use crate::error::ConversionError;
use crate::output::ImageFile;
use image::codecs::png::{FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// An off-screen RGBA pixel buffer, white until something is drawn.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Composite `image` at the origin, clipped to the surface.
    pub fn draw(&mut self, image: &RgbaImage) {
        image::imageops::overlay(&mut self.pixels, image, 0, 0);
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }
}

/// Capabilities the converter needs from its runtime.
pub trait RasterHost: Send + Sync {
    /// A drawing surface of exactly `width × height`, or `None` when the
    /// host cannot provide one.
    fn allocate_surface(&self, width: u32, height: u32) -> Option<RasterSurface>;

    /// Serialise `surface` as PNG.
    fn encode_png(
        &self,
        surface: &RasterSurface,
        compression: PngCompression,
    ) -> Result<Vec<u8>, ConversionError>;

    /// Register `file` and return a URL that resolves to its bytes.
    fn create_handle(&self, file: &ImageFile) -> String;
}

/// In-memory host backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    max_surface_pixels: u64,
    registry: Arc<ObjectUrlRegistry>,
}

impl MemoryHost {
    /// A host that refuses surfaces above `max_surface_pixels` and registers
    /// handles in the process-wide registry.
    pub fn new(max_surface_pixels: u64) -> Self {
        Self {
            max_surface_pixels,
            registry: object_urls(),
        }
    }

    /// Use a private registry instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<ObjectUrlRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.registry
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_SURFACE_PIXELS)
    }
}

impl RasterHost for MemoryHost {
    fn allocate_surface(&self, width: u32, height: u32) -> Option<RasterSurface> {
        let pixels = width as u64 * height as u64;
        if pixels == 0 || pixels > self.max_surface_pixels {
            debug!(
                "Refusing {}x{} surface (limit {} px)",
                width, height, self.max_surface_pixels
            );
            return None;
        }
        Some(RasterSurface::new(width, height))
    }

    fn encode_png(
        &self,
        surface: &RasterSurface,
        compression: PngCompression,
    ) -> Result<Vec<u8>, ConversionError> {
        let pixels = surface.pixels();
        let mut buf = Vec::new();
        PngEncoder::new_with_quality(&mut buf, compression.into(), FilterType::Adaptive)
            .write_image(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| ConversionError::Encoding(e.to_string()))?;
        debug!(
            "Encoded {}x{} surface → {} bytes PNG",
            pixels.width(),
            pixels.height(),
            buf.len()
        );
        Ok(buf)
    }

    fn create_handle(&self, file: &ImageFile) -> String {
        self.registry.create(file.bytes())
    }
}

// ── Object URLs ──────────────────────────────────────────────────────────

/// A table of `blob:` URLs to encoded bytes.
///
/// Entries live until [`ObjectUrlRegistry::revoke`] is called; nothing is
/// released automatically.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return a fresh URL for them.
    pub fn create(&self, bytes: Arc<[u8]>) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:pdf2img/{id}");
        self.lock().insert(url.clone(), bytes);
        url
    }

    /// The bytes behind `url`, if it has not been revoked.
    pub fn resolve(&self, url: &str) -> Option<Arc<[u8]>> {
        self.lock().get(url).cloned()
    }

    /// Release `url`. Returns `false` if it was unknown or already revoked.
    pub fn revoke(&self, url: &str) -> bool {
        self.lock().remove(url).is_some()
    }

    /// Number of live URLs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

static OBJECT_URLS: Lazy<Arc<ObjectUrlRegistry>> = Lazy::new(|| Arc::new(ObjectUrlRegistry::new()));

/// The process-wide registry used by [`MemoryHost::new`].
pub fn object_urls() -> Arc<ObjectUrlRegistry> {
    Arc::clone(&OBJECT_URLS)
}
