//! The narrow rendering-engine contract the converter depends on.
//!
//! ```text
//! RenderEngine ──open_document──▶ EngineDocument ──page(n)──▶ EnginePage ──render──▶ RasterSurface
//! ```
//!
//! Everything here is synchronous: engine calls are CPU-bound and are driven
//! from `spawn_blocking` by [`crate::pipeline::render`]. The production
//! implementation is [`pdfium::PdfiumEngine`]; tests plug in their own.

pub mod cell;
pub mod library;
pub mod pdfium;

use crate::error::ConversionError;
use crate::host::RasterSurface;
use std::sync::Arc;

pub use cell::EngineCell;

/// A loaded engine, shared by every conversion in the process.
pub type EngineHandle = Arc<dyn RenderEngine>;

/// Natural page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Pixel dimensions a page is rasterised to at a given scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Viewport {
    /// Scale `size` and truncate to whole pixels.
    ///
    /// Negative or non-finite products collapse to zero, which the host then
    /// refuses as a surface size.
    pub fn for_page(size: PageSize, scale: f32) -> Self {
        let px = |points: f32| {
            let v = (points * scale).floor();
            if v.is_finite() && v > 0.0 {
                v.min(u32::MAX as f32) as u32
            } else {
                0
            }
        };
        Self {
            width: px(size.width),
            height: px(size.height),
            scale,
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Opens documents from raw bytes.
pub trait RenderEngine: Send + Sync {
    /// Short engine name for logs and progress events.
    fn name(&self) -> &str;

    /// Parse `bytes` as a document. `name` is only used in error messages.
    fn open_document<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
        password: Option<&str>,
    ) -> Result<Box<dyn EngineDocument + 'a>, ConversionError>;
}

/// An open document.
pub trait EngineDocument {
    fn page_count(&self) -> usize;

    /// Fetch a page by 1-indexed number. Callers check the range first.
    fn page<'d>(&'d self, number: usize) -> Result<Box<dyn EnginePage + 'd>, ConversionError>;
}

/// A single page of an open document.
pub trait EnginePage {
    fn size(&self) -> PageSize;

    fn viewport(&self, scale: f32) -> Viewport {
        Viewport::for_page(self.size(), scale)
    }

    /// Draw the page into `surface`, which is exactly `viewport`-sized.
    fn render(&self, surface: &mut RasterSurface, viewport: &Viewport)
        -> Result<(), ConversionError>;
}
