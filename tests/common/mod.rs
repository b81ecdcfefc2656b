//! Shared test doubles: a text-format fake engine and instrumented hosts.
//!
//! Fake documents are plain text:
//!
//! ```text
//! FAKEPDF
//! 200x200
//! 612x792
//! ```
//!
//! one page size (in points) per line after the header. A first line of
//! `FAKEPDF locked=<pw>` requires that password.

#![allow(dead_code)]

use pdf2img::{
    ConversionError, EngineCell, EngineDocument, EngineHandle, EnginePage, ImageFile, MemoryHost,
    ObjectUrlRegistry, PageSize, PngCompression, RasterHost, RasterSurface, RenderEngine, Viewport,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Colour every fake page is painted with.
pub const INK: [u8; 4] = [20, 40, 200, 255];

pub fn fake_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let mut s = String::from("FAKEPDF\n");
    for (w, h) in pages {
        s.push_str(&format!("{w}x{h}\n"));
    }
    s.into_bytes()
}

pub fn locked_pdf(password: &str, pages: &[(u32, u32)]) -> Vec<u8> {
    let mut s = format!("FAKEPDF locked={password}\n");
    for (w, h) in pages {
        s.push_str(&format!("{w}x{h}\n"));
    }
    s.into_bytes()
}

// ── Engine ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeEngine {
    pub opened: AtomicUsize,
    pub rendered: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl RenderEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn open_document<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
        password: Option<&str>,
    ) -> Result<Box<dyn EngineDocument + 'a>, ConversionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let open_failed = |detail: &str| ConversionError::DocumentOpen {
            name: name.to_string(),
            detail: detail.to_string(),
        };

        let text = std::str::from_utf8(bytes).map_err(|_| open_failed("not text"))?;
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default();
        let mut header_parts = header.split_whitespace();
        if header_parts.next() != Some("FAKEPDF") {
            return Err(open_failed("missing FAKEPDF header"));
        }
        if let Some(lock) = header_parts.next().and_then(|p| p.strip_prefix("locked=")) {
            if password != Some(lock) {
                return Err(ConversionError::PasswordRequired {
                    name: name.to_string(),
                });
            }
        }

        let mut pages = Vec::new();
        for line in lines.filter(|l| !l.trim().is_empty()) {
            let (w, h) = line
                .trim()
                .split_once('x')
                .ok_or_else(|| open_failed("bad page line"))?;
            let w: f32 = w.parse().map_err(|_| open_failed("bad width"))?;
            let h: f32 = h.parse().map_err(|_| open_failed("bad height"))?;
            pages.push(PageSize {
                width: w,
                height: h,
            });
        }

        Ok(Box::new(FakeDocument {
            pages,
            rendered: &self.rendered,
        }))
    }
}

struct FakeDocument<'a> {
    pages: Vec<PageSize>,
    rendered: &'a AtomicUsize,
}

impl EngineDocument for FakeDocument<'_> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page<'d>(&'d self, number: usize) -> Result<Box<dyn EnginePage + 'd>, ConversionError> {
        let size = self
            .pages
            .get(number - 1)
            .copied()
            .ok_or(ConversionError::PageOutOfRange {
                page: number,
                total: self.pages.len(),
            })?;
        Ok(Box::new(FakePage {
            size,
            rendered: self.rendered,
        }))
    }
}

struct FakePage<'a> {
    size: PageSize,
    rendered: &'a AtomicUsize,
}

impl EnginePage for FakePage<'_> {
    fn size(&self) -> PageSize {
        self.size
    }

    fn render(&self, surface: &mut RasterSurface, viewport: &Viewport) -> Result<(), ConversionError> {
        assert_eq!((surface.width(), surface.height()), (viewport.width, viewport.height));
        for px in surface.pixels_mut().pixels_mut() {
            px.0 = INK;
        }
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Engine cells ─────────────────────────────────────────────────────────────

/// A cell whose loader counts calls, waits `delay`, and fails the first
/// `fail_first` attempts.
pub fn counting_cell(
    engine: Arc<FakeEngine>,
    loads: Arc<AtomicUsize>,
    fail_first: usize,
    delay: Duration,
) -> Arc<EngineCell> {
    Arc::new(EngineCell::new(move || {
        let engine = Arc::clone(&engine);
        let loads = Arc::clone(&loads);
        async move {
            let n = loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            if n < fail_first {
                Err(ConversionError::EngineUnavailable(
                    "failed to fetch engine module".into(),
                ))
            } else {
                Ok(engine as EngineHandle)
            }
        }
    }))
}

pub fn ready_cell(engine: Arc<FakeEngine>) -> Arc<EngineCell> {
    Arc::new(EngineCell::ready(engine))
}

// ── Hosts ────────────────────────────────────────────────────────────────────

/// A [`MemoryHost`] with a private registry that counts every call.
#[derive(Debug)]
pub struct CountingHost {
    pub inner: MemoryHost,
    pub surfaces: AtomicUsize,
    pub encodes: AtomicUsize,
    pub handles: AtomicUsize,
}

impl CountingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryHost::default().with_registry(Arc::new(ObjectUrlRegistry::new())),
            surfaces: AtomicUsize::new(0),
            encodes: AtomicUsize::new(0),
            handles: AtomicUsize::new(0),
        })
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        self.inner.registry()
    }
}

impl RasterHost for CountingHost {
    fn allocate_surface(&self, width: u32, height: u32) -> Option<RasterSurface> {
        self.surfaces.fetch_add(1, Ordering::SeqCst);
        self.inner.allocate_surface(width, height)
    }

    fn encode_png(
        &self,
        surface: &RasterSurface,
        compression: PngCompression,
    ) -> Result<Vec<u8>, ConversionError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode_png(surface, compression)
    }

    fn create_handle(&self, file: &ImageFile) -> String {
        self.handles.fetch_add(1, Ordering::SeqCst);
        self.inner.create_handle(file)
    }
}

/// Never hands out a surface.
#[derive(Debug, Default)]
pub struct NoSurfaceHost {
    pub encodes: AtomicUsize,
    pub handles: AtomicUsize,
}

impl RasterHost for NoSurfaceHost {
    fn allocate_surface(&self, _width: u32, _height: u32) -> Option<RasterSurface> {
        None
    }

    fn encode_png(
        &self,
        _surface: &RasterSurface,
        _compression: PngCompression,
    ) -> Result<Vec<u8>, ConversionError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0])
    }

    fn create_handle(&self, _file: &ImageFile) -> String {
        self.handles.fetch_add(1, Ordering::SeqCst);
        "blob:never".into()
    }
}

/// Allocates normally but its encoder yields nothing.
#[derive(Debug, Default)]
pub struct EmptyEncoderHost {
    pub handles: AtomicUsize,
}

impl RasterHost for EmptyEncoderHost {
    fn allocate_surface(&self, width: u32, height: u32) -> Option<RasterSurface> {
        Some(RasterSurface::new(width, height))
    }

    fn encode_png(
        &self,
        _surface: &RasterSurface,
        _compression: PngCompression,
    ) -> Result<Vec<u8>, ConversionError> {
        Ok(Vec::new())
    }

    fn create_handle(&self, _file: &ImageFile) -> String {
        self.handles.fetch_add(1, Ordering::SeqCst);
        "blob:never".into()
    }
}

// ── Progress ─────────────────────────────────────────────────────────────────

/// Records every progress event as a string.
#[derive(Debug, Default)]
pub struct RecordingCallback {
    pub events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl pdf2img::ConversionProgressCallback for RecordingCallback {
    fn on_conversion_start(&self, file_name: &str) {
        self.push(format!("start {file_name}"));
    }

    fn on_engine_ready(&self, engine: &str) {
        self.push(format!("engine {engine}"));
    }

    fn on_page_rendered(&self, file_name: &str, page: usize, width: u32, height: u32) {
        self.push(format!("rendered {file_name} p{page} {width}x{height}"));
    }

    fn on_encoded(&self, file_name: &str, _png_bytes: usize) {
        self.push(format!("encoded {file_name}"));
    }

    fn on_conversion_complete(&self, file_name: &str, success: bool) {
        self.push(format!("complete {file_name} {success}"));
    }
}
