//! The production engine, backed by `pdfium-render`.
//!
//! pdfium keeps thread-local state and is not safe to drive from async
//! code; every method here is called from `spawn_blocking`. The crate is
//! built with pdfium-render's `sync` feature, which makes [`Pdfium`]
//! `Send + Sync` and serialises calls into the library, so one bound
//! library can be shared between blocking threads.

use super::library::LibraryLocator;
use super::{EngineCell, EngineDocument, EngineHandle, EnginePage, PageSize, RenderEngine, Viewport};
use crate::error::ConversionError;
use crate::host::RasterSurface;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A bound pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfiumEngine {
    /// Bind to the library file at `path`.
    pub fn bind(path: &Path) -> Result<Self, ConversionError> {
        let bindings = Pdfium::bind_to_library(path).map_err(|e| {
            ConversionError::EngineUnavailable(format!(
                "failed to bind '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Resolve the library with `locator`, falling back to the system copy.
    pub fn load(locator: &LibraryLocator) -> Result<Self, ConversionError> {
        match locator.locate() {
            Ok(path) => {
                info!("Binding pdfium from {}", path.display());
                Self::bind(&path)
            }
            Err(e) => {
                warn!("{}; trying the system pdfium library", e);
                Pdfium::bind_to_system_library()
                    .map(|bindings| Self {
                        pdfium: Pdfium::new(bindings),
                    })
                    .map_err(|sys| {
                        ConversionError::EngineUnavailable(format!(
                            "{e}; system library: {sys}"
                        ))
                    })
            }
        }
    }
}

impl RenderEngine for PdfiumEngine {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn open_document<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
        password: Option<&str>,
    ) -> Result<Box<dyn EngineDocument + 'a>, ConversionError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| classify_open_error(name, &format!("{:?}", e)))?;
        debug!("Opened '{}': {} pages", name, document.pages().len());
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl EngineDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page<'d>(&'d self, number: usize) -> Result<Box<dyn EnginePage + 'd>, ConversionError> {
        let total = self.page_count();
        let index = number
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or(ConversionError::PageOutOfRange {
                page: number,
                total,
            })?;
        let page = self
            .document
            .pages()
            .get(index)
            .map_err(|e| ConversionError::RenderFailed {
                page: number,
                detail: format!("{:?}", e),
            })?;
        Ok(Box::new(PdfiumPage { number, page }))
    }
}

struct PdfiumPage<'a> {
    number: usize,
    page: PdfPage<'a>,
}

impl EnginePage for PdfiumPage<'_> {
    fn size(&self) -> PageSize {
        PageSize {
            width: self.page.width().value,
            height: self.page.height().value,
        }
    }

    fn render(
        &self,
        surface: &mut RasterSurface,
        viewport: &Viewport,
    ) -> Result<(), ConversionError> {
        let render_config = PdfRenderConfig::new()
            .set_target_width(viewport.width as i32)
            .set_target_height(viewport.height as i32);

        let bitmap = self
            .page
            .render_with_config(&render_config)
            .map_err(|e| ConversionError::RenderFailed {
                page: self.number,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image().into_rgba8();
        debug!(
            "Rendered page {} → {}x{} px",
            self.number,
            image.width(),
            image.height()
        );
        surface.draw(&image);
        Ok(())
    }
}

/// Map pdfium's load error text onto the error taxonomy.
///
/// pdfium only reports a coarse internal code, so this inspects its debug
/// rendering: password/security codes mean the document is encrypted, the
/// rest mean the bytes are not a readable document.
pub fn classify_open_error(name: &str, detail: &str) -> ConversionError {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("password") || lower.contains("security") {
        ConversionError::PasswordRequired {
            name: name.to_string(),
        }
    } else {
        ConversionError::DocumentOpen {
            name: name.to_string(),
            detail: detail.to_string(),
        }
    }
}

static SHARED_PDFIUM: Lazy<Arc<EngineCell>> = Lazy::new(|| Arc::new(pdfium_cell(LibraryLocator::from_env())));

/// The process-wide pdfium cell. Loaded on first conversion.
pub fn shared_pdfium() -> Arc<EngineCell> {
    Arc::clone(&SHARED_PDFIUM)
}

/// A cell whose loader locates and binds pdfium on the blocking pool.
pub fn pdfium_cell(locator: LibraryLocator) -> EngineCell {
    EngineCell::new(move || {
        let locator = locator.clone();
        async move {
            tokio::task::spawn_blocking(move || PdfiumEngine::load(&locator))
                .await
                .map_err(|e| ConversionError::Internal(format!("Engine loader panicked: {}", e)))?
                .map(|engine| Arc::new(engine) as EngineHandle)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn password_errors_are_classified() {
        let e = classify_open_error(
            "cv.pdf",
            "PdfiumLibraryInternalError(PasswordError)",
        );
        assert!(matches!(e, ConversionError::PasswordRequired { .. }));
        assert_eq!(e.kind(), ErrorKind::DocumentOpenFailure);
    }

    #[test]
    fn format_errors_are_document_failures() {
        let e = classify_open_error("cv.pdf", "PdfiumLibraryInternalError(FormatError)");
        match &e {
            ConversionError::DocumentOpen { name, detail } => {
                assert_eq!(name, "cv.pdf");
                assert!(detail.contains("FormatError"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(e.kind(), ErrorKind::DocumentOpenFailure);
    }

    #[test]
    fn engine_can_be_shared_between_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<PdfiumEngine>();
        assert_send_sync::<EngineHandle>();
    }

    #[test]
    fn shared_cell_is_a_singleton() {
        let a = shared_pdfium();
        let b = shared_pdfium();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
