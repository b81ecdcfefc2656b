//! Page rasterisation: document bytes → a drawn [`RasterSurface`].
//!
//! Opening, page lookup and drawing all call into the engine, which is
//! CPU-bound and not async-safe, so the whole step runs on tokio's blocking
//! pool. The surface is allocated by the host between viewport computation
//! and drawing; if the host refuses, nothing is drawn.

use crate::engine::{EngineHandle, RenderEngine, Viewport};
use crate::error::ConversionError;
use crate::host::{RasterHost, RasterSurface};
use std::sync::Arc;
use tracing::{debug, info};

/// What to render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Used in errors and logs.
    pub name: String,
    /// 1-indexed.
    pub page: usize,
    pub scale: f32,
    pub password: Option<String>,
}

/// A page drawn into its surface.
#[derive(Debug)]
pub struct RenderedPage {
    pub page: usize,
    pub page_count: usize,
    pub viewport: Viewport,
    pub surface: RasterSurface,
}

/// Render one page on the blocking pool.
pub async fn render_page(
    engine: EngineHandle,
    host: Arc<dyn RasterHost>,
    bytes: Arc<[u8]>,
    request: RenderRequest,
) -> Result<RenderedPage, ConversionError> {
    tokio::task::spawn_blocking(move || {
        render_page_blocking(engine.as_ref(), host.as_ref(), &bytes, &request)
    })
    .await
    .map_err(|e| ConversionError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of page rendering.
pub fn render_page_blocking(
    engine: &dyn RenderEngine,
    host: &dyn RasterHost,
    bytes: &[u8],
    request: &RenderRequest,
) -> Result<RenderedPage, ConversionError> {
    let document = engine.open_document(&request.name, bytes, request.password.as_deref())?;
    let page_count = document.page_count();
    info!("'{}' loaded: {} pages", request.name, page_count);

    if request.page == 0 || request.page > page_count {
        return Err(ConversionError::PageOutOfRange {
            page: request.page,
            total: page_count,
        });
    }

    let page = document.page(request.page)?;
    let viewport = page.viewport(request.scale);
    debug!(
        "Page {} viewport at {}x: {}x{} px",
        request.page, viewport.scale, viewport.width, viewport.height
    );

    let mut surface = host
        .allocate_surface(viewport.width, viewport.height)
        .ok_or(ConversionError::SurfaceUnavailable {
            width: viewport.width,
            height: viewport.height,
        })?;

    page.render(&mut surface, &viewport)?;

    Ok(RenderedPage {
        page: request.page,
        page_count,
        viewport,
        surface,
    })
}
