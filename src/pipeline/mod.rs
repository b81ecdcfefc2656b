//! Pipeline stages for PDF-to-PNG conversion.
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (bytes)   (engine)   (PNG)
//! ```
//!
//! 1. [`input`]  — named, immutable document bytes from memory, disk or URL
//! 2. [`render`] — open, pick the page, size the viewport, draw into a host
//!    surface; runs in `spawn_blocking`
//! 3. [`encode`] — PNG-encode the surface and derive the output file name

pub mod encode;
pub mod input;
pub mod render;
