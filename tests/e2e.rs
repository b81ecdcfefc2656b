//! End-to-end tests against the real pdfium engine.
//!
//! These need a pdfium shared library (found via `PDFIUM_LIB_PATH`, the
//! cache, a download, or the system) and are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use pdf2img::engine::pdfium::shared_pdfium;
use pdf2img::{
    ConversionConfig, ConversionError, Converter, ErrorKind, InputFile, MemoryHost,
    ObjectUrlRegistry,
};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// A minimal PDF with one `width × height` pt page per entry, each holding a
/// filled black square in the lower-left corner.
fn minimal_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();
    let n = pages.len();
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".into());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        n
    ));
    for (i, (w, h)) in pages.iter().enumerate() {
        let content = "0 0 0 rg 0 0 50 50 re f";
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Contents {} 0 R >>",
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

/// pdfium is bound once per process; every test shares that binding.
fn pdfium_converter(config: ConversionConfig) -> (Converter, Arc<ObjectUrlRegistry>) {
    let registry = Arc::new(ObjectUrlRegistry::new());
    let host = MemoryHost::new(config.max_surface_pixels).with_registry(Arc::clone(&registry));
    let converter = Converter::new(config)
        .with_engine(shared_pdfium())
        .with_host(Arc::new(host));
    (converter, registry)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_square_page_renders_at_600px() {
    e2e_skip_unless_enabled!();

    let (converter, registry) = pdfium_converter(ConversionConfig::default());
    let input = InputFile::from_bytes("Resume.PDF", minimal_pdf(&[(200, 200)]));

    let (url, file) = converter
        .convert(&input)
        .await
        .into_std_result()
        .expect("pdfium renders the page");

    assert_eq!(file.name, "Resume.png");
    let decoded = image::load_from_memory(file.as_slice()).unwrap().to_rgba8();
    assert_eq!((decoded.width(), decoded.height()), (600, 600));
    // The square covers the bottom-left 150×150 px; the rest stays white.
    assert_eq!(decoded.get_pixel(10, 590).0[..3], [0, 0, 0]);
    assert_eq!(decoded.get_pixel(590, 10).0[..3], [255, 255, 255]);

    assert_eq!(registry.resolve(&url).as_deref(), Some(file.as_slice()));
    assert!(registry.revoke(&url));
}

#[tokio::test]
async fn test_letter_page_two() {
    e2e_skip_unless_enabled!();

    let config = ConversionConfig::builder().page(2).scale(1.0).build().unwrap();
    let (converter, _) = pdfium_converter(config);
    let input = InputFile::from_bytes("two.pdf", minimal_pdf(&[(200, 200), (612, 792)]));

    let file = converter.convert(&input).await.into_std_result().unwrap().1;
    let decoded = image::load_from_memory(file.as_slice()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (612, 792));
}

#[tokio::test]
async fn test_garbage_is_document_open_failure() {
    e2e_skip_unless_enabled!();

    let (converter, registry) = pdfium_converter(ConversionConfig::default());
    let input = InputFile::from_bytes("junk.pdf", b"this is not a pdf".to_vec());

    let result = converter.convert(&input).await.into_result();
    assert_eq!(result.error_kind, Some(ErrorKind::DocumentOpenFailure));
    assert_eq!(result.image_url, "");
    assert!(result.file.is_none());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_out_of_range_page() {
    e2e_skip_unless_enabled!();

    let config = ConversionConfig::builder().page(5).build().unwrap();
    let (converter, _) = pdfium_converter(config);
    let outcome = converter
        .convert(&InputFile::from_bytes("one.pdf", minimal_pdf(&[(200, 200)])))
        .await;
    assert!(matches!(
        outcome.error(),
        Some(ConversionError::PageOutOfRange { page: 5, total: 1 })
    ));
}

#[tokio::test]
async fn test_engine_is_bound_once() {
    e2e_skip_unless_enabled!();

    let (converter, _) = pdfium_converter(ConversionConfig::default());
    let a = InputFile::from_bytes("a.pdf", minimal_pdf(&[(200, 200)]));
    let b = InputFile::from_bytes("b.pdf", minimal_pdf(&[(100, 300)]));

    let (ra, rb) = tokio::join!(converter.convert(&a), converter.convert(&b));
    assert!(ra.is_success(), "{:?}", ra.error());
    assert!(rb.is_success(), "{:?}", rb.error());
    assert_eq!(converter.engine().attempts(), 1);
}
