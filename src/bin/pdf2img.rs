//! CLI binary for pdf2img.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, converts each input and writes `<name>.png` files.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2img::engine::library::LibraryLocator;
use pdf2img::pipeline::input::resolve_input;
use pdf2img::{
    convert_stream, ConversionConfig, ConversionOutcome, ConversionProgressCallback, Converter,
    HandleStyle, PdfConversionResult, PngCompression, ProgressCallback,
};
use serde::Serialize;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch; per-stage events update its message.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_engine_ready(&self, engine: &str) {
        self.bar.set_message(format!("{engine} ready"));
    }

    fn on_page_rendered(&self, file_name: &str, page: usize, width: u32, height: u32) {
        self.bar
            .set_message(format!("{file_name}: page {page} → {width}x{height}"));
    }

    fn on_conversion_complete(&self, file_name: &str, success: bool) {
        let mark = if success { green("✓") } else { red("✗") };
        self.bar.println(format!("  {mark} {file_name}"));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # First page of a résumé → Resume.png in the current directory
  pdf2img Resume.PDF

  # Several files, second page, into previews/
  pdf2img --page 2 -o previews/ a.pdf b.pdf c.pdf

  # Smaller, faster previews
  pdf2img --scale 1.5 --compression fast cv.pdf

  # From a URL, JSON summary on stdout
  pdf2img --json https://example.com/cv.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
  PDF2IMG_CACHE_DIR       Override the pdfium cache base directory
  PDF2IMG_NO_DOWNLOAD     Never download pdfium; fail (or use the system copy)
  RUST_LOG                Fine-grained log filter (overrides -v / -q)
"#;

/// Render a page of each PDF to a PNG preview.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2img",
    version,
    about = "Render a page of each PDF to a PNG preview",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory to write PNG files into.
    #[arg(short, long, env = "PDF2IMG_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Page to render (1-indexed).
    #[arg(long, env = "PDF2IMG_PAGE", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    page: u64,

    /// Magnification factor applied to the page size in points.
    #[arg(long, env = "PDF2IMG_SCALE", default_value_t = 3.0)]
    scale: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2IMG_PASSWORD")]
    password: Option<String>,

    /// PNG compression effort.
    #[arg(long, env = "PDF2IMG_COMPRESSION", value_enum, default_value = "best")]
    compression: CompressionArg,

    /// Per-file conversion deadline in milliseconds.
    #[arg(long, env = "PDF2IMG_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Files converted at the same time.
    #[arg(short, long, env = "PDF2IMG_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "PDF2IMG_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON array of results instead of a summary.
    #[arg(long, env = "PDF2IMG_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2IMG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2IMG_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum CompressionArg {
    Fast,
    Default,
    Best,
}

impl From<CompressionArg> for PngCompression {
    fn from(v: CompressionArg) -> Self {
        match v {
            CompressionArg::Fast => PngCompression::Fast,
            CompressionArg::Default => PngCompression::Default,
            CompressionArg::Best => PngCompression::Best,
        }
    }
}

/// One line of `--json` output.
#[derive(Serialize)]
struct JsonRecord {
    input: String,
    output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    write_error: Option<String>,
    #[serde(flatten)]
    result: PdfConversionResult,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Make sure pdfium is on disk before the bar starts ────────────────
    let locator = LibraryLocator::from_env();
    if !locator.is_available_offline() && locator.allow_download && !cli.quiet {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        spinner.set_prefix("PDF engine");
        spinner.set_message("Downloading pdfium…");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let fetched = tokio::task::spawn_blocking(move || locator.locate())
            .await
            .context("pdfium download task panicked")?;
        match fetched {
            Ok(_) => spinner.finish_with_message("ready ✓"),
            // The converter reports the failure per file, after trying the system library.
            Err(e) => spinner.finish_with_message(format!("download failed: {e}")),
        }
    }

    // ── Resolve inputs ───────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let file = resolve_input(input, cli.download_timeout)
            .await
            .with_context(|| format!("Failed to read input '{input}'"))?;
        files.push(file);
    }

    // ── Build config ─────────────────────────────────────────────────────
    let cli_progress = show_progress.then(|| CliProgressCallback::new(files.len()));
    let progress: Option<ProgressCallback> = cli_progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let config = build_config(&cli, progress)?;

    // ── Run conversions ──────────────────────────────────────────────────
    let converter = Converter::new(config);
    let mut results = convert_stream(converter, files);
    let mut records = Vec::new();
    let mut failed = 0usize;
    let mut taken = HashSet::new();

    while let Some((input, outcome)) = results.next().await {
        let mut write_error = None;
        let output_path = match &outcome {
            ConversionOutcome::Converted { image_url, file } => {
                let path = unique_output_path(&cli.output_dir, &file.name, &mut taken);
                let written = file.write_to(&path).await;
                pdf2img::host::object_urls().revoke(image_url);
                match written {
                    Ok(()) => Some(path),
                    Err(e) => {
                        failed += 1;
                        write_error = Some(e.to_string());
                        None
                    }
                }
            }
            ConversionOutcome::Failed(_) => {
                failed += 1;
                None
            }
        };
        records.push(JsonRecord {
            input,
            output_path,
            write_error,
            result: outcome.into_result(),
        });
    }

    if let Some(cb) = cli_progress {
        cb.bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialise results")?
        );
    } else if !cli.quiet {
        for r in records.iter().filter(|r| !show_progress || r.output_path.is_none()) {
            match (&r.output_path, r.write_error.as_ref().or(r.result.error.as_ref())) {
                (Some(path), _) => eprintln!(
                    "{} {}  →  {}  {}",
                    green("✔"),
                    r.input,
                    bold(&path.display().to_string()),
                    dim(&format!(
                        "{} bytes",
                        r.result.file.as_ref().map(|f| f.size).unwrap_or(0)
                    )),
                ),
                (None, Some(err)) => eprintln!("{} {}  {}", red("✘"), r.input, red(err)),
                (None, None) => {}
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed}/{} conversions failed", records.len());
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .page(cli.page as usize)
        .scale(cli.scale)
        .compression(cli.compression.clone().into())
        .handle_style(HandleStyle::ObjectUrl)
        .concurrency(cli.concurrency);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ms) = cli.timeout_ms {
        builder = builder.timeout_ms(ms);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `dir/name`, or `dir/stem-2.png`, `dir/stem-3.png`, … when an earlier
/// input in this run already claimed that path.
fn unique_output_path(dir: &Path, name: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let mut path = dir.join(name);
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let mut n = 2;
    while taken.contains(&path) {
        path = dir.join(format!("{stem}-{n}.png"));
        n += 1;
    }
    taken.insert(path.clone());
    path
}
