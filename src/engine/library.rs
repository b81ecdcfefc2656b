//! Locate the pdfium shared library, downloading it once if needed.
//!
//! Resolution order (first hit wins):
//!
//! 1. `PDFIUM_LIB_PATH` — an explicit library file.
//! 2. The per-version cache directory, `<cache>/pdf2img/pdfium-<VERSION>/`
//!    (override the base with `PDF2IMG_CACHE_DIR`).
//! 3. A fresh download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries),
//!    unless `PDF2IMG_NO_DOWNLOAD` is set.
//!
//! Everything here blocks; call it from `spawn_blocking`.

use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ConversionError;

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const RELEASE_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// `(os, arch, archive, path inside archive, file name on disk)`.
const PLATFORMS: &[(&str, &str, &str, &str, &str)] = &[
    ("macos", "aarch64", "pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
    ("macos", "x86_64", "pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
    ("linux", "x86_64", "pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
    ("linux", "aarch64", "pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
    ("windows", "x86_64", "pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
    ("windows", "aarch64", "pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
    ("windows", "x86", "pdfium-win-x86.tgz", "bin/pdfium.dll", "pdfium.dll"),
];

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("no pdfium build for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("pdfium not found at '{0}' and downloads are disabled")]
    NotFound(PathBuf),

    #[error("cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    #[error("download failed: {0}")]
    Download(String),

    #[error("archive extraction failed: {0}")]
    Extract(String),
}

impl From<LibraryError> for ConversionError {
    fn from(e: LibraryError) -> Self {
        ConversionError::EngineUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
struct Platform {
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

fn platform_for(os: &str, arch: &str) -> Result<Platform, LibraryError> {
    PLATFORMS
        .iter()
        .find(|(o, a, ..)| *o == os && *a == arch)
        .map(|&(_, _, archive, member, file_name)| Platform {
            archive,
            member,
            file_name,
        })
        .ok_or_else(|| LibraryError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

fn current_platform() -> Result<Platform, LibraryError> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Where to look for (and whether to fetch) the pdfium library.
#[derive(Debug, Clone)]
pub struct LibraryLocator {
    /// Explicit library file; wins when it exists.
    pub explicit_path: Option<PathBuf>,
    /// Directory holding the cached, versioned library.
    pub cache_dir: PathBuf,
    /// Fetch the library when it is not cached.
    pub allow_download: bool,
    /// Download timeout in seconds.
    pub download_timeout_secs: u64,
}

impl Default for LibraryLocator {
    fn default() -> Self {
        Self {
            explicit_path: None,
            cache_dir: default_cache_dir(None),
            allow_download: true,
            download_timeout_secs: 300,
        }
    }
}

impl LibraryLocator {
    /// Build a locator from `PDFIUM_LIB_PATH`, `PDF2IMG_CACHE_DIR` and
    /// `PDF2IMG_NO_DOWNLOAD`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            explicit_path: non_empty("PDFIUM_LIB_PATH").map(PathBuf::from),
            cache_dir: default_cache_dir(non_empty("PDF2IMG_CACHE_DIR").map(PathBuf::from)),
            allow_download: non_empty("PDF2IMG_NO_DOWNLOAD").is_none(),
            ..Self::default()
        }
    }

    /// The library path inside [`Self::cache_dir`] for this platform.
    pub fn cached_path(&self) -> Result<PathBuf, LibraryError> {
        Ok(self.cache_dir.join(current_platform()?.file_name))
    }

    /// `true` when [`Self::locate`] would not touch the network.
    pub fn is_available_offline(&self) -> bool {
        if self.explicit_path.as_deref().is_some_and(Path::exists) {
            return true;
        }
        self.cached_path().map(|p| p.exists()).unwrap_or(false)
    }

    /// Resolve a library file, downloading into the cache on a miss.
    pub fn locate(&self) -> Result<PathBuf, LibraryError> {
        if let Some(path) = &self.explicit_path {
            if path.exists() {
                debug!("Using pdfium from PDFIUM_LIB_PATH: {}", path.display());
                return Ok(path.clone());
            }
            warn!("PDFIUM_LIB_PATH '{}' does not exist; falling back", path.display());
        }

        let platform = current_platform()?;
        let cached = self.cache_dir.join(platform.file_name);
        if cached.exists() {
            debug!("Using cached pdfium: {}", cached.display());
            return Ok(cached);
        }

        if !self.allow_download {
            return Err(LibraryError::NotFound(cached));
        }

        let url = format!(
            "{}/chromium%2F{}/{}",
            RELEASE_BASE_URL, PDFIUM_VERSION, platform.archive
        );
        info!("Downloading pdfium {} from {}", PDFIUM_VERSION, url);

        std::fs::create_dir_all(&self.cache_dir).map_err(LibraryError::CacheDir)?;
        let archive = download(&url, self.download_timeout_secs)?;
        extract_member(&archive, platform.member, &cached)?;

        info!("pdfium cached at {}", cached.display());
        Ok(cached)
    }
}

/// `<base>/pdf2img/pdfium-<VERSION>`, where `base` defaults to the user's
/// cache directory.
pub fn default_cache_dir(base: Option<PathBuf>) -> PathBuf {
    let base = base.unwrap_or_else(|| {
        dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir)
    });
    base.join("pdf2img").join(format!("pdfium-{PDFIUM_VERSION}"))
}

fn download(url: &str, timeout_secs: u64) -> Result<Vec<u8>, LibraryError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdf2img/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LibraryError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| LibraryError::Download(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(LibraryError::Download(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let mut buf = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    response
        .read_to_end(&mut buf)
        .map_err(|e| LibraryError::Download(format!("read error: {e}")))?;
    debug!("Downloaded {} bytes", buf.len());
    Ok(buf)
}

/// Unpack the single entry `member` of a `.tgz` archive to `dest`.
fn extract_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), LibraryError> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| LibraryError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| LibraryError::Extract(e.to_string()))?;
        let is_member = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(|e| LibraryError::Extract(e.to_string()))?;
        if is_member {
            entry
                .unpack(dest)
                .map_err(|e| LibraryError::Extract(format!("unpack failed: {e}")))?;
            return Ok(());
        }
    }

    Err(LibraryError::Extract(format!("'{member}' not found in archive")))
}
