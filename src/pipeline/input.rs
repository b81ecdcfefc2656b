//! Input files: immutable, named byte sources.
//!
//! An [`InputFile`] is either bytes already in memory (an upload) or a path
//! that is read when the conversion reaches that step. URLs are downloaded
//! up front by [`fetch`] and become in-memory inputs.

use crate::error::ConversionError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum Source {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

/// A caller-supplied document. Never mutated by the converter.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    source: Source,
}

impl InputFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: Source::Memory(bytes.into()),
        }
    }

    /// Named after the path's final component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            source: Source::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing path, for disk inputs.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::Path(p) => Some(p),
            Source::Memory(_) => None,
        }
    }

    /// The full byte content.
    pub async fn read_bytes(&self) -> Result<Arc<[u8]>, ConversionError> {
        match &self.source {
            Source::Memory(bytes) => Ok(Arc::clone(bytes)),
            Source::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => ConversionError::FileNotFound {
                        path: path.clone(),
                    },
                    std::io::ErrorKind::PermissionDenied => ConversionError::PermissionDenied {
                        path: path.clone(),
                    },
                    _ => ConversionError::Internal(format!(
                        "Failed to read '{}': {}",
                        path.display(),
                        e
                    )),
                })?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes.into())
            }
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Turn a CLI-style argument into an input: URLs are downloaded, anything
/// else is treated as a local path.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<InputFile, ConversionError> {
    if input.trim().is_empty() {
        return Err(ConversionError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        fetch(input, timeout_secs).await
    } else {
        Ok(InputFile::from_path(input))
    }
}

/// Download `url` into memory.
pub async fn fetch(url: &str, timeout_secs: u64) -> Result<InputFile, ConversionError> {
    info!("Downloading document from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| ConversionError::InvalidInput {
        input: url.to_string(),
    })?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConversionError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let timed_out_or = |e: reqwest::Error| {
        if e.is_timeout() {
            ConversionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConversionError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(parsed.clone()).send().await.map_err(timed_out_or)?;
    if !response.status().is_success() {
        return Err(ConversionError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(timed_out_or)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(InputFile::from_bytes(filename_from_url(&parsed), bytes.to_vec()))
}

/// Last non-empty path segment, or `downloaded.pdf`.
fn filename_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|last| !last.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
