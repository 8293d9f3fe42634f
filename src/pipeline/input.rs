//! Input resolution: turn a user-supplied path, URL or buffer into a
//! [`SelectedFile`].
//!
//! A `SelectedFile` carries a *declared* content type that is known before any
//! byte is read, mirroring what a browser file picker reports. For local files
//! and URLs the declaration comes from the file extension; callers that know
//! better (e.g. the CLI `--content-type` flag) override it. The session
//! validates the declaration first and only then calls [`SelectedFile::read`].

use crate::error::{error_chain, ExamQuestError};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where the bytes of a selected file live.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on the local file system.
    Path(PathBuf),
    /// An HTTP/HTTPS URL fetched on read.
    Url(String),
    /// Bytes already in memory.
    Bytes(Vec<u8>),
}

/// A file chosen by the user, not yet read.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Display name (file name or last URL segment).
    pub name: String,
    /// Declared MIME type, e.g. `image/jpeg` or `application/pdf`.
    pub content_type: String,
    pub source: FileSource,
}

impl SelectedFile {
    /// Select a local file, declaring its type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            content_type: content_type_for_path(path),
            source: FileSource::Path(path.to_path_buf()),
        }
    }

    /// Select a remote file, declaring its type from the URL path extension.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = url_file_name(&url).unwrap_or_else(|| "download".to_string());
        Self {
            content_type: content_type_for_path(Path::new(&name)),
            name,
            source: FileSource::Url(url),
        }
    }

    /// Select an in-memory buffer with an explicit declared type.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            source: FileSource::Bytes(bytes),
        }
    }

    /// Resolve a CLI argument: URLs become [`FileSource::Url`], anything else a path.
    pub fn from_input(input: &str) -> Self {
        if is_url(input) {
            Self::from_url(input)
        } else {
            Self::from_path(input)
        }
    }

    /// Replace the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Whether the declared content type is an image type.
    pub fn is_image(&self) -> bool {
        self.content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }

    /// Read the whole file into memory.
    pub async fn read(&self, download_timeout_secs: u64) -> Result<Vec<u8>, ExamQuestError> {
        match &self.source {
            FileSource::Bytes(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => {
                let bytes =
                    tokio::fs::read(path)
                        .await
                        .map_err(|e| ExamQuestError::ReadFailed {
                            name: path.display().to_string(),
                            reason: e.to_string(),
                        })?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            FileSource::Url(url) => download_url(url, download_timeout_secs).await,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Declared MIME type for a path, from its extension.
pub fn content_type_for_path(path: &Path) -> String {
    if let Ok(format) = ImageFormat::from_path(path) {
        return format.to_mime_type().to_string();
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn url_file_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    (!last.is_empty()).then(|| last.to_string())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ExamQuestError> {
    info!("Downloading image from: {}", url);

    let failed = |reason: String| ExamQuestError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(error_chain(&e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| failed(error_chain(&e)))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(error_chain(&e)))?;
    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
