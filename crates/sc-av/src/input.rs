//! Input resolution: turn a [`ConversionInput`] into a local file the
//! transcoder can read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use sc_core::{Error, Result};

use crate::naming::{sanitize_extension, unique_stem};
use crate::scratch::ScratchFile;

/// Extension given to uploaded bytes when the client did not name the file.
const DEFAULT_UPLOAD_EXTENSION: &str = "wav";
/// Extension given to downloads whose URL path has none.
const DEFAULT_DOWNLOAD_EXTENSION: &str = "bin";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source audio for one conversion.
#[derive(Debug, Clone)]
pub enum ConversionInput {
    /// Raw file content, e.g. from a multipart upload.
    Bytes {
        data: Bytes,
        /// Client-side file name, used only for its extension.
        file_name: Option<String>,
    },
    /// A file already on local disk. It is read in place and never deleted.
    LocalPath(PathBuf),
    /// An `http`/`https` URL to download.
    RemoteUrl(String),
}

impl ConversionInput {
    /// Build a [`ConversionInput::Bytes`].
    pub fn bytes(data: impl Into<Bytes>, file_name: Option<String>) -> Self {
        ConversionInput::Bytes {
            data: data.into(),
            file_name,
        }
    }

    /// Classify a command-line location: `http://` and `https://` are URLs,
    /// anything else is a local path.
    pub fn from_location(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ConversionInput::RemoteUrl(location.to_string())
        } else {
            ConversionInput::LocalPath(PathBuf::from(location))
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConversionInput::Bytes { .. } => "bytes",
            ConversionInput::LocalPath(_) => "local_path",
            ConversionInput::RemoteUrl(_) => "remote_url",
        }
    }
}

/// A local file holding the source audio.
#[derive(Debug)]
pub enum StagedInput {
    /// Written by the resolver; removed on [`StagedInput::release`] or drop.
    Owned(ScratchFile),
    /// Supplied by the caller; left untouched.
    External(PathBuf),
}

impl StagedInput {
    pub fn path(&self) -> &Path {
        match self {
            StagedInput::Owned(scratch) => scratch.path(),
            StagedInput::External(path) => path,
        }
    }

    /// Whether the pipeline is responsible for deleting this file.
    pub fn is_owned(&self) -> bool {
        matches!(self, StagedInput::Owned(_))
    }

    /// Delete the file if the resolver created it.
    pub fn release(self) {
        match self {
            StagedInput::Owned(scratch) => scratch.cleanup(),
            StagedInput::External(path) => {
                tracing::debug!("Leaving caller-supplied input {} in place", path.display());
            }
        }
    }
}

/// Stages conversion inputs in the upload directory.
#[derive(Debug, Clone)]
pub struct InputResolver {
    upload_dir: PathBuf,
    http: reqwest::Client,
}

impl InputResolver {
    /// Create a resolver writing into `upload_dir`.
    pub fn new(upload_dir: impl Into<PathBuf>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            upload_dir: upload_dir.into(),
            http,
        })
    }

    /// Produce a local file for `input`.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if uploaded bytes cannot be written.
    /// - [`Error::Network`] if a download fails or returns a non-success status.
    /// - [`Error::UnsupportedInput`] for URLs that are not `http`/`https`.
    /// - [`Error::Input`] for malformed URLs and missing local files.
    pub async fn resolve(&self, input: ConversionInput) -> Result<StagedInput> {
        match input {
            ConversionInput::Bytes { data, file_name } => {
                let ext = file_name
                    .as_deref()
                    .and_then(sanitize_extension)
                    .unwrap_or_else(|| DEFAULT_UPLOAD_EXTENSION.to_string());
                self.save_bytes(&data, &ext).await
            }
            ConversionInput::LocalPath(path) => self.check_local(path).await,
            ConversionInput::RemoteUrl(url) => self.download(&url).await,
        }
    }

    fn staging_path(&self, ext: &str) -> PathBuf {
        self.upload_dir.join(format!("{}.{ext}", unique_stem()))
    }

    async fn save_bytes(&self, data: &[u8], ext: &str) -> Result<StagedInput> {
        let scratch = ScratchFile::new(self.staging_path(ext), "staged input");
        tracing::debug!(
            "Saving uploaded file {} ({} bytes)",
            scratch.path().display(),
            data.len()
        );

        if let Err(e) = tokio::fs::write(scratch.path(), data).await {
            tracing::error!("Failed to write upload {}: {e}", scratch.path().display());
            return Err(e.into());
        }

        Ok(StagedInput::Owned(scratch))
    }

    async fn check_local(&self, path: PathBuf) -> Result<StagedInput> {
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                tracing::debug!("Using local file {}", path.display());
                Ok(StagedInput::External(path))
            }
            Ok(_) => Err(Error::Input(format!("{} is not a regular file", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::Input(format!(
                "input file does not exist: {}",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, url: &str) -> Result<StagedInput> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::Input(format!("invalid URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::UnsupportedInput(format!(
                "URL scheme '{}' is not supported; use http or https",
                parsed.scheme()
            )));
        }

        tracing::info!("Downloading {url}");

        let response = self
            .http
            .get(parsed.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::error!("Download request failed for {url}: {e}");
                Error::network(url, e)
            })?;

        let ext = sanitize_extension(parsed.path())
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_EXTENSION.to_string());
        // Dropping the guard on any error below removes the partial file.
        let scratch = ScratchFile::new(self.staging_path(&ext), "staged input");
        let mut file = tokio::fs::File::create(scratch.path()).await?;

        let mut size: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::error!("Download of {url} interrupted: {e}");
                Error::network(url, e)
            })?;
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tracing::info!(
            "Downloaded {url} to {} ({size} bytes)",
            scratch.path().display()
        );
        Ok(StagedInput::Owned(scratch))
    }
}
