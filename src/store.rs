//! On-disk artifact layout and atomic archive writes
//!
//! ```text
//! <root>/<year>/<raw_subdir>/<filename>   downloaded archive
//! <root>/<year>/<csv_subdir>/             extracted CSV
//! ```
//!
//! Archives are streamed into `<filename>.part` and renamed into place once
//! the transfer completes, so a file at the final path is always a whole
//! archive and "already on disk" can be trusted on restart.

use crate::config::StreamConfig;
use crate::error::{DownloadError, ExtractError};
use crate::extraction;
use crate::http::HttpClient;
use crate::types::{ArtifactPaths, ArtifactRef};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const WRITE_BUF_SIZE: usize = 1024 * 1024;

/// Filesystem root for all streams
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root` (created lazily on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where `artifact` of `stream` lives on disk
    pub fn paths(&self, stream: &StreamConfig, artifact: &ArtifactRef) -> ArtifactPaths {
        let year_dir = self.root.join(&artifact.year);
        ArtifactPaths {
            archive_path: year_dir.join(&stream.raw_subdir).join(&artifact.filename),
            extract_dir: year_dir.join(&stream.csv_subdir),
        }
    }

    /// True if a completed archive exists at `paths.archive_path`
    pub async fn is_present(&self, paths: &ArtifactPaths) -> bool {
        tokio::fs::metadata(&paths.archive_path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Download `url` to `dest`, committing only a complete transfer
    ///
    /// On any failure the partial file is removed and nothing exists at
    /// `dest`. Cancelling `shutdown` aborts the transfer the same way.
    pub async fn download(
        &self,
        client: &HttpClient,
        url: &str,
        dest: &Path,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        let response = client.get(url, timeout, shutdown).await?;
        let mut source = ResponseChunks {
            url: url.to_string(),
            response,
            shutdown,
        };

        let bytes = write_atomic(&mut source, dest).await?;
        info!(url, path = ?dest, bytes, "archive downloaded");
        Ok(dest.to_path_buf())
    }

    /// Unpack `archive` into `out_dir`
    ///
    /// Returns the extracted files. The archive is never removed.
    pub async fn extract(
        &self,
        archive: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        extraction::extract_archive(archive, out_dir).await
    }
}

/// Streamed body of a transfer
pub(crate) trait ChunkSource {
    /// Next chunk, or `None` at end of body
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DownloadError>;
}

struct ResponseChunks<'a> {
    url: String,
    response: reqwest::Response,
    shutdown: &'a CancellationToken,
}

impl ChunkSource for ResponseChunks<'_> {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DownloadError> {
        let shutdown = self.shutdown;
        let reason = tokio::select! {
            biased;
            _ = shutdown.cancelled() => "shutdown requested".to_string(),
            chunk = self.response.chunk() => match chunk {
                Ok(chunk) => return Ok(chunk),
                Err(e) => e.to_string(),
            },
        };
        Err(DownloadError::Interrupted {
            url: self.url.clone(),
            reason,
        })
    }
}

/// `<dest>.part`
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Drain `source` into `dest` via a `.part` sibling and rename on success
///
/// Returns the number of bytes written.
pub(crate) async fn write_atomic(
    source: &mut impl ChunkSource,
    dest: &Path,
) -> Result<u64, DownloadError> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| DownloadError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let part = part_path(dest);
    let result = write_part(source, &part).await;

    let result = match result {
        Ok(bytes) => tokio::fs::rename(&part, dest)
            .await
            .map(|()| bytes)
            .map_err(|source| DownloadError::Write {
                path: dest.to_path_buf(),
                source,
            }),
        Err(e) => Err(e),
    };

    if result.is_err()
        && let Err(e) = tokio::fs::remove_file(&part).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = ?part, error = %e, "failed to remove partial download");
    }

    result
}

async fn write_part(source: &mut impl ChunkSource, part: &Path) -> Result<u64, DownloadError> {
    let write_err = |source| DownloadError::Write {
        path: part.to_path_buf(),
        source,
    };

    let file = tokio::fs::File::create(part).await.map_err(write_err)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUF_SIZE, file);
    let mut written: u64 = 0;

    while let Some(chunk) = source.next_chunk().await? {
        writer.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }

    writer.flush().await.map_err(write_err)?;
    writer.get_ref().sync_all().await.map_err(write_err)?;
    debug!(path = ?part, written, "partial download complete");
    Ok(written)
}
