//! Per-stream processing state
//!
//! One [`StreamTracker`] per configured stream. Each cycle it resolves the
//! stream's pointer and walks the newest artifact through
//! download, extraction and bookkeeping. Per-stream failures become a
//! [`StreamOutcome`] so one stream can never block another.

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::pointer;
use crate::store::ArtifactStore;
use crate::types::{ArtifactPaths, Extraction, StreamOutcome};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything a tracker borrows for one cycle
pub struct CycleContext<'a> {
    /// Shared HTTP client
    pub client: &'a HttpClient,
    /// Output layout
    pub store: &'a ArtifactStore,
    /// Unpack archives after download
    pub extract: bool,
    /// Keep retrying extractions that failed on earlier cycles
    pub retry_failed_extraction: bool,
    /// Log unusable pointers at debug instead of warn
    pub ignore_malformed: bool,
    /// Timeout for the pointer GET
    pub pointer_timeout: Duration,
    /// Timeout for the archive GET
    pub download_timeout: Duration,
    /// Cancelled on SIGINT/SIGTERM
    pub shutdown: &'a CancellationToken,
}

/// Processing state for a single stream
///
/// `seen` only grows. A name is added once its archive is on disk; names of
/// artifacts that failed to download are never added, so they are retried on
/// the next cycle.
#[derive(Debug)]
pub struct StreamTracker {
    config: StreamConfig,
    seen: HashSet<String>,
    pending_extraction: HashMap<String, ArtifactPaths>,
}

impl StreamTracker {
    /// Create a tracker with empty state
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            seen: HashSet::new(),
            pending_extraction: HashMap::new(),
        }
    }

    /// Stream name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// True if `artifact` has been handled
    pub fn is_seen(&self, artifact: &str) -> bool {
        self.seen.contains(artifact)
    }

    /// Names of handled artifacts
    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Artifacts downloaded but not yet successfully extracted
    pub fn pending_extractions(&self) -> impl Iterator<Item = &str> {
        self.pending_extraction.keys().map(String::as_str)
    }

    /// Run one cycle for this stream
    ///
    /// # Errors
    /// Only errors the tracker cannot classify propagate; network failures
    /// and unusable pointers become outcomes.
    pub async fn poll(&mut self, ctx: &CycleContext<'_>) -> Result<StreamOutcome> {
        let stream = self.config.name.clone();

        if ctx.extract && ctx.retry_failed_extraction {
            self.retry_pending(ctx).await;
        }

        debug!(stream = %stream, pointer = %self.config.pointer_url, "polling");

        let resolved = pointer::resolve(
            ctx.client,
            &self.config.pointer_url,
            &self.config.archive_suffix,
            ctx.pointer_timeout,
            ctx.shutdown,
        )
        .await;

        let artifact = match resolved {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                self.log_unusable(ctx, &stream, "pointer has no matching artifact line");
                return Ok(StreamOutcome::NoNewArtifact);
            }
            Err(Error::MalformedPointer { reason, .. }) => {
                self.log_unusable(ctx, &stream, &reason);
                return Ok(StreamOutcome::NoNewArtifact);
            }
            Err(Error::Request(_)) if ctx.shutdown.is_cancelled() => {
                debug!(stream = %stream, "pointer fetch abandoned on shutdown");
                return Ok(StreamOutcome::Interrupted);
            }
            Err(e @ Error::Request(_)) => {
                warn!(stream = %stream, error = %e, "failed to fetch pointer");
                return Ok(StreamOutcome::PollFailed(e));
            }
            Err(e) => return Err(e),
        };

        let name = artifact.filename.clone();
        if self.seen.contains(&name) {
            debug!(stream = %stream, artifact = %name, "no new artifact");
            return Ok(StreamOutcome::AlreadySeen { name });
        }

        info!(stream = %stream, artifact = %name, "new artifact");
        let paths = ctx.store.paths(&self.config, &artifact);

        if ctx.shutdown.is_cancelled() {
            return Ok(StreamOutcome::Interrupted);
        }

        let downloaded = if ctx.store.is_present(&paths).await {
            info!(stream = %stream, path = ?paths.archive_path, "archive already on disk");
            false
        } else {
            info!(stream = %stream, url = %artifact.url, "downloading archive");
            if let Err(e) = ctx
                .store
                .download(
                    ctx.client,
                    &artifact.url,
                    &paths.archive_path,
                    ctx.download_timeout,
                    ctx.shutdown,
                )
                .await
            {
                if ctx.shutdown.is_cancelled() {
                    info!(stream = %stream, artifact = %name, "download abandoned on shutdown");
                    return Ok(StreamOutcome::Interrupted);
                }
                error!(stream = %stream, artifact = %name, error = %e, "download failed");
                return Ok(StreamOutcome::DownloadFailed { name });
            }
            true
        };

        let extraction = if ctx.extract {
            if ctx.shutdown.is_cancelled() {
                return Ok(StreamOutcome::Interrupted);
            }
            info!(stream = %stream, artifact = %name, dir = ?paths.extract_dir, "extracting");
            self.extract(ctx, &name, paths).await
        } else {
            Extraction::Skipped
        };

        self.seen.insert(name.clone());
        Ok(StreamOutcome::Done {
            name,
            downloaded,
            extraction,
        })
    }

    async fn extract(
        &mut self,
        ctx: &CycleContext<'_>,
        name: &str,
        paths: ArtifactPaths,
    ) -> Extraction {
        match ctx
            .store
            .extract(&paths.archive_path, &paths.extract_dir)
            .await
        {
            Ok(files) => {
                info!(
                    stream = %self.config.name,
                    artifact = %name,
                    dir = ?paths.extract_dir,
                    files = files.len(),
                    "extraction complete"
                );
                Extraction::Extracted(files.len())
            }
            Err(e) => {
                error!(
                    stream = %self.config.name,
                    artifact = %name,
                    error = %e,
                    "extraction failed, archive kept"
                );
                if ctx.retry_failed_extraction {
                    self.pending_extraction.insert(name.to_string(), paths);
                }
                Extraction::Failed
            }
        }
    }

    /// Retry extractions that failed on earlier cycles
    async fn retry_pending(&mut self, ctx: &CycleContext<'_>) {
        let names: Vec<String> = self.pending_extraction.keys().cloned().collect();

        for name in names {
            if ctx.shutdown.is_cancelled() {
                return;
            }
            let Some(paths) = self.pending_extraction.get(&name).cloned() else {
                continue;
            };

            if !ctx.store.is_present(&paths).await {
                warn!(
                    stream = %self.config.name,
                    artifact = %name,
                    "archive no longer on disk, dropping pending extraction"
                );
                self.pending_extraction.remove(&name);
                continue;
            }

            debug!(stream = %self.config.name, artifact = %name, "retrying extraction");
            match ctx
                .store
                .extract(&paths.archive_path, &paths.extract_dir)
                .await
            {
                Ok(files) => {
                    info!(
                        stream = %self.config.name,
                        artifact = %name,
                        files = files.len(),
                        "pending extraction complete"
                    );
                    self.pending_extraction.remove(&name);
                }
                Err(e) => {
                    warn!(
                        stream = %self.config.name,
                        artifact = %name,
                        error = %e,
                        "extraction still failing"
                    );
                }
            }
        }
    }

    fn log_unusable(&self, ctx: &CycleContext<'_>, stream: &str, reason: &str) {
        if ctx.ignore_malformed {
            debug!(stream = %stream, pointer = %self.config.pointer_url, reason, "no usable artifact");
        } else {
            warn!(stream = %stream, pointer = %self.config.pointer_url, reason, "no usable artifact");
        }
    }
}
