//! Error types for gdelt-dl
//!
//! The taxonomy mirrors the decisions the watcher has to make:
//! - [`RequestError`] for HTTP failures after client-level retries
//! - [`Error::MalformedPointer`] when a pointer file names no usable artifact
//! - [`DownloadError`] when an archive could not be committed to disk
//! - [`ExtractError`] when a downloaded archive could not be unpacked
//!
//! Anything else is treated as unrecognized by the scheduler.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gdelt-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gdelt-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll_interval")
        key: Option<String>,
    },

    /// HTTP request failed after the client's retries were exhausted
    #[error("request failed: {0}")]
    Request(#[from] RequestError),

    /// Pointer content did not reference a usable artifact
    #[error("malformed pointer {url}: {reason}")]
    MalformedPointer {
        /// The pointer (or artifact) URL that could not be interpreted
        url: String,
        /// Why the content was rejected
        reason: String,
    },

    /// Archive download failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Archive extraction failed
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (config files)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Network or archive-format failure.
    ///
    /// The scheduler backs off and retries the whole cycle for these; every
    /// other variant is an unrecognized condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request(_) | Error::Download(_) => true,
            Error::Extract(e) => matches!(e, ExtractError::Corrupt { .. }),
            Error::Config { .. }
            | Error::MalformedPointer { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Other(_) => false,
        }
    }

    /// Shorthand for a config error tied to a specific key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// HTTP request errors
#[derive(Debug, Error)]
pub enum RequestError {
    /// Server answered with a non-2xx status
    #[error("GET {url} returned HTTP {status}")]
    Status {
        /// The requested URL
        url: String,
        /// The HTTP status code
        status: u16,
    },

    /// Connection, timeout or body transfer failure
    #[error("GET {url} failed: {source}")]
    Transport {
        /// The requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Shutdown was requested while the request was pending
    #[error("GET {url} cancelled by shutdown")]
    Cancelled {
        /// The requested URL
        url: String,
    },
}

impl RequestError {
    /// The URL this request was made against
    pub fn url(&self) -> &str {
        match self {
            RequestError::Status { url, .. }
            | RequestError::Transport { url, .. }
            | RequestError::Cancelled { url } => url,
        }
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport { .. } | RequestError::Cancelled { .. } => None,
        }
    }
}

/// Archive download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The GET for the archive failed
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Body transfer broke off before completion
    #[error("transfer of {url} interrupted: {reason}")]
    Interrupted {
        /// The archive URL
        url: String,
        /// The reason the transfer stopped
        reason: String,
    },

    /// Local filesystem failure while writing or committing the archive
    #[error("failed to write {path}: {source}")]
    Write {
        /// The path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Archive file could not be opened
    #[error("failed to open {archive}: {source}")]
    Open {
        /// The archive path
        archive: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Archive is corrupt or truncated
    #[error("corrupt archive {archive}: {reason}")]
    Corrupt {
        /// The archive that failed to decode
        archive: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Output could not be written
    #[error("failed to write {path}: {source}")]
    Write {
        /// The output path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The blocking extraction task did not complete
    #[error("extraction task failed: {0}")]
    Task(String),
}
