//! # gdelt-dl
//!
//! Real-time watcher for the GDELT Global Knowledge Graph.
//!
//! GDELT publishes a new GKG archive every 15 minutes and advertises it in
//! small pointer files (one for English sources, one for machine-translated
//! sources). gdelt-dl polls those pointers, downloads each new archive
//! exactly once into a year-partitioned tree and unpacks it next to the raw
//! archive.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gdelt_dl::{Config, Watcher, run_with_shutdown};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let watcher = Watcher::new(Config::default())?;
//!
//!     // Polls until SIGINT/SIGTERM
//!     run_with_shutdown(watcher).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Shared HTTP client
pub mod http;
/// Pointer file resolution
pub mod pointer;
/// Retry logic with exponential backoff
pub mod retry;
/// Poll loop and cycle backoff
pub mod scheduler;
/// On-disk artifact layout
pub mod store;
/// Per-stream processing state
pub mod tracker;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, HttpConfig, RetryConfig, StreamConfig};
pub use error::{DownloadError, Error, ExtractError, RequestError, Result};
pub use scheduler::{Backoff, CycleFailure, CycleReport, Verdict, Watcher, classify};
pub use store::ArtifactStore;
pub use tracker::{CycleContext, StreamTracker};
pub use types::{ArtifactPaths, ArtifactRef, Extraction, StreamOutcome};

use tokio_util::sync::CancellationToken;

/// Exit status when a second signal forces the process down
const FORCED_EXIT_CODE: i32 = 130;

/// Run the watcher until SIGINT or SIGTERM
///
/// The first signal cancels the watcher's shutdown token. Any request in
/// flight is abandoned, extraction is not started, and the call returns
/// `Ok(())`. A second signal exits the process at once with status 130.
///
/// On platforms without Unix signals, Ctrl+C plays both roles.
pub async fn run_with_shutdown(watcher: Watcher) -> Result<()> {
    let shutdown = CancellationToken::new();
    let listener = tokio::spawn(listen_for_signals(Signals::register(), shutdown.clone()));

    let result = watcher.run(shutdown).await;
    listener.abort();
    result
}

async fn listen_for_signals(mut signals: Signals, shutdown: CancellationToken) {
    let Some(first) = signals.recv().await else {
        return;
    };
    tracing::info!(signal = first, "shutdown requested, stopping after current step");
    shutdown.cancel();

    if let Some(second) = signals.recv().await {
        tracing::warn!(signal = second, "second signal received, exiting immediately");
        std::process::exit(FORCED_EXIT_CODE);
    }
}

/// Termination signals this process reacts to
#[cfg(unix)]
struct Signals {
    term: Option<tokio::signal::unix::Signal>,
    int: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Signals {
    fn register() -> Self {
        use tokio::signal::unix::SignalKind;

        Self {
            term: Self::listen(SignalKind::terminate(), "SIGTERM"),
            int: Self::listen(SignalKind::interrupt(), "SIGINT"),
        }
    }

    // Registration can fail in restricted environments (containers, tests)
    fn listen(
        kind: tokio::signal::unix::SignalKind,
        name: &'static str,
    ) -> Option<tokio::signal::unix::Signal> {
        tokio::signal::unix::signal(kind)
            .inspect_err(|e| {
                tracing::warn!(signal = name, error = %e, "cannot listen for signal");
            })
            .ok()
    }

    /// Name of the next signal, or `None` once none can arrive
    async fn recv(&mut self) -> Option<&'static str> {
        match (&mut self.term, &mut self.int) {
            (Some(term), Some(int)) => tokio::select! {
                Some(()) = term.recv() => Some("SIGTERM"),
                Some(()) = int.recv() => Some("SIGINT"),
                else => None,
            },
            (Some(term), None) => term.recv().await.map(|()| "SIGTERM"),
            (None, Some(int)) => int.recv().await.map(|()| "SIGINT"),
            (None, None) => ctrl_c().await,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> Self {
        Self
    }

    async fn recv(&mut self) -> Option<&'static str> {
        ctrl_c().await
    }
}

async fn ctrl_c() -> Option<&'static str> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Some("Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for Ctrl+C");
            None
        }
    }
}
