//! Poll loop
//!
//! [`Watcher`] runs every stream tracker once per cycle, in configuration
//! order, then sleeps. Failed cycles stretch the sleep with a process-wide
//! exponential [`Backoff`] that resets after the next clean cycle.
//!
//! Shutdown ends the sleep at once and cuts short any request still in
//! flight. An abandoned transfer leaves no file behind, and extraction never
//! starts once shutdown is requested.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::store::ArtifactStore;
use crate::tracker::{CycleContext, StreamTracker};
use crate::types::StreamOutcome;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Exponential cycle backoff
///
/// Each failure returns the current wait and doubles it, never exceeding
/// `cap`. With a 120s base and 1800s cap the waits are
/// 120, 240, 480, 960, 1800, 1800, ...
#[derive(Clone, Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    /// Start at `base`
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            current: base,
        }
    }

    /// Wait the next failure will return
    pub fn current(&self) -> Duration {
        self.current.min(self.cap)
    }

    /// Record a failed cycle and return how long to wait
    pub fn fail(&mut self) -> Duration {
        let wait = self.current();
        self.current = self.current.saturating_mul(2).min(self.cap);
        wait
    }

    /// Record a clean cycle
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Outcomes of one cycle, in stream order
#[derive(Debug, Default)]
pub struct CycleReport {
    /// `(stream name, outcome)` per stream processed
    pub outcomes: Vec<(String, StreamOutcome)>,
}

impl CycleReport {
    /// True if no stream hit a transient failure
    pub fn is_clean(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|(_, outcome)| outcome.is_cycle_failure())
    }

    /// Names of streams whose pointer poll failed
    pub fn failed_streams(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_cycle_failure())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// True if shutdown cut the cycle short
    pub fn was_interrupted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|(_, outcome)| matches!(outcome, StreamOutcome::Interrupted))
    }
}

/// What the loop does after a cycle
#[derive(Debug)]
pub enum Verdict {
    /// Reset backoff and sleep the poll interval
    Clean,
    /// Sleep the backoff and grow it
    BackOff(CycleFailure),
    /// Stop with this error
    Fatal(Error),
}

/// Why a cycle backs off
#[derive(Debug)]
pub enum CycleFailure {
    /// The cycle completed but these streams failed to poll
    Streams(Vec<String>),
    /// The cycle ended early with a recoverable error
    Error(Error),
}

/// Decide how a cycle result affects the loop
///
/// Transient failures (network, corrupt archive) back off. Any other error
/// is fatal unless `ignore_malformed` is set, in which case it backs off too.
pub fn classify(result: Result<CycleReport>, ignore_malformed: bool) -> Verdict {
    match result {
        Ok(report) if report.is_clean() => Verdict::Clean,
        Ok(report) => Verdict::BackOff(CycleFailure::Streams(report.failed_streams())),
        Err(e) if e.is_transient() || ignore_malformed => Verdict::BackOff(CycleFailure::Error(e)),
        Err(e) => Verdict::Fatal(e),
    }
}

/// Long-running watcher over all configured streams
pub struct Watcher {
    config: Config,
    client: HttpClient,
    store: ArtifactStore,
    trackers: Vec<StreamTracker>,
    backoff: Backoff,
}

impl Watcher {
    /// Validate `config` and build the watcher
    ///
    /// # Errors
    /// Returns a config error for invalid settings, or an error if the HTTP
    /// client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = HttpClient::new(&config.http)?;
        let store = ArtifactStore::new(&config.output_dir);
        let trackers = config
            .streams
            .iter()
            .cloned()
            .map(StreamTracker::new)
            .collect();
        let backoff = Backoff::new(config.poll_interval, config.max_backoff);

        Ok(Self {
            config,
            client,
            store,
            trackers,
            backoff,
        })
    }

    /// Stream trackers, in processing order
    pub fn trackers(&self) -> &[StreamTracker] {
        &self.trackers
    }

    /// Current backoff state
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run every tracker once
    ///
    /// # Errors
    /// Propagates the first error a tracker could not turn into an outcome;
    /// later streams are not polled in that cycle.
    pub async fn run_cycle(&mut self, shutdown: &CancellationToken) -> Result<CycleReport> {
        let ctx = CycleContext {
            client: &self.client,
            store: &self.store,
            extract: !self.config.skip_extract,
            retry_failed_extraction: self.config.retry_failed_extraction,
            ignore_malformed: self.config.ignore_malformed,
            pointer_timeout: self.config.http.pointer_timeout,
            download_timeout: self.config.http.download_timeout,
            shutdown,
        };

        let mut report = CycleReport::default();
        for tracker in &mut self.trackers {
            if shutdown.is_cancelled() {
                break;
            }
            let outcome = tracker.poll(&ctx).await?;
            let interrupted = matches!(outcome, StreamOutcome::Interrupted);
            report.outcomes.push((tracker.name().to_string(), outcome));
            if interrupted {
                break;
            }
        }

        Ok(report)
    }

    /// Poll until `shutdown` is cancelled
    ///
    /// # Errors
    /// Returns the error of a cycle classified as [`Verdict::Fatal`].
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            streams = self.trackers.len(),
            output = ?self.config.output_dir,
            interval_secs = self.config.poll_interval.as_secs(),
            extract = !self.config.skip_extract,
            "watcher started"
        );

        loop {
            let result = self.run_cycle(&shutdown).await;

            if shutdown.is_cancelled() {
                break;
            }

            let wait = match classify(result, self.config.ignore_malformed) {
                Verdict::Clean => {
                    self.backoff.reset();
                    debug!(
                        interval_secs = self.config.poll_interval.as_secs(),
                        "cycle complete"
                    );
                    self.config.poll_interval
                }
                Verdict::BackOff(failure) => {
                    let wait = self.backoff.fail();
                    match failure {
                        CycleFailure::Streams(failed) => {
                            warn!(?failed, wait_secs = wait.as_secs(), "cycle failed, backing off");
                        }
                        CycleFailure::Error(e) => {
                            warn!(error = %e, wait_secs = wait.as_secs(), "cycle failed, backing off");
                        }
                    }
                    wait
                }
                Verdict::Fatal(e) => {
                    error!(error = %e, "unrecoverable error, stopping");
                    return Err(e);
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("watcher stopped");
        Ok(())
    }
}
