//! Shared HTTP client
//!
//! One pooled `reqwest` client serves every pointer poll and archive download.
//! Both GDELT endpoints live on the same host, so a small idle pool per host
//! keeps connections warm across cycles.

use crate::config::{HttpConfig, RetryConfig};
use crate::error::{Error, RequestError, Result};
use crate::retry::with_retry;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP client with a bounded per-request retry policy
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    retry: RetryConfig,
}

impl HttpClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns error if the underlying client cannot be created (TLS backend
    /// initialization failure)
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_size)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            inner,
            retry: config.retry.clone(),
        })
    }

    /// GET `url`, retrying transport failures and 500/502/503/504
    ///
    /// Returns the response only for a 2xx status; the body has not been
    /// read yet. Any other status, or exhaustion of the retry budget, is a
    /// [`RequestError`]. Cancelling `shutdown` abandons the request and any
    /// pending retry with [`RequestError::Cancelled`] or the last failure.
    pub async fn get(
        &self,
        url: &str,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> std::result::Result<reqwest::Response, RequestError> {
        with_retry(&self.retry, shutdown, || self.get_once(url, timeout, shutdown)).await
    }

    /// GET `url` and read the body as text
    pub async fn get_text(
        &self,
        url: &str,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> std::result::Result<String, RequestError> {
        let response = self.get(url, timeout, shutdown).await?;
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(cancelled(url)),
            text = response.text() => text.map_err(|source| RequestError::Transport {
                url: url.to_string(),
                source,
            }),
        }
    }

    async fn get_once(
        &self,
        url: &str,
        timeout: Duration,
        shutdown: &CancellationToken,
    ) -> std::result::Result<reqwest::Response, RequestError> {
        debug!(url, "GET");

        let request = self.inner.get(url).timeout(timeout).send();
        let response = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(cancelled(url)),
            sent = request => sent.map_err(|source| RequestError::Transport {
                url: url.to_string(),
                source,
            })?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn cancelled(url: &str) -> RequestError {
    RequestError::Cancelled {
        url: url.to_string(),
    }
}
