//! Pointer file resolution
//!
//! GDELT publishes a small text "pointer" file per stream. Each line is
//! `<size> <hash> <url>`; the line whose URL ends with the GKG archive suffix
//! names the newest artifact.

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::types::ArtifactRef;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Find the URL of the first line ending with `suffix`
///
/// Lines are trimmed; blank lines are ignored. The URL is the last
/// whitespace-separated token of the matching line.
pub fn find_artifact_url<'a>(body: &'a str, suffix: &str) -> Option<&'a str> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| line.ends_with(suffix))
        .and_then(|line| line.split_whitespace().next_back())
}

/// Fetch a pointer file and resolve the artifact it names
///
/// Returns `Ok(None)` when the pointer has no line for `suffix`.
///
/// # Errors
/// - [`Error::Request`] if the pointer could not be fetched
/// - [`Error::MalformedPointer`] if the matching line holds an unusable URL
pub async fn resolve(
    client: &HttpClient,
    pointer_url: &str,
    suffix: &str,
    timeout: Duration,
    shutdown: &CancellationToken,
) -> Result<Option<ArtifactRef>> {
    let body = client.get_text(pointer_url, timeout, shutdown).await?;

    let Some(url) = find_artifact_url(&body, suffix) else {
        debug!(pointer_url, suffix, "pointer has no matching line");
        return Ok(None);
    };

    let artifact = ArtifactRef::from_url(url).map_err(|e| match e {
        Error::MalformedPointer { reason, .. } => Error::MalformedPointer {
            url: pointer_url.to_string(),
            reason,
        },
        other => other,
    })?;

    debug!(pointer_url, artifact = %artifact.filename, "resolved pointer");
    Ok(Some(artifact))
}
