//! Archive extraction
//!
//! GKG artifacts are single-entry ZIP archives. Decompression is CPU and
//! disk bound, so it runs on tokio's blocking pool.

mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use zip::ZipExtractor;

use crate::error::ExtractError;
use std::path::{Path, PathBuf};

/// Extract `archive_path` into `dest_path` without blocking the runtime
///
/// Returns the paths of the files written.
pub async fn extract_archive(
    archive_path: &Path,
    dest_path: &Path,
) -> Result<Vec<PathBuf>, ExtractError> {
    let archive = archive_path.to_path_buf();
    let dest = dest_path.to_path_buf();

    tokio::task::spawn_blocking(move || ZipExtractor::extract(&archive, &dest))
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))?
}
