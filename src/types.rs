//! Core types for gdelt-dl

use crate::error::{Error, Result};
use std::path::PathBuf;

/// A published archive named by a pointer file
///
/// Produced once per poll and consumed immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Absolute download URL
    pub url: String,
    /// Last path segment of the URL (e.g. "20250724144500.gkg.csv.zip")
    pub filename: String,
    /// First four characters of the filename (e.g. "2025")
    pub year: String,
}

impl ArtifactRef {
    /// Derive the filename and year partition from an artifact URL
    ///
    /// The year is not validated beyond being four characters long; GDELT
    /// filenames start with a `YYYYMMDDHHMMSS` timestamp.
    ///
    /// # Errors
    /// [`Error::MalformedPointer`] if the URL is not absolute or its last
    /// segment is shorter than four characters.
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url).map_err(|e| Error::MalformedPointer {
            url: url.to_string(),
            reason: format!("invalid artifact URL: {}", e),
        })?;

        let filename = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        let year: String = filename.chars().take(4).collect();
        if year.chars().count() < 4 {
            return Err(Error::MalformedPointer {
                url: url.to_string(),
                reason: format!("artifact filename '{}' has no year prefix", filename),
            });
        }

        Ok(Self {
            url: url.to_string(),
            filename,
            year,
        })
    }
}

/// Where an artifact lives on disk
///
/// Derived from an [`ArtifactRef`] and static configuration; has no identity
/// of its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `<output>/<year>/<raw_subdir>/<filename>`
    pub archive_path: PathBuf,
    /// `<output>/<year>/<csv_subdir>`
    pub extract_dir: PathBuf,
}

/// What happened to an artifact's extraction step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extraction {
    /// Extraction is disabled
    Skipped,
    /// Archive unpacked; number of files written
    Extracted(usize),
    /// Archive could not be unpacked; it stays on disk
    Failed,
}

/// Terminal result of one stream within one cycle
#[derive(Debug)]
pub enum StreamOutcome {
    /// Pointer could not be fetched (already retried by the client)
    PollFailed(Error),
    /// Pointer named no usable artifact
    NoNewArtifact,
    /// Newest artifact was already handled
    AlreadySeen {
        /// Artifact filename
        name: String,
    },
    /// Archive transfer failed; retried next cycle
    DownloadFailed {
        /// Artifact filename
        name: String,
    },
    /// Artifact handled and marked seen
    Done {
        /// Artifact filename
        name: String,
        /// False when the archive was already on disk
        downloaded: bool,
        /// Extraction result
        extraction: Extraction,
    },
    /// Shutdown was requested before the stream finished; no state changed
    Interrupted,
}

impl StreamOutcome {
    /// True for a failure that should make the scheduler back off
    pub fn is_cycle_failure(&self) -> bool {
        matches!(self, StreamOutcome::PollFailed(e) if e.is_transient())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;

    #[test]
    fn year_is_first_four_characters_of_filename() {
        let artifact =
            ArtifactRef::from_url("http://host/gdeltv2/20250724144500.gkg.csv.zip").unwrap();
        assert_eq!(artifact.filename, "20250724144500.gkg.csv.zip");
        assert_eq!(artifact.year, "2025");
        assert_eq!(artifact.url, "http://host/gdeltv2/20250724144500.gkg.csv.zip");
    }

    #[test]
    fn translation_filename_partitions_by_year() {
        let artifact = ArtifactRef::from_url(
            "http://data.gdeltproject.org/gdeltv2/20241231234500.translation.gkg.csv.zip",
        )
        .unwrap();
        assert_eq!(artifact.filename, "20241231234500.translation.gkg.csv.zip");
        assert_eq!(artifact.year, "2024");
    }

    #[test]
    fn relative_url_is_malformed() {
        let result = ArtifactRef::from_url("gdeltv2/20250724144500.gkg.csv.zip");
        assert!(matches!(result, Err(Error::MalformedPointer { .. })));
    }

    #[test]
    fn short_filename_is_malformed() {
        let result = ArtifactRef::from_url("http://host/abc");
        assert!(matches!(result, Err(Error::MalformedPointer { .. })));

        let result = ArtifactRef::from_url("http://host/");
        assert!(matches!(result, Err(Error::MalformedPointer { .. })));
    }

    #[test]
    fn only_transient_poll_failures_count_against_the_cycle() {
        let failed = StreamOutcome::PollFailed(Error::Request(RequestError::Status {
            url: "http://host/lastupdate.txt".to_string(),
            status: 503,
        }));
        assert!(failed.is_cycle_failure());

        assert!(!StreamOutcome::NoNewArtifact.is_cycle_failure());
        assert!(
            !StreamOutcome::DownloadFailed {
                name: "x.zip".to_string()
            }
            .is_cycle_failure()
        );
    }
}
