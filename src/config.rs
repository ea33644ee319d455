//! Configuration types for gdelt-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// English GKG pointer file
pub const ENGLISH_POINTER_URL: &str = "http://data.gdeltproject.org/gdeltv2/lastupdate.txt";

/// Machine-translated GKG pointer file
pub const TRANSLATION_POINTER_URL: &str =
    "http://data.gdeltproject.org/gdeltv2/lastupdate-translation.txt";

/// Suffix identifying the GKG archive line in a pointer file
pub const GKG_ARCHIVE_SUFFIX: &str = ".gkg.csv.zip";

/// Top-level watcher configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root of the output tree (default: "data")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Sleep between clean poll cycles (default: 120 seconds)
    ///
    /// Also the base of the failure backoff.
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Upper bound on the failure backoff (default: 1800 seconds)
    #[serde(default = "default_max_backoff", with = "duration_serde")]
    pub max_backoff: Duration,

    /// Download archives only, never extract
    #[serde(default)]
    pub skip_extract: bool,

    /// Keep running on malformed pointer content and unrecognized errors
    #[serde(default)]
    pub ignore_malformed: bool,

    /// Retry extraction of archives whose extraction failed on a later cycle
    /// (default: true)
    #[serde(default = "default_true")]
    pub retry_failed_extraction: bool,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Streams to track, polled in this order every cycle
    #[serde(default = "default_streams")]
    pub streams: Vec<StreamConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            poll_interval: default_poll_interval(),
            max_backoff: default_max_backoff(),
            skip_extract: false,
            ignore_malformed: false,
            retry_failed_extraction: true,
            http: HttpConfig::default(),
            streams: default_streams(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Check the configuration for values the watcher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::config("poll_interval", "must be greater than zero"));
        }
        if self.max_backoff.is_zero() {
            return Err(Error::config("max_backoff", "must be greater than zero"));
        }
        if self.http.pool_size == 0 {
            return Err(Error::config("http.pool_size", "must be greater than zero"));
        }
        if self.streams.is_empty() {
            return Err(Error::config("streams", "at least one stream is required"));
        }

        let mut names = HashSet::new();
        for stream in &self.streams {
            if !names.insert(stream.name.as_str()) {
                return Err(Error::config(
                    "streams",
                    format!("duplicate stream name '{}'", stream.name),
                ));
            }
            stream.validate()?;
        }

        Ok(())
    }

    /// Look up a stream by name
    pub fn stream_mut(&mut self, name: &str) -> Option<&mut StreamConfig> {
        self.streams.iter_mut().find(|s| s.name == name)
    }
}

/// One tracked pointer endpoint and its destination layout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Short identifier used in logs (e.g. "ENG")
    pub name: String,

    /// Pointer file URL
    pub pointer_url: String,

    /// Subdirectory (under `<output>/<year>/`) for raw archives
    pub raw_subdir: String,

    /// Subdirectory (under `<output>/<year>/`) for extracted files
    pub csv_subdir: String,

    /// Pointer lines ending with this suffix name the artifact
    /// (default: ".gkg.csv.zip")
    #[serde(default = "default_archive_suffix")]
    pub archive_suffix: String,
}

impl StreamConfig {
    /// The English GKG stream
    pub fn english() -> Self {
        Self {
            name: "ENG".to_string(),
            pointer_url: ENGLISH_POINTER_URL.to_string(),
            raw_subdir: "rawdata_en".to_string(),
            csv_subdir: "csv_en".to_string(),
            archive_suffix: default_archive_suffix(),
        }
    }

    /// The machine-translated GKG stream
    pub fn translation() -> Self {
        Self {
            name: "TRANS".to_string(),
            pointer_url: TRANSLATION_POINTER_URL.to_string(),
            raw_subdir: "rawdata_tr".to_string(),
            csv_subdir: "csv_tr".to_string(),
            archive_suffix: default_archive_suffix(),
        }
    }

    fn validate(&self) -> Result<()> {
        let key = |field: &str| format!("streams.{}.{}", self.name, field);

        if self.name.trim().is_empty() {
            return Err(Error::config("streams.name", "must not be empty"));
        }
        for (field, value) in [
            ("raw_subdir", &self.raw_subdir),
            ("csv_subdir", &self.csv_subdir),
            ("archive_suffix", &self.archive_suffix),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config(&key(field), "must not be empty"));
            }
        }
        if url::Url::parse(&self.pointer_url).is_err() {
            return Err(Error::config(
                &key("pointer_url"),
                format!("'{}' is not an absolute URL", self.pointer_url),
            ));
        }
        Ok(())
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for pointer file requests (default: 15 seconds)
    #[serde(default = "default_pointer_timeout", with = "duration_serde")]
    pub pointer_timeout: Duration,

    /// Whole-transfer timeout for archive requests (default: 120 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// TCP connect timeout (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Idle connections kept per host (default: 4)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            pointer_timeout: default_pointer_timeout(),
            download_timeout: default_download_timeout(),
            connect_timeout: default_connect_timeout(),
            pool_size: default_pool_size(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry behavior for a single HTTP request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(120)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(1800)
}

fn default_streams() -> Vec<StreamConfig> {
    vec![StreamConfig::english(), StreamConfig::translation()]
}

fn default_archive_suffix() -> String {
    GKG_ARCHIVE_SUFFIX.to_string()
}

fn default_true() -> bool {
    true
}

fn default_pointer_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_pool_size() -> usize {
    4
}

fn default_user_agent() -> String {
    format!("gdelt-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
