//! Watcher configuration pointed at a mock GDELT server

use super::fixtures::{ENG_POINTER_PATH, TRANS_POINTER_PATH};
use gdelt_dl::config::{RetryConfig, StreamConfig};
use gdelt_dl::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// English and translation streams served by `server`, output under `root`
///
/// Retries are fast and few so failure paths finish quickly.
pub fn test_config(server: &MockServer, root: &Path) -> Config {
    let mut config = Config {
        output_dir: root.to_path_buf(),
        poll_interval: Duration::from_millis(50),
        max_backoff: Duration::from_millis(400),
        ..Config::default()
    };

    config.http.pointer_timeout = Duration::from_secs(5);
    config.http.download_timeout = Duration::from_secs(5);
    config.http.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 2.0,
        jitter: false,
    };

    config.streams = vec![
        StreamConfig {
            pointer_url: format!("{}{}", server.uri(), ENG_POINTER_PATH),
            ..StreamConfig::english()
        },
        StreamConfig {
            pointer_url: format!("{}{}", server.uri(), TRANS_POINTER_PATH),
            ..StreamConfig::translation()
        },
    ];

    config
}
