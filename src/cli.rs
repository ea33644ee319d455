//! Command-line arguments

use clap::Parser;
use gdelt_dl::config::Config;
use gdelt_dl::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Watch GDELT GKG pointer files and download new archives as they appear
#[derive(Parser, Debug)]
#[command(name = "gdelt-dl", version, about)]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output root directory [default: data]
    #[arg(short, long, value_name = "DIR", env = "GDELT_DL_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Seconds between polls [default: 120]
    #[arg(long, value_name = "SECS", env = "GDELT_DL_INTERVAL")]
    pub interval: Option<u64>,

    /// Upper bound in seconds on the failure backoff [default: 1800]
    #[arg(long, value_name = "SECS")]
    pub max_backoff: Option<u64>,

    /// Download archives without extracting them
    #[arg(long)]
    pub skip_extract: bool,

    /// Raw archive subdirectory for the English stream [default: rawdata_en]
    #[arg(long, value_name = "DIR")]
    pub raw_subdir_eng: Option<String>,

    /// Raw archive subdirectory for the translation stream [default: rawdata_tr]
    #[arg(long, value_name = "DIR")]
    pub raw_subdir_trans: Option<String>,

    /// Extracted CSV subdirectory for the English stream [default: csv_en]
    #[arg(long, value_name = "DIR")]
    pub csv_subdir_eng: Option<String>,

    /// Extracted CSV subdirectory for the translation stream [default: csv_tr]
    #[arg(long, value_name = "DIR")]
    pub csv_subdir_trans: Option<String>,

    /// HTTP retries per request [default: 3]
    #[arg(short, long, value_name = "N")]
    pub retries: Option<u32>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep running on malformed pointers and unrecognized errors
    #[arg(long)]
    pub ignore_malformed: bool,

    /// Do not retry extraction of archives that failed to extract
    #[arg(long)]
    pub no_extract_retry: bool,
}

impl Args {
    /// Build the effective configuration: config file (or defaults), then flags
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(secs) = self.interval {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.max_backoff {
            config.max_backoff = Duration::from_secs(secs);
        }
        if let Some(retries) = self.retries {
            config.http.retry.max_attempts = retries;
        }
        if self.skip_extract {
            config.skip_extract = true;
        }
        if self.ignore_malformed {
            config.ignore_malformed = true;
        }
        if self.no_extract_retry {
            config.retry_failed_extraction = false;
        }

        for (stream, raw, csv) in [
            ("ENG", self.raw_subdir_eng, self.csv_subdir_eng),
            ("TRANS", self.raw_subdir_trans, self.csv_subdir_trans),
        ] {
            if raw.is_none() && csv.is_none() {
                continue;
            }
            let Some(target) = config.stream_mut(stream) else {
                return Err(Error::Config {
                    message: format!("no '{}' stream configured to apply subdirectories to", stream),
                    key: Some("streams".to_string()),
                });
            };
            if let Some(raw) = raw {
                target.raw_subdir = raw;
            }
            if let Some(csv) = csv {
                target.csv_subdir = csv;
            }
        }

        Ok(config)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("gdelt-dl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn no_flags_gives_defaults() {
        let config = parse(&[]).into_config().unwrap();
        let defaults = Config::default();

        assert_eq!(config.output_dir, defaults.output_dir);
        assert_eq!(config.poll_interval, Duration::from_secs(120));
        assert_eq!(config.http.retry.max_attempts, 3);
        assert!(!config.skip_extract);
        assert!(config.retry_failed_extraction);
        assert_eq!(config.streams, defaults.streams);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "-o",
            "/srv/gdelt",
            "--interval",
            "60",
            "--skip-extract",
            "-r",
            "5",
            "--ignore-malformed",
            "--no-extract-retry",
            "--max-backoff",
            "600",
            "--raw-subdir-eng",
            "raw_e",
            "--csv-subdir-trans",
            "csv_t",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/srv/gdelt"));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.max_backoff, Duration::from_secs(600));
        assert_eq!(config.http.retry.max_attempts, 5);
        assert!(config.skip_extract);
        assert!(config.ignore_malformed);
        assert!(!config.retry_failed_extraction);

        assert_eq!(config.streams[0].raw_subdir, "raw_e");
        assert_eq!(config.streams[0].csv_subdir, "csv_en");
        assert_eq!(config.streams[1].raw_subdir, "rawdata_tr");
        assert_eq!(config.streams[1].csv_subdir, "csv_t");
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"output_dir": "/from/file", "poll_interval": 300}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["-c", &path, "--interval", "30"])
            .into_config()
            .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/from/file"));
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn subdir_flag_without_matching_stream_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"streams": [{{"name": "X", "pointer_url": "http://host/p.txt", "raw_subdir": "r", "csv_subdir": "c"}}]}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let err = parse(&["-c", &path, "--raw-subdir-eng", "r2"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn invalid_interval_is_rejected_by_parser() {
        let result = Args::try_parse_from(["gdelt-dl", "--interval", "soon"]);
        assert!(result.is_err());
    }
}
