//! Scraper configuration.
//!
//! Configuration lives in a single file next to the binary (`config.json` by
//! default). Every key is optional; keys that are present override the
//! defaults. YAML is accepted when the file ends in `.yaml` or `.yml`.
//!
//! # Example
//!
//! ```json
//! {
//!     "base_url": "https://www.ainews.com/",
//!     "csv_path": "assets/csv/ainews.csv",
//!     "json_path": "assets/json/ainews.json",
//!     "delay_between_requests": 1,
//!     "max_retries": 3,
//!     "timeout": 10,
//!     "fetch_full_content": true
//! }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Runtime options for one scraping run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Root of the site; the listing page is fetched from here.
    pub base_url: String,
    /// Tabular (CSV) dataset file.
    #[serde(alias = "tabular_path")]
    pub csv_path: PathBuf,
    /// Document (JSON) dataset file.
    #[serde(alias = "document_path")]
    pub json_path: PathBuf,
    /// Seconds between successive body requests of one lane.
    pub delay_between_requests: f64,
    /// Retries after the first failed attempt.
    pub max_retries: usize,
    /// Per-attempt request timeout in seconds.
    pub timeout: f64,
    /// Seconds to wait before each retry.
    pub retry_delay: f64,
    /// Number of lanes fetching article bodies concurrently.
    pub max_concurrent_requests: usize,
    /// Fetch each article page for its full text.
    pub fetch_full_content: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ainews.com/".to_string(),
            csv_path: PathBuf::from("assets/csv/ainews.csv"),
            json_path: PathBuf::from("assets/json/ainews.json"),
            delay_between_requests: 1.0,
            max_retries: 3,
            timeout: 10.0,
            retry_delay: 2.0,
            max_concurrent_requests: 1,
            fetch_full_content: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

impl ScraperConfig {
    /// Load the configuration at `path`, never failing.
    ///
    /// - A missing file yields the defaults, and the defaults are written to
    ///   `path` so the next run has something to edit.
    /// - An unreadable or malformed file yields the defaults with a warning.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_or_create(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            match config.save(path) {
                Ok(()) => info!("Created default configuration file"),
                Err(e) => warn!(error = %e, "Could not write default configuration file"),
            }
            return config;
        }

        match Self::load(path) {
            Ok(config) => {
                info!("Loaded configuration");
                config
            }
            Err(e) => {
                warn!(error = %e, "Error loading config file; using default configuration");
                Self::default()
            }
        }
    }

    /// Strictly parse the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match Format::for_path(path) {
            Format::Json => serde_json::from_str(&raw)?,
            Format::Yaml => serde_yaml::from_str(&raw)?,
        };
        Ok(config)
    }

    /// Write this configuration to `path` in the format its extension implies.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let body = match Format::for_path(path) {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Yaml => serde_yaml::to_string(self)?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, body).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        secs_f64(self.timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        secs_f64(self.retry_delay)
    }

    pub fn throttle(&self) -> Duration {
        secs_f64(self.delay_between_requests)
    }

    /// Lane count, never below one.
    pub fn lanes(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }
}

// Negative or NaN values from a hand-edited file mean "no delay".
fn secs_f64(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = ScraperConfig::load_or_create(&path);

        assert_eq!(config, ScraperConfig::default());
        assert!(path.exists());
        let reread = ScraperConfig::load(&path).unwrap();
        assert_eq!(reread, ScraperConfig::default());
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_retries": 7, "fetch_full_content": false}"#).unwrap();

        let config = ScraperConfig::load_or_create(&path);

        assert_eq!(config.max_retries, 7);
        assert!(!config.fetch_full_content);
        assert_eq!(config.base_url, "https://www.ainews.com/");
        assert_eq!(config.timeout, 10.0);
    }

    #[test]
    fn test_fractional_timeout_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"timeout": 2.5, "fetch_full_content": false}"#).unwrap();

        let config = ScraperConfig::load_or_create(&path);

        assert!(!config.fetch_full_content);
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_path_aliases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"tabular_path": "out/a.csv", "document_path": "out/a.json"}"#,
        )
        .unwrap();

        let config = ScraperConfig::load_or_create(&path);

        assert_eq!(config.csv_path, PathBuf::from("out/a.csv"));
        assert_eq!(config.json_path, PathBuf::from("out/a.json"));
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = ScraperConfig::load_or_create(&path);

        assert_eq!(config, ScraperConfig::default());
        // The broken file is left for the operator to fix.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "base_url: https://news.example.org/\ndelay_between_requests: 0.5\nmax_concurrent_requests: 3\n",
        )
        .unwrap();

        let config = ScraperConfig::load_or_create(&path);

        assert_eq!(config.base_url, "https://news.example.org/");
        assert_eq!(config.throttle(), Duration::from_millis(500));
        assert_eq!(config.lanes(), 3);
    }

    #[test]
    fn test_durations_clamp_bad_values() {
        let config = ScraperConfig {
            delay_between_requests: -1.0,
            retry_delay: f64::NAN,
            max_concurrent_requests: 0,
            ..ScraperConfig::default()
        };
        assert_eq!(config.throttle(), Duration::ZERO);
        assert_eq!(config.retry_delay(), Duration::ZERO);
        assert_eq!(config.lanes(), 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }
}
