//! Service configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::downloader::models::{
    default_concurrency, default_output_dir, DownloadOptions, NetworkConfig, RetryPolicy,
};
use crate::downloader::ExtractorMode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    pub output_dir: PathBuf,
    pub max_retries: u32,
    pub retry_base_delay_secs: u64,
    /// Upper bound on concurrent playlist member downloads
    pub concurrency: usize,
    pub extractor_mode: ExtractorMode,
    /// Explicit yt-dlp binary, skips detection
    pub ytdlp_path: Option<String>,
    pub network: NetworkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            output_dir: default_output_dir(),
            max_retries: retry.max_retries,
            retry_base_delay_secs: retry.base_delay.as_secs(),
            concurrency: default_concurrency(),
            extractor_mode: ExtractorMode::default(),
            ytdlp_path: None,
            network: NetworkConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `YTD_BIND_ADDRESS`, `YTD_PORT`
    /// - `YTD_OUTPUT_DIR`
    /// - `YTD_MAX_RETRIES`, `YTD_RETRY_BASE_DELAY_SECS`, `YTD_CONCURRENCY`
    /// - `YTD_EXTRACTOR_MODE` (cli, python, auto), `YTD_YTDLP_PATH`
    /// - `YTD_PROXY`, `YTD_COOKIES_PATH`
    /// - `YTD_INFO_TIMEOUT_SECS`, `YTD_TRANSFER_TIMEOUT_SECS`, `YTD_PROBE_TIMEOUT_SECS`
    ///
    /// `YTDLP_PYTHON` picks the interpreter for python mode.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env_or_default`](Self::from_env_or_default) over any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(bind_address) = get("YTD_BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        if let Some(port) = parse(&get, "YTD_PORT", "a port number")? {
            config.port = port;
        }
        if let Some(dir) = get("YTD_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(retries) = parse(&get, "YTD_MAX_RETRIES", "a non-negative integer")? {
            config.max_retries = retries;
        }
        if let Some(secs) = parse(&get, "YTD_RETRY_BASE_DELAY_SECS", "seconds")? {
            config.retry_base_delay_secs = secs;
        }
        if let Some(concurrency) = parse::<usize, _>(&get, "YTD_CONCURRENCY", "a positive integer")? {
            if concurrency == 0 {
                return Err(ConfigError::Invalid {
                    key: "YTD_CONCURRENCY",
                    value: "0".to_string(),
                    expected: "a positive integer",
                });
            }
            config.concurrency = concurrency;
        }
        if let Some(mode) = parse(&get, "YTD_EXTRACTOR_MODE", "one of cli, python, auto")? {
            config.extractor_mode = mode;
        }
        config.ytdlp_path = get("YTD_YTDLP_PATH");

        config.network.proxy = get("YTD_PROXY");
        config.network.cookies_path = get("YTD_COOKIES_PATH");
        if let Some(secs) = parse(&get, "YTD_INFO_TIMEOUT_SECS", "seconds")? {
            config.network.info_timeout_secs = secs;
        }
        if let Some(secs) = parse(&get, "YTD_TRANSFER_TIMEOUT_SECS", "seconds")? {
            config.network.transfer_timeout_secs = secs;
        }
        if let Some(secs) = parse(&get, "YTD_PROBE_TIMEOUT_SECS", "seconds")? {
            config.network.probe_timeout_secs = secs;
        }

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_secs(self.retry_base_delay_secs),
        )
    }

    /// Base options for a request; per-request flags are layered on top
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions::default()
            .with_output_dir(self.output_dir.clone())
            .with_retry(self.retry_policy())
            .with_concurrency(self.concurrency)
    }
}

fn parse<T, G>(get: &G, key: &'static str, expected: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                key,
                value,
                expected,
            }),
    }
}
