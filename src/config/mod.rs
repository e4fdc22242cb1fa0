//! Configuration module for the monitoring client.
//!
//! # Module Structure
//!
//! - `loader`: Reads `settings.json`, applies environment overrides, validates
//!
//! # Configuration Flow
//!
//! 1. `MonitorConfig::default()` supplies polling defaults
//! 2. The settings file (if present) overrides them
//! 3. `LATENCY_MONITOR_*` environment variables override the file
//! 4. Validation resolves the backend address; there is no built-in host

pub mod loader;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use loader::{get_global_settings_path, load_config, load_config_from_file};

/// Fixed poll cadence of the telemetry timer.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;

/// Upper bound on any single backend request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// What the poller does when a tick fires while the previous fetch is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Skip the tick; buffer order equals issuance order
    SingleFlight,
    /// Issue anyway; buffer order equals resolution order
    AllowOverlap,
}

impl Default for OverlapPolicy {
    fn default() -> Self {
        OverlapPolicy::SingleFlight
    }
}

/// Runtime settings for the monitoring client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Base URL of the prediction backend, e.g. `http://192.168.1.20:5000`
    pub backend_url: Option<String>,
    pub poll_interval_ms: u64,
    /// `None` leaves requests unbounded
    pub request_timeout_ms: Option<u64>,
    pub overlap_policy: OverlapPolicy,
    pub log_level: String,
    pub logs_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            backend_url: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: Some(DEFAULT_REQUEST_TIMEOUT_MS),
            overlap_policy: OverlapPolicy::SingleFlight,
            log_level: "info".to_string(),
            logs_dir: None,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Validated backend base URL without a trailing slash
    pub fn backend_base(&self) -> Result<String, ConfigError> {
        let raw = self
            .backend_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingBackend)?;

        let url = reqwest::Url::parse(raw)
            .map_err(|e| ConfigError::InvalidBackendUrl(format!("{}: {}", raw, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidBackendUrl(format!(
                "{}: scheme must be http or https",
                raw
            )));
        }
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidBackendUrl(format!("{}: missing host", raw)));
        }

        Ok(raw.trim_end_matches('/').to_string())
    }

    /// Parsed log level; unknown names fall back to `Info`
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Directory for persisted logs (defaults to `./logs`)
    pub fn logs_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.logs_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join("logs")),
        }
    }

    /// Check everything that can be checked without touching the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend_base()?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "request_timeout_ms must be greater than zero (omit it to disable)".to_string(),
            ));
        }
        Ok(())
    }
}
