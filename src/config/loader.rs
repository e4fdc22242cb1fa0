//! Settings file loader and environment overrides.

use super::MonitorConfig;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_BACKEND: &str = "LATENCY_MONITOR_BACKEND";
pub const ENV_POLL_MS: &str = "LATENCY_MONITOR_POLL_MS";
pub const ENV_TIMEOUT_MS: &str = "LATENCY_MONITOR_TIMEOUT_MS";
pub const ENV_LOG: &str = "LATENCY_MONITOR_LOG";

/// Get the global settings path: ~/.config/latency-monitor/settings.json
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine home directory".to_string())
    })?;

    Ok(home.join(".config/latency-monitor").join("settings.json"))
}

/// Load settings from a JSON file.
///
/// A missing file yields the defaults; unreadable or malformed files are errors.
pub fn load_config_from_file(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("[Config] No settings file at {}, using defaults", path.display());
            return Ok(MonitorConfig::default());
        }
        Err(e) => return Err(ConfigError::IoError(e)),
    };

    let config: MonitorConfig = serde_json::from_str(&content)?;
    log::debug!("[Config] Loaded settings from {}", path.display());
    Ok(config)
}

/// Apply `LATENCY_MONITOR_*` overrides using the given variable lookup.
pub fn apply_env_overrides<F>(config: &mut MonitorConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(backend) = lookup(ENV_BACKEND) {
        config.backend_url = Some(backend);
    }

    if let Some(raw) = lookup(ENV_POLL_MS) {
        config.poll_interval_ms = raw.trim().parse().map_err(|_| {
            ConfigError::ValidationFailed(format!("{} must be an integer, got '{}'", ENV_POLL_MS, raw))
        })?;
    }

    if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
        let raw = raw.trim();
        config.request_timeout_ms = if raw.is_empty() || raw == "none" {
            None
        } else {
            Some(raw.parse().map_err(|_| {
                ConfigError::ValidationFailed(format!(
                    "{} must be an integer or 'none', got '{}'",
                    ENV_TIMEOUT_MS, raw
                ))
            })?)
        };
    }

    if let Some(level) = lookup(ENV_LOG) {
        config.log_level = level;
    }

    Ok(())
}

/// Load the effective configuration: defaults, settings file, then environment.
///
/// `path` overrides the global settings location.
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig, ConfigError> {
    let settings_path = match path {
        Some(p) => p.to_path_buf(),
        None => get_global_settings_path()?,
    };

    let mut config = load_config_from_file(&settings_path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
