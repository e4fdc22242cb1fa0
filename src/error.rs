//! Unified error type hierarchy for the Latency Monitor
//!
//! Provides structured error handling with ClientError, ConfigError, PollerError
//! and AppError.
//!
//! Backend-reported `{error}` payloads are deliberately absent here: they arrive
//! as well-formed JSON and are interpreted by the normalizer and the suggestion
//! fetcher, never raised as transport errors.

use std::io;
use thiserror::Error;

/// HTTP transport errors talking to the prediction backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Malformed response body (HTTP {status}): {reason}")]
    InvalidBody { status: u16, reason: String },

    #[error("Backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No backend address configured (set LATENCY_MONITOR_BACKEND or backend_url in settings.json)")]
    MissingBackend,

    #[error("Invalid backend URL: {0}")]
    InvalidBackendUrl(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Poller lifecycle misuse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerError {
    #[error("Poller is already running")]
    AlreadyRunning,

    #[error("Poller has been torn down")]
    TornDown,

    #[error("Poller is not running")]
    NotRunning,
}

/// Global error type surfaced to the operator.
///
/// Provides unified error categorization and user-facing messages.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Request to the backend failed at the transport level
    #[error("Backend error: {0}")]
    Backend(#[from] ClientError),

    /// Backend answered with an explicit error field
    #[error("Backend reported: {0}")]
    Reported(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Poller lifecycle error
    #[error("Poller error: {0}")]
    Poller(#[from] PollerError),

    /// Log pipeline could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),
}

impl AppError {
    /// Get a user-facing error message suitable for UI display
    pub fn user_message(&self) -> String {
        match self {
            AppError::Backend(ClientError::Timeout) => {
                "The backend did not answer in time".to_string()
            }
            AppError::Backend(e) => format!("Could not reach the backend: {}", e),
            AppError::Reported(msg) => format!("Backend error: {}", msg),
            AppError::Config(msg) => format!("Configuration problem: {}", msg),
            AppError::Poller(e) => format!("Polling unavailable: {}", e),
            AppError::Logging(msg) => format!("Failed to initialize logging: {}", msg),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
