//! Latency Monitor
//!
//! Real-time client for a network latency prediction service. It polls the
//! backend for telemetry and predictions, keeps a rolling history of samples,
//! flags spikes and suspected DDoS activity, fetches mitigation suggestions for
//! any historical sample and can trigger the backend's attack simulations.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures (`Sample`, telemetry, alert levels)
//! - **config**: Settings file, environment overrides and validation
//! - **backend**: `BackendApi` seam and the reqwest client
//! - **monitor**: Normalizer, history buffer, alert derivation and poller
//! - **selection**: Detail-view state machine and suggestion fetcher
//! - **demo**: Attack simulation triggers
//! - **log_collector**: Disk + UI logging pipeline
//! - **ui**: Controller and egui frontend

// Core foundational modules
pub mod error;
pub mod models;

pub mod config;
pub mod backend;

// Monitoring engine
pub mod monitor;
pub mod selection;
pub mod demo;

// Robust, decoupled logging system
pub mod log_collector;

// UI controller and egui integration
pub mod ui;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, ClientError, ConfigError, PollerError, Result};

pub use models::{AlertLevel, CollectedTelemetry, DemoKind, Sample, StatusSeverity, SuggestionRequest};

pub use config::{load_config, MonitorConfig, OverlapPolicy};

pub use backend::{BackendApi, BackendClient};

pub use monitor::{
    banner_active, classify, normalize, HistoryBuffer, MonitorEvent, PollOutcome, Poller,
    PollerState, HISTORY_CAPACITY,
};

pub use selection::{Selection, SelectionState, SuggestionFetcher};

pub use demo::{DemoTrigger, TriggerOutcome};

pub use ui::MonitorController;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        let _: Result<i32> = Ok(42);
    }

    #[test]
    fn test_models_reexport() {
        assert_eq!(classify(&Sample::with_defaults(0)), AlertLevel::Normal);
        assert_eq!(HISTORY_CAPACITY, 120);
    }
}
