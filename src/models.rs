//! Core data types for the Latency Monitor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status label used when the backend does not provide one.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Telemetry measured on the backend host for one sample.
///
/// Every field is optional: absent values render as unavailable and are never fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedTelemetry {
    pub latency_measured: Option<f64>,
    pub jitter_measured: Option<f64>,
    pub packet_loss: Option<f64>,
    pub bandwidth: Option<f64>,
    pub signal_strength: Option<f64>,
    /// Measurement time (epoch ms) as reported by the backend
    pub timestamp: Option<i64>,
}

impl CollectedTelemetry {
    /// True when no measurement was reported at all
    pub fn is_empty(&self) -> bool {
        self.latency_measured.is_none()
            && self.jitter_measured.is_none()
            && self.packet_loss.is_none()
            && self.bandwidth.is_none()
            && self.signal_strength.is_none()
    }
}

/// One normalized observation in the rolling history.
///
/// Produced only by the normalizer; every field holds a concrete value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Epoch milliseconds.
    ///
    /// Payloads stamped in epoch seconds are taken as-is and render as
    /// January 1970; the poller logs a warning when it appends one.
    pub timestamp: i64,
    /// Predicted latency in milliseconds
    pub latency: f64,
    pub spike: bool,
    pub ddos_suspected: bool,
    pub status: String,
    pub solution: String,
    pub alternative_solutions: Vec<String>,
    /// Mitigation category chosen by the backend (e.g. "rate_limit")
    pub action_type: String,
    pub action_strength: f64,
    pub collected_telemetry: CollectedTelemetry,
}

impl Sample {
    /// Sample with every field at its documented default.
    pub fn with_defaults(timestamp: i64) -> Self {
        Sample {
            timestamp,
            latency: 0.0,
            spike: false,
            ddos_suspected: false,
            status: UNKNOWN_STATUS.to_string(),
            solution: String::new(),
            alternative_solutions: Vec::new(),
            action_type: String::new(),
            action_strength: 0.0,
            collected_telemetry: CollectedTelemetry::default(),
        }
    }

    /// Format the sample timestamp as local wall-clock time for display
    pub fn time_label(&self) -> String {
        use chrono::TimeZone;
        match chrono::Utc.timestamp_millis_opt(self.timestamp).single() {
            Some(utc) => utc
                .with_timezone(&chrono::Local)
                .format("%H:%M:%S")
                .to_string(),
            None => "--:--:--".to_string(),
        }
    }
}

/// Visual/alert classification of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Spike,
    DdosSuspected,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Normal => write!(f, "Normal"),
            AlertLevel::Spike => write!(f, "Spike"),
            AlertLevel::DdosSuspected => write!(f, "DDoS suspected"),
        }
    }
}

/// Severity of the backend's free-form status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusSeverity {
    Unknown,
    Normal,
    Degraded,
    Congested,
    Critical,
}

impl StatusSeverity {
    /// Map a backend status label; unrecognized labels are `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "normal" => StatusSeverity::Normal,
            "degraded" => StatusSeverity::Degraded,
            "network congestion" | "congestion" => StatusSeverity::Congested,
            "critical" => StatusSeverity::Critical,
            _ => StatusSeverity::Unknown,
        }
    }
}

/// Body of a `/suggest_mitigation` request. All four fields are always present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub jitter: f64,
    pub packet_loss: f64,
    pub bandwidth: f64,
    pub signal_strength: f64,
}

/// Backend-side attack simulations that can be started from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemoKind {
    Ddos,
    Ramp,
}

impl DemoKind {
    /// Endpoint path that starts this simulation
    pub fn path(&self) -> &'static str {
        match self {
            DemoKind::Ddos => "/trigger_ddos_demo",
            DemoKind::Ramp => "/trigger_ramp_attack",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DemoKind::Ddos => "ddos",
            DemoKind::Ramp => "ramp",
        }
    }
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoKind::Ddos => write!(f, "DDoS demo"),
            DemoKind::Ramp => write!(f, "Ramp attack demo"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_defaults() {
        let sample = Sample::with_defaults(1_700_000_000_000);
        assert_eq!(sample.status, "Unknown");
        assert_eq!(sample.latency, 0.0);
        assert!(!sample.spike);
        assert!(!sample.ddos_suspected);
        assert!(sample.alternative_solutions.is_empty());
        assert!(sample.collected_telemetry.is_empty());
    }

    #[test]
    fn test_status_severity_labels() {
        assert_eq!(StatusSeverity::from_label("Normal"), StatusSeverity::Normal);
        assert_eq!(
            StatusSeverity::from_label("Network Congestion"),
            StatusSeverity::Congested
        );
        assert_eq!(StatusSeverity::from_label(" critical "), StatusSeverity::Critical);
        assert_eq!(StatusSeverity::from_label("Unknown"), StatusSeverity::Unknown);
        assert_eq!(StatusSeverity::from_label("whatever"), StatusSeverity::Unknown);
        assert!(StatusSeverity::Critical > StatusSeverity::Degraded);
    }

    #[test]
    fn test_demo_paths() {
        assert_eq!(DemoKind::Ddos.path(), "/trigger_ddos_demo");
        assert_eq!(DemoKind::Ramp.path(), "/trigger_ramp_attack");
        assert_eq!(DemoKind::Ramp.as_str(), "ramp");
    }

    #[test]
    fn test_suggestion_request_wire_names() {
        let body = SuggestionRequest {
            jitter: 1.0,
            packet_loss: 2.0,
            bandwidth: 3.0,
            signal_strength: 4.0,
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json["packet_loss"], 2.0);
        assert_eq!(json["signal_strength"], 4.0);
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_time_label_out_of_range() {
        let sample = Sample::with_defaults(i64::MAX);
        assert_eq!(sample.time_label(), "--:--:--");
    }
}
