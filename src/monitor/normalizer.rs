//! Sample Normalizer
//!
//! Converts a heterogeneous `/telemetry_local` (or `/telemetry_test`) response
//! into a canonical `Sample`, or a discard signal when the backend reported an
//! error.
//!
//! Every field is resolved through an ordered list of candidate keys kept in
//! [`chains`]; the first present, usable value wins and the field default
//! terminates the chain. Missing or partial data is never an error.

use crate::models::{CollectedTelemetry, Sample, UNKNOWN_STATUS};
use serde_json::{Map, Value};
use thiserror::Error;

/// Candidate keys per field, in priority order.
pub mod chains {
    /// Nested objects that may carry measured telemetry
    pub const TELEMETRY_CONTAINER: &[&str] = &["collected_telemetry", "telemetry_input"];

    pub const TIMESTAMP: &[&str] = &["timestamp"];
    /// Predicted latency; falls back to the measured latency, then 0
    pub const LATENCY: &[&str] = &["predicted_latency", "predictedLatency"];
    pub const SPIKE: &[&str] = &["spike"];
    pub const DDOS_SUSPECTED: &[&str] = &["ddos_suspected", "ddosSuspected"];
    pub const STATUS: &[&str] = &["status"];
    pub const SOLUTION: &[&str] = &["solution"];
    pub const ALTERNATIVE_SOLUTIONS: &[&str] = &["alternative_solutions", "alternativeSolutions"];
    pub const ACTION_TYPE: &[&str] = &["action_type"];
    pub const ACTION_STRENGTH: &[&str] = &["action_strength"];

    // Keys inside the telemetry container
    pub const LATENCY_MEASURED: &[&str] = &["latency_measured", "latencyMeasured", "latency"];
    pub const JITTER_MEASURED: &[&str] = &["jitter_measured", "jitterMeasured", "jitter"];
    pub const PACKET_LOSS: &[&str] = &["packet_loss", "packetLoss"];
    pub const BANDWIDTH: &[&str] = &["bandwidth"];
    pub const SIGNAL_STRENGTH: &[&str] = &["signal_strength", "signalStrength", "signal"];
    pub const TELEMETRY_TIMESTAMP: &[&str] = &["timestamp"];
}

/// Why a response produced no sample
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscardReason {
    #[error("backend reported error: {0}")]
    BackendError(String),

    #[error("response is not a JSON object")]
    NotAnObject,
}

/// Current client time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Loose truthiness: null, false, 0, NaN and "" are false; everything else is true
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First non-null value among `keys`
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !value.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// First candidate that parses as a finite number
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(as_number)
}

fn bool_field(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    first_present(obj, keys).map_or(false, is_truthy)
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
}

fn string_list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    match first_present(obj, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Below this, a timestamp is more plausibly epoch seconds than milliseconds
const SECONDS_CUTOFF_MS: i64 = 100_000_000_000;

/// True when `timestamp` looks like epoch seconds (1973 or earlier as milliseconds)
pub fn looks_like_epoch_seconds(timestamp: i64) -> bool {
    timestamp > 0 && timestamp < SECONDS_CUTOFF_MS
}

fn timestamp_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    number_field(obj, keys).map(|ms| ms.round() as i64)
}

/// Extract the measured telemetry record; absent fields stay `None`
pub fn normalize_telemetry(response: &Map<String, Value>) -> CollectedTelemetry {
    let container = chains::TELEMETRY_CONTAINER
        .iter()
        .filter_map(|key| response.get(*key))
        .find_map(Value::as_object);

    let Some(obj) = container else {
        return CollectedTelemetry::default();
    };

    CollectedTelemetry {
        latency_measured: number_field(obj, chains::LATENCY_MEASURED),
        jitter_measured: number_field(obj, chains::JITTER_MEASURED),
        packet_loss: number_field(obj, chains::PACKET_LOSS),
        bandwidth: number_field(obj, chains::BANDWIDTH),
        signal_strength: number_field(obj, chains::SIGNAL_STRENGTH),
        timestamp: timestamp_field(obj, chains::TELEMETRY_TIMESTAMP),
    }
}

/// Normalize one backend response into a `Sample`.
///
/// `received_at_ms` is the client receipt time, used when no timestamp is reported.
/// Pure: no logging, no buffer access.
pub fn normalize(response: &Value, received_at_ms: i64) -> Result<Sample, DiscardReason> {
    let obj = response.as_object().ok_or(DiscardReason::NotAnObject)?;

    if let Some(error) = obj.get("error").filter(|e| is_truthy(e)) {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(DiscardReason::BackendError(message));
    }

    let telemetry = normalize_telemetry(obj);

    let timestamp = timestamp_field(obj, chains::TIMESTAMP)
        .or(telemetry.timestamp)
        .unwrap_or(received_at_ms);

    let latency = number_field(obj, chains::LATENCY)
        .or(telemetry.latency_measured)
        .unwrap_or(0.0);

    Ok(Sample {
        timestamp,
        latency,
        spike: bool_field(obj, chains::SPIKE),
        ddos_suspected: bool_field(obj, chains::DDOS_SUSPECTED),
        status: string_field(obj, chains::STATUS).unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        solution: string_field(obj, chains::SOLUTION).unwrap_or_default(),
        alternative_solutions: string_list_field(obj, chains::ALTERNATIVE_SOLUTIONS),
        action_type: string_field(obj, chains::ACTION_TYPE).unwrap_or_default(),
        action_strength: number_field(obj, chains::ACTION_STRENGTH).unwrap_or(0.0),
        collected_telemetry: telemetry,
    })
}
