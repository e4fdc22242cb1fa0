//! Backend module: HTTP access to the prediction service
//!
//! The `BackendApi` trait is the seam between the monitoring engine and the
//! network. Production code uses `BackendClient` (reqwest); tests substitute
//! scripted implementations.

pub mod client;

use crate::error::ClientError;
use crate::models::{DemoKind, SuggestionRequest};
use futures::future::BoxFuture;
use serde_json::Value;

pub use client::BackendClient;

pub const TELEMETRY_PATH: &str = "/telemetry_local";
pub const SUGGEST_PATH: &str = "/suggest_mitigation";
pub const PROBE_PATH: &str = "/telemetry_test";

/// Trait for all requests the client issues against the prediction service
///
/// Responses are returned as raw JSON: interpreting `{error}` payloads is the
/// caller's job, so only transport-level problems surface as `ClientError`.
pub trait BackendApi: Send + Sync {
    /// `GET /telemetry_local`
    fn fetch_telemetry(&self) -> BoxFuture<'static, Result<Value, ClientError>>;

    /// `POST /suggest_mitigation`
    fn suggest_mitigation(
        &self,
        request: SuggestionRequest,
    ) -> BoxFuture<'static, Result<Value, ClientError>>;

    /// `POST` to the simulation endpoint of `kind`; non-2xx answers are errors
    fn trigger_demo(&self, kind: DemoKind) -> BoxFuture<'static, Result<Value, ClientError>>;

    /// `GET /telemetry_test` connectivity check
    fn probe(&self) -> BoxFuture<'static, Result<Value, ClientError>>;
}
