//! Suggestion Fetcher
//!
//! Builds a `/suggest_mitigation` request from the selected sample's telemetry
//! and resolves the answer into the selection, subject to its staleness check.

use super::{Selection, SuggestionOutcome};
use crate::backend::BackendApi;
use crate::error::ClientError;
use crate::models::{CollectedTelemetry, SuggestionRequest};
use crate::monitor::normalizer::is_truthy;
use crate::monitor::{emit, HistoryBuffer, MonitorEvent};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shown when the backend answered without suggestions or an error
pub const NO_SUGGESTIONS_PLACEHOLDER: &str = "No suggestions returned by the backend.";

/// Request body for a sample's telemetry; absent measurements are sent as 0.
///
/// Alternate upstream names (`jitter`, `signal`) were already folded in by the
/// normalizer's telemetry chains.
pub fn build_request(telemetry: &CollectedTelemetry) -> SuggestionRequest {
    SuggestionRequest {
        jitter: telemetry.jitter_measured.unwrap_or(0.0),
        packet_loss: telemetry.packet_loss.unwrap_or(0.0),
        bandwidth: telemetry.bandwidth.unwrap_or(0.0),
        signal_strength: telemetry.signal_strength.unwrap_or(0.0),
    }
}

/// Map a backend answer (or transport failure) to a suggestion outcome
pub fn interpret_response(result: Result<Value, ClientError>) -> SuggestionOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return SuggestionOutcome::Error(e.to_string()),
    };

    match response.get("suggestions") {
        Some(Value::Array(items)) => {
            let suggestions: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if s.is_empty() => None,
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            // An empty list falls through to the error check and the placeholder
            if !suggestions.is_empty() {
                return SuggestionOutcome::Ready(suggestions);
            }
        }
        Some(Value::String(s)) if !s.is_empty() => {
            return SuggestionOutcome::Ready(vec![s.clone()]);
        }
        _ => {}
    }

    if let Some(error) = response.get("error").filter(|e| is_truthy(e)) {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return SuggestionOutcome::Error(message);
    }

    SuggestionOutcome::Ready(vec![NO_SUGGESTIONS_PLACEHOLDER.to_string()])
}

/// What happened to one suggestion request
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Resolution was applied to the selection
    Applied(SuggestionOutcome),
    /// Selection moved on before the answer arrived; answer dropped
    Stale,
    /// Nothing was open when the request was requested
    NoSelection,
}

/// Issues suggestion requests for the currently open sample
pub struct SuggestionFetcher {
    api: Arc<dyn BackendApi>,
    selection: Arc<RwLock<Selection>>,
    history: Arc<RwLock<HistoryBuffer>>,
    events: Option<mpsc::Sender<MonitorEvent>>,
}

impl SuggestionFetcher {
    pub fn new(
        api: Arc<dyn BackendApi>,
        selection: Arc<RwLock<Selection>>,
        history: Arc<RwLock<HistoryBuffer>>,
        events: Option<mpsc::Sender<MonitorEvent>>,
    ) -> Self {
        SuggestionFetcher {
            api,
            selection,
            history,
            events,
        }
    }

    /// Request suggestions for the open sample and resolve them into the selection.
    ///
    /// Calling again for the same selection supersedes the earlier request.
    pub async fn fetch(&self) -> FetchOutcome {
        let Some(ticket) = self
            .selection
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .begin_loading()
        else {
            log::debug!("[Suggest] No sample selected, nothing to request");
            return FetchOutcome::NoSelection;
        };

        let telemetry = self
            .history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(ticket.idx)
            .map(|sample| sample.collected_telemetry.clone());

        let outcome = match telemetry {
            Some(telemetry) => {
                let request = build_request(&telemetry);
                log::info!("[Suggest] Requesting suggestions for sample {}", ticket.idx);
                interpret_response(self.api.suggest_mitigation(request).await)
            }
            None => SuggestionOutcome::Error(format!(
                "Sample {} is no longer in the history",
                ticket.idx
            )),
        };

        if let SuggestionOutcome::Error(ref message) = outcome {
            log::warn!("[Suggest] Sample {}: {}", ticket.idx, message);
        }

        let applied = self
            .selection
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .resolve(ticket, outcome.clone());

        if applied {
            emit(&self.events, MonitorEvent::SuggestionsResolved { idx: ticket.idx });
            FetchOutcome::Applied(outcome)
        } else {
            FetchOutcome::Stale
        }
    }

    /// Run `fetch` as a background task
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<FetchOutcome> {
        let fetcher = Arc::clone(self);
        tokio::spawn(async move { fetcher.fetch().await })
    }
}
