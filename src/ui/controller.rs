//! MonitorController: single owner of the application state
//!
//! Holds the history, selection, poller, suggestion fetcher and demo trigger
//! behind one object so the UI (and tests) drive everything through explicit
//! operations instead of shared globals.

use crate::backend::{BackendApi, BackendClient};
use crate::config::MonitorConfig;
use crate::demo::{DemoTrigger, TriggerOutcome};
use crate::error::AppError;
use crate::models::{DemoKind, Sample};
use crate::monitor::history::LatencyStats;
use crate::monitor::normalizer::{normalize, now_ms};
use crate::monitor::poller::PollerSettings;
use crate::monitor::{banner_active, HistoryBuffer, MonitorEvent, PollOutcome, Poller, PollerState};
use crate::selection::{FetchOutcome, Selection, SelectionState, SuggestionFetcher};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct MonitorController {
    /// Backend access shared by every component
    pub api: Arc<dyn BackendApi>,
    /// Rolling history; written only by the poller
    pub history: Arc<RwLock<HistoryBuffer>>,
    /// Detail-view state; written by operator actions and suggestion resolutions
    pub selection: Arc<RwLock<Selection>>,
    poller: Poller,
    suggestions: Arc<SuggestionFetcher>,
    demo: DemoTrigger,
}

impl MonitorController {
    /// Wire all components around `api`
    pub fn new(
        api: Arc<dyn BackendApi>,
        settings: PollerSettings,
        events: Option<mpsc::Sender<MonitorEvent>>,
    ) -> Self {
        let history = Arc::new(RwLock::new(HistoryBuffer::new()));
        let selection = Arc::new(RwLock::new(Selection::new()));

        let poller = Poller::new(Arc::clone(&api), Arc::clone(&history), settings, events.clone());
        let suggestions = Arc::new(SuggestionFetcher::new(
            Arc::clone(&api),
            Arc::clone(&selection),
            Arc::clone(&history),
            events.clone(),
        ));
        let demo = DemoTrigger::new(Arc::clone(&api), events);

        MonitorController {
            api,
            history,
            selection,
            poller,
            suggestions,
            demo,
        }
    }

    /// Production wiring: reqwest client built from validated settings
    pub fn from_config(
        config: &MonitorConfig,
        events: Option<mpsc::Sender<MonitorEvent>>,
    ) -> Result<Self, AppError> {
        let client = BackendClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), PollerSettings::from(config), events))
    }

    // ---- polling --------------------------------------------------------

    pub fn start(&self) -> Result<(), AppError> {
        self.poller.start()?;
        Ok(())
    }

    pub fn pause(&self) -> Result<(), AppError> {
        self.poller.pause()?;
        Ok(())
    }

    pub fn resume(&self) -> Result<(), AppError> {
        self.poller.resume()?;
        Ok(())
    }

    /// Pause/Resume button; returns the new state
    pub fn toggle_pause(&self) -> Result<PollerState, AppError> {
        Ok(self.poller.toggle_pause()?)
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    /// Stop polling for good. Idempotent.
    pub fn teardown(&self) {
        self.poller.teardown();
    }

    /// One out-of-band poll (same path as a timer tick)
    pub async fn poll_once(&self) -> PollOutcome {
        self.poller.poll_once().await
    }

    // ---- history --------------------------------------------------------

    /// Copy of the history in display order
    pub fn snapshot(&self) -> Vec<Sample> {
        self.history.read().unwrap_or_else(|e| e.into_inner()).snapshot()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .latest()
            .cloned()
    }

    pub fn latency_stats(&self) -> Option<LatencyStats> {
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .latency_stats()
    }

    /// Persistent DDoS banner condition
    pub fn banner_active(&self) -> bool {
        banner_active(&self.history.read().unwrap_or_else(|e| e.into_inner()))
    }

    // ---- selection ------------------------------------------------------

    /// Open the detail view for the sample at `idx` (history order)
    pub fn select_point(&self, idx: usize) -> Result<(), String> {
        let len = self.history.read().unwrap_or_else(|e| e.into_inner()).len();
        if idx >= len {
            return Err(format!("No sample at index {} (history has {})", idx, len));
        }
        self.selection.write().unwrap_or_else(|e| e.into_inner()).open(idx);
        Ok(())
    }

    pub fn close_detail(&self) {
        self.selection.write().unwrap_or_else(|e| e.into_inner()).close();
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .state()
            .clone()
    }

    /// Sample currently shown in the detail view
    pub fn selected_sample(&self) -> Option<Sample> {
        let idx = self
            .selection
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .open_index()?;
        self.history
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(idx)
            .cloned()
    }

    /// Fetch suggestions for the open sample and wait for the result
    pub async fn fetch_suggestions(&self) -> FetchOutcome {
        self.suggestions.fetch().await
    }

    /// Fetch suggestions in the background; `None` when nothing is selected
    pub fn request_suggestions(&self) -> Option<JoinHandle<FetchOutcome>> {
        if !self.selection.read().unwrap_or_else(|e| e.into_inner()).is_open() {
            return None;
        }
        Some(self.suggestions.spawn())
    }

    // ---- demo triggers --------------------------------------------------

    /// Fire a simulation in the background; returns false when suppressed
    pub fn trigger_demo(&self, kind: DemoKind) -> bool {
        self.demo.spawn(kind).is_some()
    }

    /// Fire a simulation and wait for the acknowledgement
    pub async fn run_demo(&self, kind: DemoKind) -> TriggerOutcome {
        self.demo.trigger(kind).await
    }

    pub fn demo_in_flight(&self) -> bool {
        self.demo.is_in_flight()
    }

    // ---- startup --------------------------------------------------------

    /// Connectivity check against `/telemetry_test`.
    ///
    /// The canned payload is normalized to prove the data shape; it is never
    /// appended to the history.
    pub async fn probe(&self) -> Result<Sample, AppError> {
        let response = self.api.probe().await?;
        let sample =
            normalize(&response, now_ms()).map_err(|reason| AppError::Reported(reason.to_string()))?;
        log::info!(
            "[Controller] Backend probe ok: latency={:.1}ms status={}",
            sample.latency,
            sample.status
        );
        Ok(sample)
    }
}

impl Drop for MonitorController {
    fn drop(&mut self) {
        self.teardown();
    }
}
