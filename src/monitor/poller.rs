//! Poller
//!
//! Timer-driven scheduler that fetches `/telemetry_local`, normalizes the
//! response and appends it to the shared `HistoryBuffer`.
//!
//! Lifecycle: `Stopped -> Running <-> Paused -> Stopped` (terminal after teardown).
//!
//! - Start performs one immediate fetch, then ticks every interval (3000 ms).
//! - Pause does NOT suspend the timer: paused ticks are no-ops, so resuming
//!   lands on the existing tick grid rather than restarting the interval.
//! - Each tick runs its fetch as a separate task. With `OverlapPolicy::SingleFlight`
//!   a tick is skipped while a fetch is pending; with `AllowOverlap` fetches may
//!   overlap and samples land in resolution order.
//! - Teardown cancels the timer only. A fetch still in flight resolves, but its
//!   result is dropped.
//!
//! Failures (transport or `{error}` payloads) are logged and never stop the timer.

use super::alert::{banner_active, classify, BannerTracker, BannerTransition};
use super::history::HistoryBuffer;
use super::normalizer::{looks_like_epoch_seconds, normalize, now_ms, DiscardReason};
use super::{emit, MonitorEvent};
use crate::backend::BackendApi;
use crate::config::{MonitorConfig, OverlapPolicy, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{ClientError, PollerError};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Poller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollerState::Stopped => write!(f, "Stopped"),
            PollerState::Running => write!(f, "Live"),
            PollerState::Paused => write!(f, "Paused"),
        }
    }
}

/// Result of one fetch/normalize/append cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Sample appended; carries the new history length
    Appended(usize),
    /// Backend answered with an error indicator or a non-object body
    Discarded(DiscardReason),
    /// Request failed at the transport level
    TransportFailed(ClientError),
    /// Another fetch was still pending (single-flight)
    SkippedInFlight,
    /// Result arrived after teardown and was dropped
    Cancelled,
}

/// Timing and overlap settings for the poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    pub interval: Duration,
    pub overlap: OverlapPolicy,
}

impl Default for PollerSettings {
    fn default() -> Self {
        PollerSettings {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            overlap: OverlapPolicy::SingleFlight,
        }
    }
}

impl From<&MonitorConfig> for PollerSettings {
    fn from(config: &MonitorConfig) -> Self {
        PollerSettings {
            interval: config.poll_interval(),
            overlap: config.overlap_policy,
        }
    }
}

/// State shared between the poller handle, its timer task and fetch tasks
struct PollerShared {
    api: Arc<dyn BackendApi>,
    history: Arc<RwLock<HistoryBuffer>>,
    state: RwLock<PollerState>,
    overlap: OverlapPolicy,
    in_flight: AtomicUsize,
    torn_down: AtomicBool,
    banner: Mutex<BannerTracker>,
    events: Option<mpsc::Sender<MonitorEvent>>,
}

/// Decrements the in-flight counter when a fetch finishes, whatever the outcome
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl PollerShared {
    fn state(&self) -> PollerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: PollerState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn acquire_slot(&self) -> Option<InFlightGuard<'_>> {
        match self.overlap {
            OverlapPolicy::SingleFlight => self
                .in_flight
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .ok()
                .map(|_| InFlightGuard(&self.in_flight)),
            OverlapPolicy::AllowOverlap => {
                self.in_flight.fetch_add(1, Ordering::AcqRel);
                Some(InFlightGuard(&self.in_flight))
            }
        }
    }

    /// Timer callback: decide whether this tick issues a fetch
    fn on_tick(self: &Arc<Self>) {
        match self.state() {
            PollerState::Running => {}
            PollerState::Paused => {
                log::debug!("[Poller] Tick while paused, skipping");
                return;
            }
            PollerState::Stopped => return,
        }

        if self.overlap == OverlapPolicy::SingleFlight && self.in_flight.load(Ordering::Acquire) > 0 {
            log::debug!("[Poller] Previous fetch still pending, skipping tick");
            return;
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.poll_once().await;
        });
    }

    async fn poll_once(&self) -> PollOutcome {
        if self.torn_down.load(Ordering::Acquire) {
            return PollOutcome::Cancelled;
        }

        let Some(_slot) = self.acquire_slot() else {
            log::debug!("[Poller] Fetch already in flight, not issuing another");
            return PollOutcome::SkippedInFlight;
        };

        let result = self.api.fetch_telemetry().await;
        let received_at = now_ms();

        if self.torn_down.load(Ordering::Acquire) {
            log::debug!("[Poller] Dropping telemetry that resolved after teardown");
            return PollOutcome::Cancelled;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                log::warn!("[Poller] Telemetry fetch failed: {}", e);
                emit(&self.events, MonitorEvent::PollFailed(e.to_string()));
                return PollOutcome::TransportFailed(e);
            }
        };

        match normalize(&response, received_at) {
            Ok(sample) => {
                if looks_like_epoch_seconds(sample.timestamp) {
                    log::warn!(
                        "[Poller] Sample timestamp {} looks like epoch seconds; displayed as milliseconds",
                        sample.timestamp
                    );
                }
                let latency = sample.latency;
                let level = classify(&sample);
                let (len, banner) = {
                    let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
                    history.append(sample);
                    (history.len(), banner_active(&history))
                };
                log::debug!(
                    "[Poller] Appended sample: latency={:.2} ms, alert={}, history={}",
                    latency,
                    level,
                    len
                );
                emit(&self.events, MonitorEvent::SampleAppended { latency, level });
                self.report_banner(banner);
                PollOutcome::Appended(len)
            }
            Err(reason) => {
                log::warn!("[Poller] Discarding telemetry response: {}", reason);
                emit(&self.events, MonitorEvent::PollFailed(reason.to_string()));
                PollOutcome::Discarded(reason)
            }
        }
    }

    fn report_banner(&self, active: bool) {
        let transition = self
            .banner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .update(active);
        let Some(transition) = transition else {
            return;
        };

        match transition {
            BannerTransition::Raised => {
                log::warn!(target: "alert", "DDoS suspected on latest sample - banner raised");
            }
            BannerTransition::Cleared => {
                log::info!(target: "alert", "Latest sample no longer suspected - banner cleared");
            }
        }
        emit(&self.events, MonitorEvent::BannerChanged(transition));
    }
}

async fn run_timer(shared: Arc<PollerShared>, period: Duration, mut cancel_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // The first tick completes immediately: that is the start-up fetch
            _ = ticker.tick() => shared.on_tick(),
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    break;
                }
            }
        }
    }
    log::debug!("[Poller] Timer stopped");
}

/// Periodic telemetry poller owning the append side of the history buffer
pub struct Poller {
    shared: Arc<PollerShared>,
    interval: Duration,
    cancel_tx: watch::Sender<bool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(
        api: Arc<dyn BackendApi>,
        history: Arc<RwLock<HistoryBuffer>>,
        settings: PollerSettings,
        events: Option<mpsc::Sender<MonitorEvent>>,
    ) -> Self {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        Poller {
            shared: Arc::new(PollerShared {
                api,
                history,
                state: RwLock::new(PollerState::Stopped),
                overlap: settings.overlap,
                in_flight: AtomicUsize::new(0),
                torn_down: AtomicBool::new(false),
                banner: Mutex::new(BannerTracker::new()),
                events,
            }),
            interval: settings.interval,
            cancel_tx,
            timer: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PollerState {
        self.shared.state()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.shared.overlap
    }

    /// Number of fetches currently awaiting the backend
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.load(Ordering::Acquire)
    }

    /// Start polling: one immediate fetch, then one per interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), PollerError> {
        if self.is_torn_down() {
            return Err(PollerError::TornDown);
        }
        if self.state() != PollerState::Stopped {
            return Err(PollerError::AlreadyRunning);
        }

        self.shared.set_state(PollerState::Running);
        let handle = tokio::spawn(run_timer(
            Arc::clone(&self.shared),
            self.interval,
            self.cancel_tx.subscribe(),
        ));
        *self.timer.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        log::info!(
            "[Poller] Started (interval: {} ms, overlap: {:?})",
            self.interval.as_millis(),
            self.shared.overlap
        );
        Ok(())
    }

    /// Make subsequent ticks no-ops. Pausing twice is harmless.
    pub fn pause(&self) -> Result<(), PollerError> {
        match self.state() {
            PollerState::Running => {
                self.shared.set_state(PollerState::Paused);
                log::info!("[Poller] Paused");
                Ok(())
            }
            PollerState::Paused => Ok(()),
            PollerState::Stopped => Err(self.stopped_error()),
        }
    }

    /// Let ticks fetch again. Resuming while running is harmless.
    pub fn resume(&self) -> Result<(), PollerError> {
        match self.state() {
            PollerState::Paused => {
                self.shared.set_state(PollerState::Running);
                log::info!("[Poller] Resumed");
                Ok(())
            }
            PollerState::Running => Ok(()),
            PollerState::Stopped => Err(self.stopped_error()),
        }
    }

    /// Toggle between running and paused; returns the new state
    pub fn toggle_pause(&self) -> Result<PollerState, PollerError> {
        match self.state() {
            PollerState::Running => self.pause()?,
            _ => self.resume()?,
        }
        Ok(self.state())
    }

    /// Cancel the timer. No further fetches are issued. Idempotent.
    pub fn teardown(&self) {
        if self.shared.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.set_state(PollerState::Stopped);
        let _ = self.cancel_tx.send(true);
        if let Some(handle) = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
        log::info!("[Poller] Torn down");
    }

    /// Run one fetch/normalize/append cycle immediately, outside the timer.
    ///
    /// Honors single-flight and teardown, but not pause.
    pub async fn poll_once(&self) -> PollOutcome {
        self.shared.poll_once().await
    }

    fn stopped_error(&self) -> PollerError {
        if self.is_torn_down() {
            PollerError::TornDown
        } else {
            PollerError::NotRunning
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DemoKind, SuggestionRequest};
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::{json, Value};
    use std::collections::VecDeque;

    /// Serves canned telemetry responses in call order, each after its own delay
    struct CannedTelemetry {
        responses: Mutex<VecDeque<(Duration, Result<Value, ClientError>)>>,
        calls: AtomicUsize,
    }

    impl CannedTelemetry {
        fn new(responses: Vec<(Duration, Result<Value, ClientError>)>) -> Arc<Self> {
            Arc::new(CannedTelemetry {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BackendApi for CannedTelemetry {
        fn fetch_telemetry(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            async move {
                match next {
                    Some((delay, result)) => {
                        tokio::time::sleep(delay).await;
                        result
                    }
                    None => Err(ClientError::Transport("no more responses".to_string())),
                }
            }
            .boxed()
        }

        fn suggest_mitigation(&self, _: SuggestionRequest) -> BoxFuture<'static, Result<Value, ClientError>> {
            async { Ok(json!({})) }.boxed()
        }

        fn trigger_demo(&self, _: DemoKind) -> BoxFuture<'static, Result<Value, ClientError>> {
            async { Ok(json!({})) }.boxed()
        }

        fn probe(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
            async { Ok(json!({})) }.boxed()
        }
    }

    fn latency_response(latency: f64) -> Result<Value, ClientError> {
        Ok(json!({ "predicted_latency": latency }))
    }

    fn poller_with(
        api: Arc<CannedTelemetry>,
        overlap: OverlapPolicy,
    ) -> (Poller, Arc<RwLock<HistoryBuffer>>) {
        let history = Arc::new(RwLock::new(HistoryBuffer::new()));
        let settings = PollerSettings {
            interval: Duration::from_millis(3000),
            overlap,
        };
        (Poller::new(api, history.clone(), settings, None), history)
    }

    fn latencies(history: &Arc<RwLock<HistoryBuffer>>) -> Vec<f64> {
        history.read().unwrap().all().map(|s| s.latency).collect()
    }

    #[tokio::test]
    async fn test_poll_once_appends() {
        let api = CannedTelemetry::new(vec![(Duration::ZERO, latency_response(42.0))]);
        let (poller, history) = poller_with(api, OverlapPolicy::SingleFlight);

        assert_eq!(poller.poll_once().await, PollOutcome::Appended(1));
        assert_eq!(latencies(&history), vec![42.0]);
    }

    #[tokio::test]
    async fn test_error_payload_is_discarded() {
        let api = CannedTelemetry::new(vec![(Duration::ZERO, Ok(json!({"error": "boom"})))]);
        let (poller, history) = poller_with(api, OverlapPolicy::SingleFlight);

        assert_eq!(
            poller.poll_once().await,
            PollOutcome::Discarded(DiscardReason::BackendError("boom".to_string()))
        );
        assert!(history.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_buffer_untouched() {
        let api = CannedTelemetry::new(vec![(
            Duration::ZERO,
            Err(ClientError::Transport("connection refused".to_string())),
        )]);
        let (poller, history) = poller_with(api, OverlapPolicy::SingleFlight);

        assert!(matches!(poller.poll_once().await, PollOutcome::TransportFailed(_)));
        assert!(history.read().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fetches_immediately_then_every_interval() {
        let responses = (1..=3).map(|i| (Duration::ZERO, latency_response(i as f64))).collect();
        let api = CannedTelemetry::new(responses);
        let (poller, history) = poller_with(api.clone(), OverlapPolicy::SingleFlight);

        poller.start().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(api.calls(), 1);

        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(api.calls(), 3);
        assert_eq!(latencies(&history), vec![1.0, 2.0, 3.0]);
        poller.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_timer_running() {
        // Paused ticks are no-ops; the timer itself is not suspended, so the first
        // fetch after resume happens on the original 3 s grid (t=6000), not 3 s after resume.
        let responses = (1..=5).map(|i| (Duration::ZERO, latency_response(i as f64))).collect();
        let api = CannedTelemetry::new(responses);
        let (poller, _history) = poller_with(api.clone(), OverlapPolicy::SingleFlight);

        poller.start().unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(api.calls(), 1);

        poller.pause().unwrap();
        assert_eq!(poller.state(), PollerState::Paused);
        tokio::time::sleep(Duration::from_millis(3000)).await; // t=4000, tick at 3000 skipped
        assert_eq!(api.calls(), 1);

        poller.resume().unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await; // t=6500
        assert_eq!(api.calls(), 2);
        poller.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_skips_overlapping_tick() {
        let api = CannedTelemetry::new(vec![
            (Duration::from_millis(5000), latency_response(1.0)),
            (Duration::from_millis(100), latency_response(2.0)),
        ]);
        let (poller, history) = poller_with(api.clone(), OverlapPolicy::SingleFlight);

        poller.start().unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        // tick at 3000 skipped: first fetch still pending
        assert_eq!(api.calls(), 1);
        assert_eq!(poller.in_flight(), 1);

        tokio::time::sleep(Duration::from_millis(3000)).await; // t=6500
        assert_eq!(api.calls(), 2);
        assert_eq!(latencies(&history), vec![1.0, 2.0]);
        poller.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_allow_overlap_appends_in_resolution_order() {
        let api = CannedTelemetry::new(vec![
            (Duration::from_millis(5000), latency_response(1.0)),
            (Duration::from_millis(100), latency_response(2.0)),
        ]);
        let (poller, history) = poller_with(api.clone(), OverlapPolicy::AllowOverlap);

        poller.start().unwrap();
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(api.calls(), 2);
        // second request resolved first (t=3100) and was appended first
        assert_eq!(latencies(&history), vec![2.0, 1.0]);
        poller.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_drops_in_flight_result() {
        let api = CannedTelemetry::new(vec![(Duration::from_millis(2000), latency_response(9.0))]);
        let (poller, history) = poller_with(api.clone(), OverlapPolicy::SingleFlight);

        poller.start().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        poller.teardown();
        poller.teardown();

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(api.calls(), 1);
        assert!(history.read().unwrap().is_empty());
        assert_eq!(poller.state(), PollerState::Stopped);
    }

    #[tokio::test]
    async fn test_lifecycle_errors() {
        let api = CannedTelemetry::new(vec![]);
        let (poller, _history) = poller_with(api, OverlapPolicy::SingleFlight);

        assert_eq!(poller.pause(), Err(PollerError::NotRunning));
        poller.start().unwrap();
        assert_eq!(poller.start(), Err(PollerError::AlreadyRunning));
        assert_eq!(poller.toggle_pause(), Ok(PollerState::Paused));
        assert_eq!(poller.toggle_pause(), Ok(PollerState::Running));

        poller.teardown();
        assert_eq!(poller.start(), Err(PollerError::TornDown));
        assert_eq!(poller.resume(), Err(PollerError::TornDown));
        assert_eq!(poller.poll_once().await, PollOutcome::Cancelled);
    }
}
