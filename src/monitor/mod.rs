//! Monitoring engine
//!
//! Leaves first:
//! - `normalizer`: backend response -> `Sample` (or discard)
//! - `history`: bounded FIFO of samples
//! - `alert`: sample -> `AlertLevel`, banner condition
//! - `poller`: timer-driven fetch/normalize/append loop
//!
//! Data flow: Poller -> Normalizer -> HistoryBuffer -> (alert derivation, rendering)

pub mod alert;
pub mod history;
pub mod normalizer;
pub mod poller;

use crate::models::{AlertLevel, DemoKind};

pub use alert::{banner_active, classify, BannerTransition};
pub use history::{HistoryBuffer, HISTORY_CAPACITY};
pub use normalizer::{normalize, DiscardReason};
pub use poller::{PollOutcome, Poller, PollerState};

/// Notifications emitted by the background tasks for the UI
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// A sample was appended to the history
    SampleAppended { latency: f64, level: AlertLevel },
    /// The DDoS banner condition flipped
    BannerChanged(BannerTransition),
    /// A poll produced no sample (transport failure or backend-reported error)
    PollFailed(String),
    /// Suggestions for the sample at `idx` were applied to the selection
    SuggestionsResolved { idx: usize },
    /// A demo trigger completed; `Ok` carries the backend acknowledgement
    DemoFinished {
        kind: DemoKind,
        outcome: Result<String, String>,
    },
}

/// Non-blocking send; a full or closed channel only costs the notification
pub(crate) fn emit(tx: &Option<tokio::sync::mpsc::Sender<MonitorEvent>>, event: MonitorEvent) {
    if let Some(tx) = tx {
        let _ = tx.try_send(event);
    }
}
