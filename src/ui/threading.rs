/// Threading and Async Integration Helpers
///
/// egui only redraws when something asks it to. Background tasks (poller,
/// suggestion fetcher, demo trigger, log persister) report through tokio
/// channels; the relays here pass those messages through to the UI unchanged
/// and wake the egui loop for each one.

use eframe::egui;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Repaint handle shared with background tasks.
///
/// The egui context only exists once the window is up, so it is installed late;
/// requests made before that are remembered in `pending`.
#[derive(Clone, Default)]
pub struct RepaintSignal {
    ctx: Arc<RwLock<Option<egui::Context>>>,
    pending: Arc<AtomicBool>,
}

impl RepaintSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_context(&self, ctx: egui::Context) {
        if let Ok(mut slot) = self.ctx.write() {
            *slot = Some(ctx);
        }
    }

    /// Ask the UI to redraw as soon as possible
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
        if let Ok(slot) = self.ctx.read() {
            if let Some(ctx) = slot.as_ref() {
                ctx.request_repaint();
            }
        }
    }

    /// Returns and clears the pending flag
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

/// Relay every message from `source` into a fresh channel of `capacity`,
/// requesting a repaint per message. Ends when either side closes.
pub fn spawn_repaint_relay<T: Send + 'static>(
    mut source: mpsc::Receiver<T>,
    capacity: usize,
    signal: RepaintSignal,
) -> (mpsc::Receiver<T>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        while let Some(msg) = source.recv().await {
            if tx.send(msg).await.is_err() {
                break;
            }
            signal.request();
        }
    });
    (rx, handle)
}
