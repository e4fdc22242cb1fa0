//! Scripted `BackendApi` shared by the integration tests.
//!
//! Telemetry answers are served from a queue; suggestion and demo answers can
//! be held back behind a gate so tests control resolution order.

#![allow(dead_code)]

use futures::future::{BoxFuture, FutureExt};
use latency_monitor::backend::BackendApi;
use latency_monitor::{ClientError, DemoKind, SuggestionRequest};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Releases one held-back response
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

struct Held {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<Value, ClientError>,
}

impl Held {
    fn immediate(result: Result<Value, ClientError>) -> Self {
        Held { gate: None, result }
    }

    fn gated(result: Result<Value, ClientError>) -> (Self, Gate) {
        let (tx, rx) = oneshot::channel();
        (Held { gate: Some(rx), result }, Gate(tx))
    }

    async fn resolve(self) -> Result<Value, ClientError> {
        if let Some(gate) = self.gate {
            let _ = gate.await;
        }
        self.result
    }
}

#[derive(Default)]
pub struct ScriptedBackend {
    telemetry: Mutex<VecDeque<Result<Value, ClientError>>>,
    suggestions: Mutex<VecDeque<Held>>,
    demos: Mutex<VecDeque<Held>>,
    suggestion_requests: Mutex<Vec<SuggestionRequest>>,
    telemetry_calls: AtomicUsize,
    demo_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_telemetry(&self, result: Result<Value, ClientError>) {
        self.telemetry.lock().unwrap().push_back(result);
    }

    pub fn push_latencies(&self, latencies: &[f64]) {
        for &latency in latencies {
            self.push_telemetry(Ok(json!({ "predicted_latency": latency })));
        }
    }

    pub fn push_suggestions(&self, result: Result<Value, ClientError>) {
        self.suggestions.lock().unwrap().push_back(Held::immediate(result));
    }

    pub fn push_gated_suggestions(&self, result: Result<Value, ClientError>) -> Gate {
        let (held, gate) = Held::gated(result);
        self.suggestions.lock().unwrap().push_back(held);
        gate
    }

    pub fn push_gated_demo(&self, result: Result<Value, ClientError>) -> Gate {
        let (held, gate) = Held::gated(result);
        self.demos.lock().unwrap().push_back(held);
        gate
    }

    pub fn telemetry_calls(&self) -> usize {
        self.telemetry_calls.load(Ordering::SeqCst)
    }

    pub fn suggestion_calls(&self) -> usize {
        self.suggestion_requests.lock().unwrap().len()
    }

    pub fn suggestion_requests(&self) -> Vec<SuggestionRequest> {
        self.suggestion_requests.lock().unwrap().clone()
    }

    pub fn demo_calls(&self) -> usize {
        self.demo_calls.load(Ordering::SeqCst)
    }
}

impl BackendApi for ScriptedBackend {
    fn fetch_telemetry(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
        self.telemetry_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .telemetry
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("script exhausted".to_string())));
        async move { next }.boxed()
    }

    fn suggest_mitigation(
        &self,
        request: SuggestionRequest,
    ) -> BoxFuture<'static, Result<Value, ClientError>> {
        self.suggestion_requests.lock().unwrap().push(request);
        let next = self
            .suggestions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Held::immediate(Ok(json!({}))));
        next.resolve().boxed()
    }

    fn trigger_demo(&self, kind: DemoKind) -> BoxFuture<'static, Result<Value, ClientError>> {
        self.demo_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .demos
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Held::immediate(Ok(json!({ "message": format!("{} started", kind.as_str()) }))));
        next.resolve().boxed()
    }

    fn probe(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
        async { Ok(json!({ "predicted_latency": 25.0, "status": "Normal" })) }.boxed()
    }
}

/// Yield until `cond` holds (current-thread runtime; spawned tasks get to run)
pub async fn yield_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
