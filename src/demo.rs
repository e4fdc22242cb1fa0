//! Demo Trigger Controller
//!
//! Fires the backend's attack simulations (`/trigger_ddos_demo`,
//! `/trigger_ramp_attack`). At most one trigger is in flight at a time: a
//! request issued while another is pending is suppressed, not queued. The
//! in-flight flag is released on every completion path, including failures.

use crate::backend::BackendApi;
use crate::models::DemoKind;
use crate::monitor::{emit, MonitorEvent};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Result of one trigger request
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Another trigger was pending; nothing was sent
    Suppressed,
    /// Backend acknowledged; carries its message
    Started(String),
    /// Transport failure or non-success status
    Failed(String),
}

/// Clears the in-flight flag on drop
struct InFlight {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct DemoTrigger {
    api: Arc<dyn BackendApi>,
    in_flight: Arc<AtomicBool>,
    events: Option<mpsc::Sender<MonitorEvent>>,
}

impl DemoTrigger {
    pub fn new(api: Arc<dyn BackendApi>, events: Option<mpsc::Sender<MonitorEvent>>) -> Self {
        DemoTrigger {
            api,
            in_flight: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// True while a trigger request is pending (UI disables the buttons)
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn try_acquire(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight {
                flag: Arc::clone(&self.in_flight),
            })
    }

    /// Send one trigger and wait for its completion
    pub async fn trigger(&self, kind: DemoKind) -> TriggerOutcome {
        match self.try_acquire() {
            Some(guard) => Self::run(Arc::clone(&self.api), self.events.clone(), kind, guard).await,
            None => {
                log::debug!("[Demo] {} suppressed, another trigger is pending", kind);
                TriggerOutcome::Suppressed
            }
        }
    }

    /// Claim the in-flight slot now and complete the request in the background.
    ///
    /// Returns `None` when suppressed.
    pub fn spawn(&self, kind: DemoKind) -> Option<JoinHandle<TriggerOutcome>> {
        let Some(guard) = self.try_acquire() else {
            log::debug!("[Demo] {} suppressed, another trigger is pending", kind);
            return None;
        };
        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        Some(tokio::spawn(Self::run(api, events, kind, guard)))
    }

    async fn run(
        api: Arc<dyn BackendApi>,
        events: Option<mpsc::Sender<MonitorEvent>>,
        kind: DemoKind,
        guard: InFlight,
    ) -> TriggerOutcome {
        log::info!("[Demo] Triggering {} simulation", kind);

        let result = api.trigger_demo(kind).await;
        drop(guard);

        let (outcome, event_outcome) = match result {
            Ok(response) => {
                let message = acknowledgement(&response);
                log::info!("[Demo] {} started: {}", kind, message);
                (TriggerOutcome::Started(message.clone()), Ok(message))
            }
            Err(e) => {
                log::error!("[Demo] {} trigger failed: {}", kind, e);
                let message = e.to_string();
                (TriggerOutcome::Failed(message.clone()), Err(message))
            }
        };

        emit(
            &events,
            MonitorEvent::DemoFinished {
                kind,
                outcome: event_outcome,
            },
        );
        outcome
    }
}

/// Human-readable acknowledgement from a trigger response
fn acknowledgement(response: &Value) -> String {
    match response {
        Value::Object(map) => match map.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => response.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::models::SuggestionRequest;
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Trigger requests block until the gate is opened
    struct GatedDemo {
        gate: Arc<Notify>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl GatedDemo {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(GatedDemo {
                gate: Arc::new(Notify::new()),
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl BackendApi for GatedDemo {
        fn fetch_telemetry(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
            async { Ok(json!({})) }.boxed()
        }

        fn suggest_mitigation(&self, _: SuggestionRequest) -> BoxFuture<'static, Result<Value, ClientError>> {
            async { Ok(json!({})) }.boxed()
        }

        fn trigger_demo(&self, kind: DemoKind) -> BoxFuture<'static, Result<Value, ClientError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = Arc::clone(&self.gate);
            let fail = self.fail;
            async move {
                gate.notified().await;
                if fail {
                    Err(ClientError::Http {
                        status: 500,
                        body: "internal".to_string(),
                    })
                } else {
                    Ok(json!({ "message": format!("{} started", kind.as_str()) }))
                }
            }
            .boxed()
        }

        fn probe(&self) -> BoxFuture<'static, Result<Value, ClientError>> {
            async { Ok(json!({})) }.boxed()
        }
    }

    #[tokio::test]
    async fn test_second_trigger_is_suppressed_while_pending() {
        let api = GatedDemo::new(false);
        let demo = DemoTrigger::new(api.clone(), None);

        let first = demo.spawn(DemoKind::Ddos).expect("first trigger starts");
        assert!(demo.is_in_flight());
        assert!(demo.spawn(DemoKind::Ramp).is_none());
        assert_eq!(demo.trigger(DemoKind::Ramp).await, TriggerOutcome::Suppressed);

        api.gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, TriggerOutcome::Started(_)));
        assert!(!demo.is_in_flight());
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_releases_flag() {
        let api = GatedDemo::new(true);
        let (tx, mut rx) = mpsc::channel(8);
        let demo = DemoTrigger::new(api.clone(), Some(tx));

        api.gate.notify_one();
        let outcome = demo.trigger(DemoKind::Ramp).await;
        assert_eq!(
            outcome,
            TriggerOutcome::Failed("Backend returned HTTP 500: internal".to_string())
        );
        assert!(!demo.is_in_flight());

        match rx.recv().await {
            Some(MonitorEvent::DemoFinished { kind, outcome }) => {
                assert_eq!(kind, DemoKind::Ramp);
                assert_eq!(
                    outcome,
                    Err("Backend returned HTTP 500: internal".to_string())
                );
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // Released flag allows a new trigger
        api.gate.notify_one();
        assert!(matches!(
            demo.trigger(DemoKind::Ddos).await,
            TriggerOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_acknowledgement_extraction() {
        assert_eq!(
            acknowledgement(&json!({"message": "DDoS demo started"})),
            "DDoS demo started"
        );
        assert_eq!(acknowledgement(&Value::String("ok".to_string())), "ok");
        assert_eq!(acknowledgement(&json!({"status": 1})), "{\"status\":1}");
    }
}
