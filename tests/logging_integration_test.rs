//! LogCollector installed as the global `log` backend
//!
//! Verifies that engine log calls reach the session file, that alert
//! transitions are mirrored into the alerts file and that the UI channel
//! receives the same lines.

mod common;

use common::ScriptedBackend;
use latency_monitor::monitor::poller::PollerSettings;
use latency_monitor::{LogCollector, LogLine, MonitorController};
use serde_json::json;
use std::fs;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_global_logger_routes_alerts() {
    let temp = tempfile::tempdir().unwrap();
    let (ui_tx, mut ui_rx) = mpsc::channel::<LogLine>(256);
    let collector = LogCollector::new(temp.path().to_path_buf(), ui_tx, log::LevelFilter::Info)
        .expect("Failed to create LogCollector");

    log::set_boxed_logger(Box::new(collector.clone())).expect("logger already set");
    log::set_max_level(log::LevelFilter::Info);

    let api = ScriptedBackend::new();
    api.push_telemetry(Ok(json!({ "ddos_suspected": true, "predicted_latency": 400 })));
    api.push_telemetry(Ok(json!({ "error": "model not loaded" })));
    api.push_telemetry(Ok(json!({ "predicted_latency": 30 })));
    let ctrl = MonitorController::new(api, PollerSettings::default(), None);
    for _ in 0..3 {
        ctrl.poll_once().await;
    }

    collector.wait_for_empty().await.unwrap();

    let session = fs::read_to_string(collector.session_log_path()).unwrap();
    assert!(session.contains("model not loaded"), "session log:\n{}", session);

    let alert_files: Vec<_> = fs::read_dir(temp.path().join("alerts"))
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(alert_files.len(), 1);
    let alerts = fs::read_to_string(alert_files[0].path()).unwrap();
    assert_eq!(alerts.lines().count(), 2, "alerts log:\n{}", alerts);
    assert!(alerts.lines().next().unwrap().contains("[WARN]"));

    let mut ui_alerts = 0;
    while let Ok(line) = ui_rx.try_recv() {
        if line.is_alert {
            ui_alerts += 1;
        }
    }
    assert_eq!(ui_alerts, 2);
}
