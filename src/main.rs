use std::sync::Arc;
use tokio::sync::mpsc;

use latency_monitor::log_collector::{ensure_logs_dir_exists, LogCollector, LogLine};
use latency_monitor::monitor::MonitorEvent;
use latency_monitor::ui::{spawn_repaint_relay, MonitorApp, MonitorController, RepaintSignal};
use latency_monitor::{load_config, AppError};

/// Capacity of the engine -> UI event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Capacity of the log -> UI channel (disk persistence is unaffected when full)
const LOG_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> latency_monitor::Result<()> {
    // =========================================================================
    // CONFIGURATION
    // =========================================================================
    let config = match load_config(None) {
        Ok(config) => config,
        Err(e) => {
            let err = AppError::from(e);
            eprintln!("[Main] ERROR: {}", err.user_message());
            return Err(err.into());
        }
    };

    // =========================================================================
    // LOG COLLECTOR - DECOUPLED FROM UI
    // =========================================================================
    let log_dir = config.logs_path()?;
    ensure_logs_dir_exists(&log_dir)?;

    let (log_ui_tx, log_ui_rx) = mpsc::channel::<LogLine>(LOG_CHANNEL_CAPACITY);
    let max_level = config.log_level_filter();
    let log_collector = LogCollector::new(log_dir, log_ui_tx, max_level)
        .map_err(AppError::Logging)?;

    if let Err(e) = log::set_boxed_logger(Box::new(log_collector.clone()))
        .map(|()| log::set_max_level(max_level))
    {
        eprintln!("[Main] WARNING: Failed to set LogCollector as global logger: {}", e);
    }

    log::info!(
        "[Main] Latency Monitor {} starting (log: {})",
        latency_monitor::VERSION,
        log_collector.session_log_path().display()
    );

    // =========================================================================
    // CONTROLLER AND CHANNELS
    // =========================================================================
    let (events_tx, events_rx) = mpsc::channel::<MonitorEvent>(EVENT_CHANNEL_CAPACITY);
    let repaint = RepaintSignal::new();
    let (events_rx, _events_relay) =
        spawn_repaint_relay(events_rx, EVENT_CHANNEL_CAPACITY, repaint.clone());
    let (log_rx, _log_relay) = spawn_repaint_relay(log_ui_rx, LOG_CHANNEL_CAPACITY, repaint.clone());

    let controller = match MonitorController::from_config(&config, Some(events_tx)) {
        Ok(controller) => Arc::new(controller),
        Err(e) => {
            log::error!("[Main] {}", e.user_message());
            let _ = log_collector.wait_for_empty().await;
            return Err(e.into());
        }
    };

    // Connectivity check runs alongside polling; failure is reported, not fatal
    let probe_controller = Arc::clone(&controller);
    tokio::spawn(async move {
        if let Err(e) = probe_controller.probe().await {
            log::warn!("[Main] Backend probe failed: {}", e.user_message());
        }
    });

    controller.start()?;
    log::info!(
        "[Main] Polling every {} ms",
        config.poll_interval().as_millis()
    );

    // =========================================================================
    // LAUNCH EGUI
    // =========================================================================
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };

    let app_controller = Arc::clone(&controller);
    let result = eframe::run_native(
        "Latency Monitor",
        options,
        Box::new(move |cc| {
            repaint.set_context(cc.egui_ctx.clone());
            Box::new(MonitorApp::new(
                app_controller,
                Some(events_rx),
                Some(log_rx),
                repaint,
            ))
        }),
    );

    // =========================================================================
    // SHUTDOWN
    // =========================================================================
    controller.teardown();
    log::info!("[Main] Window closed, polling stopped");

    if let Err(e) = log_collector.wait_for_empty().await {
        eprintln!("[Main] WARNING: Failed to wait for log collector to empty: {}", e);
    }

    result.map_err(|e| e.into())
}
