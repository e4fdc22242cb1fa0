//! Decoupled logging pipeline for the monitor.
//!
//! Every `log::*!` record is persisted to disk even if the UI channel is
//! congested or gone.
//!
//! # Architecture
//!
//! ```text
//! log::info!/warn!/... (any thread, any runtime)
//!     |
//! [LogCollector] (log::Log, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [DiskPersister thread] ----> logs/monitor/<ts>.log   (every line)
//!     |                  \---> logs/alerts/<ts>.log    (target "alert" only)
//!     v
//! UI event log (bounded tokio mpsc, try_send)
//! ```
//!
//! `wait_for_empty()` pushes a flush marker through the same channel, so it
//! returns only once everything logged before it is on disk.

use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

/// Log target whose records also land in the alerts file
pub const ALERT_TARGET: &str = "alert";

const MONITOR_SUBDIR: &str = "monitor";
const ALERTS_SUBDIR: &str = "alerts";

/// Internal log line or flush marker
enum LogMessage {
    Line(LogLine),
    Flush(oneshot::Sender<()>),
}

/// Ensure a logs directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("Failed to create logs directory: {}", e))
}

/// A log line with metadata
#[derive(Clone, Debug, PartialEq)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    /// Alert transition line (target `"alert"`)
    pub is_alert: bool,
    /// Wall-clock time the line was recorded (HH:MM:SS.mmm)
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        LogLine {
            message: message.into(),
            level,
            is_alert: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn alert(level: Level, message: impl Into<String>) -> Self {
        LogLine {
            is_alert: true,
            ..LogLine::new(level, message)
        }
    }

    fn formatted(&self) -> String {
        format!("[{}] [{}] {}\n", self.timestamp, self.level, self.message)
    }
}

/// Unified logger handling disk persistence and UI dispatch
#[derive(Clone)]
pub struct LogCollector {
    /// Crossbeam unbounded sender: usable from any thread or runtime
    tx: Sender<LogMessage>,
    session_log: PathBuf,
    max_level: LevelFilter,
}

impl LogCollector {
    /// Create the collector and its background persister thread.
    ///
    /// A new session file `<log_dir>/monitor/<timestamp>.log` is created
    /// immediately; the alerts file is opened on the first alert line.
    pub fn new(
        log_dir: PathBuf,
        ui_tx: mpsc::Sender<LogLine>,
        max_level: LevelFilter,
    ) -> Result<Self, String> {
        let monitor_dir = log_dir.join(MONITOR_SUBDIR);
        let alerts_dir = log_dir.join(ALERTS_SUBDIR);
        std::fs::create_dir_all(&monitor_dir)
            .map_err(|e| format!("Failed to create monitor log dir: {}", e))?;
        std::fs::create_dir_all(&alerts_dir)
            .map_err(|e| format!("Failed to create alerts log dir: {}", e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let session_log = unique_log_path(&monitor_dir, &stamp.to_string());
        let session_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&session_log)
            .map_err(|e| format!("Failed to create session log {}: {}", session_log.display(), e))?;
        let alerts_log = unique_log_path(&alerts_dir, &format!("{}_alerts", stamp));

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread, not a tokio task: blocking recv works regardless of which
        // runtime (if any) the logging call came from.
        std::thread::Builder::new()
            .name("log-persister".to_string())
            .spawn(move || persist_loop(rx, session_file, alerts_log, ui_tx))
            .map_err(|e| format!("Failed to spawn log persister: {}", e))?;

        Ok(LogCollector {
            tx,
            session_log,
            max_level,
        })
    }

    /// Path of this run's monitor log
    pub fn session_log_path(&self) -> &Path {
        &self.session_log
    }

    /// Queue a line (never blocks)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Wait until every line queued before this call is written to disk
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .await
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }
}

/// Wires `log::info!()` and friends into the collector
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        let line = if record.target() == ALERT_TARGET {
            LogLine::alert(record.level(), message)
        } else {
            LogLine::new(record.level(), message)
        };
        self.log_line(line);
    }

    fn flush(&self) {}
}

fn persist_loop(
    rx: Receiver<LogMessage>,
    mut session_file: File,
    alerts_path: PathBuf,
    ui_tx: mpsc::Sender<LogLine>,
) {
    let mut alerts_file: Option<File> = None;

    while let Ok(msg) = rx.recv() {
        match msg {
            LogMessage::Line(line) => {
                let formatted = line.formatted();
                if let Err(e) = session_file.write_all(formatted.as_bytes()) {
                    eprintln!("[Log] Failed to write session log: {}", e);
                }

                if line.is_alert {
                    if alerts_file.is_none() {
                        alerts_file = OpenOptions::new()
                            .create(true)
                            .append(true)
                            .open(&alerts_path)
                            .map_err(|e| eprintln!("[Log] Failed to open alerts log: {}", e))
                            .ok();
                    }
                    if let Some(file) = alerts_file.as_mut() {
                        let _ = file.write_all(formatted.as_bytes());
                    }
                }

                // Disk first; the UI channel may drop lines when full
                let _ = ui_tx.try_send(line);
            }
            LogMessage::Flush(done) => {
                let _ = session_file.flush();
                if let Some(file) = alerts_file.as_mut() {
                    let _ = file.flush();
                }
                let _ = done.send(());
            }
        }
    }
}

/// `<dir>/<stem>.log`, suffixed with a counter if that file already exists
fn unique_log_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.log", stem));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.log", stem, n));
        n += 1;
    }
    path
}
