/// Main window and transient UI state
///
/// Implements `eframe::App` for the monitor: status bar with the Pause/Resume
/// and demo controls, the DDoS banner, the clickable latency chart, the sample
/// detail window and the event log panel. All state changes go through
/// `MonitorController`; this module only renders and forwards clicks.

use crate::log_collector::LogLine;
use crate::models::{DemoKind, Sample, StatusSeverity};
use crate::monitor::alert::classify;
use crate::monitor::{MonitorEvent, PollerState};
use crate::selection::SelectionState;
use crate::ui::controller::MonitorController;
use crate::ui::threading::RepaintSignal;
use crate::ui::widgets;
use eframe::egui;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Lines kept in the event log panel
const EVENT_LOG_LIMIT: usize = 500;
/// Fallback repaint when no event arrived
const IDLE_REPAINT: Duration = Duration::from_millis(500);

/// Transient UI state
#[derive(Default)]
pub struct UIState {
    /// Event log panel contents (oldest first)
    pub event_log: VecDeque<LogLine>,
    pub show_event_log: bool,
    /// Error message to display (if any)
    pub error_message: Option<String>,
    /// Informational message (demo acknowledgements)
    pub info_message: Option<String>,
    /// Number of polls that produced no sample since start
    pub failed_polls: u64,
    pub last_poll_error: Option<String>,
}

impl UIState {
    fn push_log(&mut self, line: LogLine) {
        if self.event_log.len() >= EVENT_LOG_LIMIT {
            self.event_log.pop_front();
        }
        self.event_log.push_back(line);
    }
}

pub struct MonitorApp {
    pub controller: Arc<MonitorController>,
    pub ui_state: UIState,
    events_rx: Option<mpsc::Receiver<MonitorEvent>>,
    log_rx: Option<mpsc::Receiver<LogLine>>,
    repaint: RepaintSignal,
}

impl MonitorApp {
    pub fn new(
        controller: Arc<MonitorController>,
        events_rx: Option<mpsc::Receiver<MonitorEvent>>,
        log_rx: Option<mpsc::Receiver<LogLine>>,
        repaint: RepaintSignal,
    ) -> Self {
        MonitorApp {
            controller,
            ui_state: UIState {
                show_event_log: true,
                ..Default::default()
            },
            events_rx,
            log_rx,
            repaint,
        }
    }

    /// Drain engine events and log lines without blocking
    fn process_events(&mut self) {
        if let Some(rx) = self.events_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                match event {
                    MonitorEvent::SampleAppended { .. } => {
                        self.ui_state.last_poll_error = None;
                    }
                    MonitorEvent::PollFailed(message) => {
                        self.ui_state.failed_polls += 1;
                        self.ui_state.last_poll_error = Some(message);
                    }
                    // Banner and detail window read controller state every frame
                    MonitorEvent::BannerChanged(_) | MonitorEvent::SuggestionsResolved { .. } => {}
                    MonitorEvent::DemoFinished { kind, outcome } => match outcome {
                        Ok(message) => {
                            self.ui_state.info_message =
                                Some(format!("{} simulation started: {}", kind, message));
                        }
                        Err(message) => {
                            self.ui_state.error_message =
                                Some(format!("{} simulation failed: {}", kind, message));
                        }
                    },
                }
            }
        }

        if let Some(rx) = self.log_rx.as_mut() {
            while let Ok(line) = rx.try_recv() {
                self.ui_state.push_log(line);
            }
        }
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Latency Monitor");
                ui.separator();

                let state = self.controller.poller_state();
                let state_color = match state {
                    PollerState::Running => egui::Color32::from_rgb(163, 190, 140),
                    PollerState::Paused => egui::Color32::from_rgb(235, 203, 139),
                    PollerState::Stopped => egui::Color32::GRAY,
                };
                ui.colored_label(state_color, state.to_string());

                let toggle_label = if state == PollerState::Paused { "Resume" } else { "Pause" };
                let can_toggle = state != PollerState::Stopped;
                if ui.add_enabled(can_toggle, egui::Button::new(toggle_label)).clicked() {
                    if let Err(e) = self.controller.toggle_pause() {
                        self.ui_state.error_message = Some(e.user_message());
                    }
                }

                ui.separator();
                let demo_idle = !self.controller.demo_in_flight();
                for (kind, label) in [(DemoKind::Ddos, "Simulate DDoS"), (DemoKind::Ramp, "Simulate ramp attack")] {
                    if ui.add_enabled(demo_idle, egui::Button::new(label)).clicked() {
                        self.controller.trigger_demo(kind);
                    }
                }
                if !demo_idle {
                    ui.spinner();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(latest) = self.controller.latest() {
                        ui.monospace(format!("{:.1} ms", latest.latency));
                        widgets::level_badge(ui, classify(&latest));
                    }
                    if self.ui_state.failed_polls > 0 {
                        let text = format!("{} failed polls", self.ui_state.failed_polls);
                        let label = ui.colored_label(egui::Color32::from_rgb(208, 135, 112), text);
                        if let Some(err) = &self.ui_state.last_poll_error {
                            label.on_hover_text(err.as_str());
                        }
                    }
                });
            });
        });
    }

    fn render_banner(&mut self, ctx: &egui::Context) {
        if !self.controller.banner_active() {
            return;
        }
        egui::TopBottomPanel::top("ddos_banner")
            .frame(egui::Frame::default().fill(egui::Color32::from_rgb(191, 97, 106)).inner_margin(8.0))
            .show(ctx, |ui| {
                ui.colored_label(
                    egui::Color32::WHITE,
                    egui::RichText::new("DDoS attack suspected on the latest sample").strong(),
                );
            });
    }

    /// Render transient messages (errors, info)
    fn render_messages(&mut self, ctx: &egui::Context) {
        if let Some(msg) = self.ui_state.error_message.clone() {
            egui::TopBottomPanel::top("error_panel").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(255, 100, 100), format!("Error: {}", msg));
                    if ui.button("Dismiss").clicked() {
                        self.ui_state.error_message = None;
                    }
                });
            });
        }

        if let Some(msg) = self.ui_state.info_message.clone() {
            egui::TopBottomPanel::top("info_panel").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(100, 180, 255), msg);
                    if ui.button("Dismiss").clicked() {
                        self.ui_state.info_message = None;
                    }
                });
            });
        }
    }

    fn render_event_log(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("event_log")
            .resizable(true)
            .default_height(160.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.checkbox(&mut self.ui_state.show_event_log, "Event log");
                    if ui.small_button("Clear").clicked() {
                        self.ui_state.event_log.clear();
                    }
                });
                if !self.ui_state.show_event_log {
                    return;
                }
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for line in &self.ui_state.event_log {
                            let color = match line.level {
                                log::Level::Error => egui::Color32::from_rgb(255, 100, 100),
                                log::Level::Warn => egui::Color32::from_rgb(235, 203, 139),
                                _ if line.is_alert => egui::Color32::from_rgb(191, 97, 106),
                                _ => egui::Color32::LIGHT_GRAY,
                            };
                            ui.colored_label(color, format!("{} {}", line.timestamp, line.message));
                        }
                    });
            });
    }

    fn render_chart(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let samples = self.controller.snapshot();
            let selected = self.controller.selection_state().index();

            ui.horizontal(|ui| {
                ui.label(format!("{} samples", samples.len()));
                if let Some(stats) = self.controller.latency_stats() {
                    ui.separator();
                    ui.monospace(format!(
                        "min {:.1}  mean {:.1}  max {:.1} ms",
                        stats.min, stats.mean, stats.max
                    ));
                }
            });

            if let Some(idx) = widgets::latency_chart(ui, &samples, selected) {
                if let Err(e) = self.controller.select_point(idx) {
                    log::warn!("[UI] {}", e);
                }
            }

            ui.horizontal(|ui| {
                for level in [
                    crate::models::AlertLevel::Normal,
                    crate::models::AlertLevel::Spike,
                    crate::models::AlertLevel::DdosSuspected,
                ] {
                    widgets::level_badge(ui, level);
                }
                ui.weak("Click a point for details");
            });
        });
    }

    fn render_detail_window(&mut self, ctx: &egui::Context) {
        let state = self.controller.selection_state();
        let Some(idx) = state.index() else {
            return;
        };
        let sample = self.controller.selected_sample();

        let mut open = true;
        egui::Window::new(format!("Sample #{}", idx + 1))
            .id(egui::Id::new("sample_detail"))
            .open(&mut open)
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| {
                match &sample {
                    Some(sample) => render_sample_fields(ui, sample),
                    None => {
                        ui.weak("Sample no longer available");
                    }
                }
                ui.separator();
                self.render_suggestions(ui, &state);
            });

        if !open {
            self.controller.close_detail();
        }
    }

    fn render_suggestions(&mut self, ui: &mut egui::Ui, state: &SelectionState) {
        ui.horizontal(|ui| {
            ui.strong("Mitigation suggestions");
            let loading = matches!(state, SelectionState::SuggestionsLoading { .. });
            let label = match state {
                SelectionState::Open { .. } => "Get suggestions",
                _ => "Refresh",
            };
            if ui.add_enabled(!loading, egui::Button::new(label)).clicked() {
                self.controller.request_suggestions();
            }
        });

        match state {
            SelectionState::SuggestionsLoading { .. } => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Requesting suggestions...");
                });
            }
            SelectionState::SuggestionsReady { suggestions, .. } => {
                for suggestion in suggestions {
                    ui.label(format!("\u{2022} {}", suggestion));
                }
            }
            SelectionState::SuggestionsError { message, .. } => {
                ui.colored_label(egui::Color32::from_rgb(255, 100, 100), message.as_str());
            }
            SelectionState::Open { .. } | SelectionState::Closed => {}
        }
    }
}

fn render_sample_fields(ui: &mut egui::Ui, sample: &Sample) {
    egui::Grid::new("sample_fields").num_columns(2).striped(true).show(ui, |ui| {
        ui.label("Time");
        ui.monospace(sample.time_label());
        ui.end_row();

        ui.label("Predicted latency");
        ui.monospace(format!("{:.2} ms", sample.latency));
        ui.end_row();

        ui.label("Classification");
        widgets::level_badge(ui, classify(sample));
        ui.end_row();

        ui.label("Status");
        let severity = StatusSeverity::from_label(&sample.status);
        ui.colored_label(widgets::severity_color(severity), sample.status.as_str());
        ui.end_row();

        ui.label("Solution");
        ui.label(sample.solution.as_str());
        ui.end_row();

        if !sample.action_type.is_empty() {
            ui.label("Action");
            ui.label(format!("{} ({:.2})", sample.action_type, sample.action_strength));
            ui.end_row();
        }

        let t = &sample.collected_telemetry;
        for (name, value, unit) in [
            ("Measured latency", t.latency_measured, "ms"),
            ("Jitter", t.jitter_measured, "ms"),
            ("Packet loss", t.packet_loss, "%"),
            ("Bandwidth", t.bandwidth, "Mbps"),
            ("Signal strength", t.signal_strength, ""),
        ] {
            ui.label(name);
            match value {
                Some(v) => ui.monospace(format!("{:.2} {}", v, unit)),
                None => ui.weak("n/a"),
            };
            ui.end_row();
        }
    });

    if !sample.alternative_solutions.is_empty() {
        ui.label("Alternatives:");
        for alt in &sample.alternative_solutions {
            ui.label(format!("\u{2022} {}", alt));
        }
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.repaint.set_context(ctx.clone());
        self.repaint.take_pending();

        self.process_events();

        self.render_status_bar(ctx);
        self.render_banner(ctx);
        self.render_messages(ctx);
        self.render_event_log(ctx);
        self.render_chart(ctx);
        self.render_detail_window(ctx);

        ctx.request_repaint_after(IDLE_REPAINT);
    }
}
