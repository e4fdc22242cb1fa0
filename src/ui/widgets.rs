/// Custom egui Widgets
///
/// Painter-based widgets for the monitor view:
/// - latency_chart: clickable line chart of the history, one dot per sample
///   colored by its alert level
/// - level_badge: small colored label for an alert level

use crate::models::{AlertLevel, Sample, StatusSeverity};
use crate::monitor::alert::classify;
use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

const CHART_HEIGHT: f32 = 260.0;
const CHART_PADDING: f32 = 28.0;
const POINT_RADIUS: f32 = 4.0;
/// Max horizontal distance (px) between a click and the point it selects
const PICK_DISTANCE: f32 = 12.0;

pub const BACKGROUND: Color32 = Color32::from_rgb(46, 52, 64);
pub const LINE_COLOR: Color32 = Color32::from_rgb(136, 192, 208);

/// Dot color for an alert level
pub fn level_color(level: AlertLevel) -> Color32 {
    match level {
        AlertLevel::Normal => Color32::from_rgb(163, 190, 140),
        AlertLevel::Spike => Color32::from_rgb(235, 203, 139),
        AlertLevel::DdosSuspected => Color32::from_rgb(191, 97, 106),
    }
}

pub fn severity_color(severity: StatusSeverity) -> Color32 {
    match severity {
        StatusSeverity::Normal => Color32::from_rgb(163, 190, 140),
        StatusSeverity::Degraded => Color32::from_rgb(235, 203, 139),
        StatusSeverity::Congested => Color32::from_rgb(208, 135, 112),
        StatusSeverity::Critical => Color32::from_rgb(191, 97, 106),
        StatusSeverity::Unknown => Color32::LIGHT_GRAY,
    }
}

/// Index of the x coordinate closest to `x`, if within `max_distance`
pub fn nearest_index(xs: &[f32], x: f32, max_distance: f32) -> Option<usize> {
    xs.iter()
        .enumerate()
        .map(|(i, &px)| (i, (px - x).abs()))
        .filter(|&(_, d)| d <= max_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Vertical range for the chart; flat or empty data still gets a visible band
pub fn value_range(values: &[f64]) -> (f64, f64) {
    let (min, max) = values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    (min, max)
}

fn x_positions(count: usize, rect: Rect) -> Vec<f32> {
    let span = (count.saturating_sub(1)).max(1) as f32;
    (0..count)
        .map(|i| rect.left() + i as f32 / span * rect.width())
        .collect()
}

/// Draws the latency history and returns the index of a clicked sample.
///
/// Samples are drawn in history order, oldest at the left.
pub fn latency_chart(ui: &mut egui::Ui, samples: &[Sample], selected: Option<usize>) -> Option<usize> {
    let (response, painter) = ui.allocate_painter(
        Vec2::new(ui.available_width(), CHART_HEIGHT),
        egui::Sense::click(),
    );
    let outer = response.rect;
    painter.rect_filled(outer, 4.0, BACKGROUND);

    if samples.is_empty() {
        painter.text(
            outer.center(),
            egui::Align2::CENTER_CENTER,
            "Waiting for telemetry...",
            egui::FontId::new(14.0, egui::FontFamily::Proportional),
            Color32::LIGHT_GRAY,
        );
        return None;
    }

    let plot = outer.shrink2(Vec2::new(CHART_PADDING, CHART_PADDING / 2.0));
    let latencies: Vec<f64> = samples.iter().map(|s| s.latency).collect();
    let (min, max) = value_range(&latencies);
    let to_y = |v: f64| -> f32 { plot.bottom() - (((v - min) / (max - min)) as f32) * plot.height() };
    let xs = x_positions(samples.len(), plot);

    let font = egui::FontId::new(10.0, egui::FontFamily::Monospace);
    for value in [min, max] {
        painter.text(
            Pos2::new(outer.left() + 2.0, to_y(value)),
            egui::Align2::LEFT_CENTER,
            format!("{:.0}", value),
            font.clone(),
            Color32::GRAY,
        );
    }

    let line_stroke = Stroke::new(2.0, LINE_COLOR);
    for i in 1..samples.len() {
        painter.line_segment(
            [
                Pos2::new(xs[i - 1], to_y(latencies[i - 1])),
                Pos2::new(xs[i], to_y(latencies[i])),
            ],
            line_stroke,
        );
    }

    for (i, sample) in samples.iter().enumerate() {
        let center = Pos2::new(xs[i], to_y(sample.latency));
        painter.circle_filled(center, POINT_RADIUS, level_color(classify(sample)));
        if selected == Some(i) {
            painter.circle_stroke(center, POINT_RADIUS + 3.0, Stroke::new(2.0, Color32::WHITE));
        }
    }

    // Time labels for the first and last sample
    if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
        painter.text(
            Pos2::new(plot.left(), outer.bottom() - 2.0),
            egui::Align2::LEFT_BOTTOM,
            first.time_label(),
            font.clone(),
            Color32::GRAY,
        );
        painter.text(
            Pos2::new(plot.right(), outer.bottom() - 2.0),
            egui::Align2::RIGHT_BOTTOM,
            last.time_label(),
            font,
            Color32::GRAY,
        );
    }

    if let Some(pos) = response.hover_pos() {
        if let Some(i) = nearest_index(&xs, pos.x, PICK_DISTANCE) {
            let sample = &samples[i];
            response.clone().on_hover_text_at_pointer(format!(
                "{}  {:.1} ms  {}",
                sample.time_label(),
                sample.latency,
                classify(sample)
            ));
        }
    }

    if response.clicked() {
        return response
            .interact_pointer_pos()
            .and_then(|pos| nearest_index(&xs, pos.x, PICK_DISTANCE));
    }
    None
}

/// Small colored label for an alert level
pub fn level_badge(ui: &mut egui::Ui, level: AlertLevel) {
    ui.colored_label(level_color(level), format!("\u{25CF} {}", level));
}
