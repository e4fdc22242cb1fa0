//! UI Module - egui integration and MonitorController
//!
//! `controller` owns the application state; `app` renders it with egui and
//! forwards operator actions back to the controller.

pub mod app;
pub mod controller;
pub mod threading;
pub mod widgets;

pub use app::{MonitorApp, UIState};
pub use controller::MonitorController;
pub use threading::{spawn_repaint_relay, RepaintSignal};
