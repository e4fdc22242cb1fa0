//! Alert Derivation
//!
//! Pure mapping from a sample to its visual classification, plus the
//! persistent banner condition (latest sample is a suspected DDoS).

use super::history::HistoryBuffer;
use crate::models::{AlertLevel, Sample};

/// Classify a sample. `ddos_suspected` takes precedence over `spike`.
pub fn classify(sample: &Sample) -> AlertLevel {
    classify_flags(sample.ddos_suspected, sample.spike)
}

/// Classification from the two raw flags
pub fn classify_flags(ddos_suspected: bool, spike: bool) -> AlertLevel {
    match (ddos_suspected, spike) {
        (true, _) => AlertLevel::DdosSuspected,
        (false, true) => AlertLevel::Spike,
        (false, false) => AlertLevel::Normal,
    }
}

/// Banner is shown iff the latest sample classifies as `DdosSuspected`
pub fn banner_active(history: &HistoryBuffer) -> bool {
    history
        .latest()
        .map_or(false, |s| classify(s) == AlertLevel::DdosSuspected)
}

/// Change in the banner condition between two appends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTransition {
    Raised,
    Cleared,
}

/// Remembers the last banner state so transitions can be reported once
#[derive(Debug, Default)]
pub struct BannerTracker {
    active: bool,
}

impl BannerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Feed the current banner condition; returns a transition when it flipped
    pub fn update(&mut self, active: bool) -> Option<BannerTransition> {
        let transition = match (self.active, active) {
            (false, true) => Some(BannerTransition::Raised),
            (true, false) => Some(BannerTransition::Cleared),
            _ => None,
        };
        self.active = active;
        transition
    }
}
