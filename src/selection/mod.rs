//! Selection State Machine
//!
//! Tracks which historical sample is under inspection and the lifecycle of its
//! suggestion request:
//!
//! ```text
//! Closed -> Open(idx) -> SuggestionsLoading(idx) -> SuggestionsReady(idx, list)
//!                                                 | SuggestionsError(idx, msg)
//! ```
//!
//! `Open`, `SuggestionsReady` and `SuggestionsError` may re-enter
//! `SuggestionsLoading` (refresh), go back to `Closed`, or move to a new
//! `Open(idx')`, which discards any prior suggestion state.
//!
//! A resolution is applied only while the open index still equals the index the
//! request was issued for and no newer request, re-selection or close happened
//! in between. Each of those transitions bumps a generation counter carried by
//! the request ticket.

pub mod suggestions;

use std::fmt;

pub use suggestions::{build_request, interpret_response, FetchOutcome, SuggestionFetcher};

/// Current inspection state
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionState {
    Closed,
    Open { idx: usize },
    SuggestionsLoading { idx: usize },
    SuggestionsReady { idx: usize, suggestions: Vec<String> },
    SuggestionsError { idx: usize, message: String },
}

impl SelectionState {
    /// Index of the inspected sample, if the detail view is open
    pub fn index(&self) -> Option<usize> {
        match self {
            SelectionState::Closed => None,
            SelectionState::Open { idx }
            | SelectionState::SuggestionsLoading { idx }
            | SelectionState::SuggestionsReady { idx, .. }
            | SelectionState::SuggestionsError { idx, .. } => Some(*idx),
        }
    }
}

impl fmt::Display for SelectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionState::Closed => write!(f, "closed"),
            SelectionState::Open { idx } => write!(f, "open({})", idx),
            SelectionState::SuggestionsLoading { idx } => write!(f, "loading({})", idx),
            SelectionState::SuggestionsReady { idx, suggestions } => {
                write!(f, "ready({}, {} suggestions)", idx, suggestions.len())
            }
            SelectionState::SuggestionsError { idx, .. } => write!(f, "error({})", idx),
        }
    }
}

/// Final result of one suggestion request
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    Ready(Vec<String>),
    Error(String),
}

/// Identifies one suggestion request for the staleness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionTicket {
    pub idx: usize,
    generation: u64,
}

/// Selection state plus the generation used to detect stale resolutions
#[derive(Debug)]
pub struct Selection {
    state: SelectionState,
    generation: u64,
}

impl Selection {
    pub fn new() -> Self {
        Selection {
            state: SelectionState::Closed,
            generation: 0,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn open_index(&self) -> Option<usize> {
        self.state.index()
    }

    pub fn is_open(&self) -> bool {
        self.state != SelectionState::Closed
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SelectionState::SuggestionsLoading { .. })
    }

    /// Inspect sample `idx`; any previous suggestion state is dropped
    pub fn open(&mut self, idx: usize) {
        self.generation = self.generation.wrapping_add(1);
        self.state = SelectionState::Open { idx };
        log::debug!("[Selection] Opened sample {}", idx);
    }

    /// Close the detail view; pending requests become stale
    pub fn close(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.state != SelectionState::Closed {
            log::debug!("[Selection] Closed ({})", self.state);
        }
        self.state = SelectionState::Closed;
    }

    /// Enter `SuggestionsLoading` for the open index.
    ///
    /// Returns `None` when nothing is open. A ticket from an earlier call for the
    /// same selection is superseded.
    pub fn begin_loading(&mut self) -> Option<SuggestionTicket> {
        let idx = self.open_index()?;
        self.generation = self.generation.wrapping_add(1);
        self.state = SelectionState::SuggestionsLoading { idx };
        Some(SuggestionTicket {
            idx,
            generation: self.generation,
        })
    }

    /// Whether a resolution for `ticket` would still be applied
    pub fn is_current(&self, ticket: &SuggestionTicket) -> bool {
        self.generation == ticket.generation && self.open_index() == Some(ticket.idx)
    }

    /// Apply a resolution if its ticket is still current; returns whether it was applied
    pub fn resolve(&mut self, ticket: SuggestionTicket, outcome: SuggestionOutcome) -> bool {
        if !self.is_current(&ticket) {
            log::debug!(
                "[Selection] Discarding stale suggestions for sample {} (now {})",
                ticket.idx,
                self.state
            );
            return false;
        }

        self.state = match outcome {
            SuggestionOutcome::Ready(suggestions) => SelectionState::SuggestionsReady {
                idx: ticket.idx,
                suggestions,
            },
            SuggestionOutcome::Error(message) => SelectionState::SuggestionsError {
                idx: ticket.idx,
                message,
            },
        };
        true
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(items: &[&str]) -> SuggestionOutcome {
        SuggestionOutcome::Ready(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_starts_closed() {
        let selection = Selection::new();
        assert_eq!(selection.state(), &SelectionState::Closed);
        assert!(!selection.is_open());
        assert_eq!(selection.open_index(), None);
    }

    #[test]
    fn test_begin_loading_requires_open() {
        let mut selection = Selection::new();
        assert!(selection.begin_loading().is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut selection = Selection::new();
        selection.open(3);
        assert_eq!(selection.state(), &SelectionState::Open { idx: 3 });

        let ticket = selection.begin_loading().unwrap();
        assert!(selection.is_loading());
        assert!(selection.resolve(ticket, ready(&["Enable QoS"])));
        assert_eq!(
            selection.state(),
            &SelectionState::SuggestionsReady {
                idx: 3,
                suggestions: vec!["Enable QoS".to_string()]
            }
        );
    }

    #[test]
    fn test_error_resolution() {
        let mut selection = Selection::new();
        selection.open(0);
        let ticket = selection.begin_loading().unwrap();
        assert!(selection.resolve(ticket, SuggestionOutcome::Error("boom".to_string())));
        assert_eq!(
            selection.state(),
            &SelectionState::SuggestionsError {
                idx: 0,
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_reopen_clears_suggestions() {
        let mut selection = Selection::new();
        selection.open(1);
        let ticket = selection.begin_loading().unwrap();
        selection.resolve(ticket, ready(&["a"]));

        selection.open(2);
        assert_eq!(selection.state(), &SelectionState::Open { idx: 2 });

        // Same index again still resets
        let ticket = selection.begin_loading().unwrap();
        selection.resolve(ticket, ready(&["b"]));
        selection.open(2);
        assert_eq!(selection.state(), &SelectionState::Open { idx: 2 });
    }

    #[test]
    fn test_stale_resolution_for_other_index_is_dropped() {
        let mut selection = Selection::new();
        selection.open(1);
        let old = selection.begin_loading().unwrap();

        selection.open(2);
        let current = selection.begin_loading().unwrap();
        assert!(selection.resolve(current, ready(&["for 2"])));

        assert!(!selection.resolve(old, ready(&["for 1"])));
        assert_eq!(
            selection.state(),
            &SelectionState::SuggestionsReady {
                idx: 2,
                suggestions: vec!["for 2".to_string()]
            }
        );
    }

    #[test]
    fn test_refresh_supersedes_earlier_request() {
        let mut selection = Selection::new();
        selection.open(5);
        let first = selection.begin_loading().unwrap();
        let second = selection.begin_loading().unwrap();

        assert!(!selection.resolve(first, ready(&["old"])));
        assert!(selection.is_loading());
        assert!(selection.resolve(second, ready(&["new"])));
    }

    #[test]
    fn test_close_neutralizes_pending_request() {
        let mut selection = Selection::new();
        selection.open(4);
        let ticket = selection.begin_loading().unwrap();
        selection.close();
        assert!(!selection.resolve(ticket, ready(&["late"])));
        assert_eq!(selection.state(), &SelectionState::Closed);

        // Reopening the same index does not revive the old request
        selection.open(4);
        assert!(!selection.resolve(ticket, ready(&["late"])));
        assert_eq!(selection.state(), &SelectionState::Open { idx: 4 });
    }

    #[test]
    fn test_refresh_from_ready_and_error() {
        let mut selection = Selection::new();
        selection.open(0);
        let t1 = selection.begin_loading().unwrap();
        selection.resolve(t1, SuggestionOutcome::Error("x".to_string()));
        let t2 = selection.begin_loading().unwrap();
        assert!(selection.is_loading());
        selection.resolve(t2, ready(&["y"]));
        assert!(selection.begin_loading().is_some());
    }
}
