//! History Buffer
//!
//! Fixed-capacity rolling store of normalized samples in arrival order.
//! Appending past capacity evicts exactly the oldest sample (strict FIFO).

use crate::models::Sample;
use std::collections::VecDeque;

/// Number of samples kept in the rolling history
pub const HISTORY_CAPACITY: usize = 120;

/// Summary of the latencies currently held, for chart scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Bounded FIFO of samples
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// A buffer with a custom bound; a zero capacity is treated as one
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryBuffer {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append at the end, evicting the oldest sample when over capacity.
    ///
    /// Returns the evicted sample, if any.
    pub fn append(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    /// Most recently appended sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Full ordered sequence, oldest first
    pub fn all(&self) -> impl ExactSizeIterator<Item = &Sample> + DoubleEndedIterator {
        self.samples.iter()
    }

    /// Sample at position `idx` (0 = oldest)
    pub fn get(&self, idx: usize) -> Option<&Sample> {
        self.samples.get(idx)
    }

    /// Owned copy of the history for rendering outside the lock
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Min/max/mean latency, or `None` when empty
    pub fn latency_stats(&self) -> Option<LatencyStats> {
        if self.samples.is_empty() {
            return None;
        }

        let (min, max, sum) = self.samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, sum), s| (min.min(s.latency), max.max(s.latency), sum + s.latency),
        );

        Some(LatencyStats {
            min,
            max,
            mean: sum / self.samples.len() as f64,
        })
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}
