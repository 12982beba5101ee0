//! Bounded window of recent gaze ratios.

use std::collections::VecDeque;

/// Default number of ratios kept for smoothing.
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// FIFO of the most recent averaged gaze ratios.
///
/// Pushing past capacity evicts the oldest value, so the mean always covers
/// at most `capacity` frames.
#[derive(Debug, Clone)]
pub struct GazeHistory {
    values: VecDeque<f32>,
    capacity: usize,
}

impl Default for GazeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl GazeHistory {
    /// Creates an empty history holding at most `capacity` values (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a ratio, evicting the oldest if full.
    pub fn push(&mut self, ratio: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(ratio);
    }

    /// Mean of the stored ratios, `None` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f32>() / self.values.len() as f32)
    }

    /// Number of stored ratios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no ratio has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maximum number of stored ratios.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored ratios, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    /// Drops all stored ratios.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
