use std::collections::VecDeque;

/// Number of batches each channel keeps for display
pub const DEFAULT_WINDOW_LEN: usize = 10;

/// Fixed-capacity FIFO holding the most recent entries, oldest first
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Capacity is clamped to at least one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, returning the evicted oldest one when full
    pub fn push(&mut self, entry: T) -> Option<T> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(entry);
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl RollingWindow<Vec<f64>> {
    /// All samples of all batches, oldest first
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().flat_map(|batch| batch.iter().copied())
    }

    pub fn sample_count(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    pub fn latest_sample(&self) -> Option<f64> {
        self.entries.iter().rev().find_map(|batch| batch.last().copied())
    }
}

impl<T> Default for RollingWindow<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_LEN)
    }
}
