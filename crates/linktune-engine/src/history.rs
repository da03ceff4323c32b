//! Fixed-capacity observation history.

use std::collections::VecDeque;

/// Ring buffer of the most recent observations, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T: Copy> HistoryWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a value, evicting the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<T> {
        self.values.back().copied()
    }

    /// Contents in insertion order.
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }
}
