//! Rolling input window for recursive forecasting

use crate::data::Channels;
use crate::window::Window;
use std::collections::VecDeque;

/// Fixed-capacity window of normalized rows
///
/// Pushing onto a full window drops the oldest row, so the window always
/// holds the most recent `capacity` rows in chronological order.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    rows: VecDeque<Channels>,
    capacity: usize,
}

impl RollingWindow {
    /// Create an empty window holding at most `capacity` rows
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a window seeded with the last `capacity` of `rows`
    pub fn seeded(capacity: usize, rows: &[Channels]) -> Self {
        let mut window = Self::new(capacity);
        for row in rows {
            window.push(*row);
        }
        window
    }

    /// Append a row, evicting the oldest if the window is full
    pub fn push(&mut self, row: Channels) {
        if self.capacity == 0 {
            return;
        }
        if self.rows.len() >= self.capacity {
            self.rows.pop_front();
        }
        self.rows.push_back(row);
    }

    /// Number of rows currently held
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check if the window is at full capacity
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    /// Maximum number of rows
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent row
    pub fn latest(&self) -> Option<&Channels> {
        self.rows.back()
    }

    /// Rows oldest first, as model input
    pub fn to_window(&self) -> Window {
        self.rows.iter().copied().collect()
    }
}
