//! Training window construction
//!
//! Windows overlap by all but one row and keep temporal order: window `i`
//! covers rows `i..i + sequence_length` and its target is row
//! `i + sequence_length`.

use crate::data::Channels;
use crate::error::{ForecastError, Result};

/// Model input: `sequence_length` consecutive normalized rows
pub type Window = Vec<Channels>;

/// Windows paired with the row that follows each of them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainingSet {
    /// Input windows, oldest first
    pub windows: Vec<Window>,
    /// Next-step target for each window
    pub targets: Vec<Channels>,
}

impl TrainingSet {
    /// Number of window/target pairs
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether there are no pairs
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Slices a normalized matrix into window/target pairs
#[derive(Debug, Clone, Copy)]
pub struct WindowBuilder {
    sequence_length: usize,
    min_windows: usize,
}

impl WindowBuilder {
    /// Create a builder for windows of `sequence_length` rows that refuses
    /// to produce fewer than `min_windows` pairs
    pub fn new(sequence_length: usize, min_windows: usize) -> Self {
        Self {
            sequence_length,
            min_windows,
        }
    }

    /// All window/target pairs, with no minimum count
    ///
    /// Produces `max(0, rows - sequence_length)` pairs.
    pub fn slice(&self, matrix: &[Channels]) -> TrainingSet {
        let count = matrix.len().saturating_sub(self.sequence_length);
        let mut set = TrainingSet {
            windows: Vec::with_capacity(count),
            targets: Vec::with_capacity(count),
        };

        for i in 0..count {
            set.windows.push(matrix[i..i + self.sequence_length].to_vec());
            set.targets.push(matrix[i + self.sequence_length]);
        }

        set
    }

    /// Window/target pairs for training
    pub fn build(&self, matrix: &[Channels]) -> Result<TrainingSet> {
        let set = self.slice(matrix);
        if set.len() < self.min_windows {
            return Err(ForecastError::InsufficientWindows {
                needed: self.min_windows,
                available: set.len(),
            });
        }
        Ok(set)
    }
}
