//! Feature range scaling
//!
//! Min-max scaling of each column into `[0, 1]`. A scaler is fitted once
//! from a batch of rows and then used unchanged for both directions; there
//! is no incremental update, a new batch means a new scaler.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Per-column min-max scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    /// Minimum observed value per column
    data_min: Vec<f64>,
    /// Maximum observed value per column
    data_max: Vec<f64>,
    /// Divisor per column; 1.0 for constant columns
    scale: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit a scaler on the given rows
    ///
    /// Every row must have the same, non-zero width.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let first = rows.first().ok_or_else(|| {
            MathError::InsufficientData("Cannot fit a scaler on zero rows".to_string())
        })?;
        let width = first.as_ref().len();
        if width == 0 {
            return Err(MathError::InvalidInput(
                "Rows must have at least one column".to_string(),
            ));
        }

        let mut data_min = vec![f64::INFINITY; width];
        let mut data_max = vec![f64::NEG_INFINITY; width];

        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(MathError::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (col, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(MathError::InvalidInput(format!(
                        "Non-finite value {} in column {}",
                        value, col
                    )));
                }
                data_min[col] = data_min[col].min(value);
                data_max[col] = data_max[col].max(value);
            }
        }

        let scale = data_min
            .iter()
            .zip(data_max.iter())
            .map(|(lo, hi)| if hi > lo { hi - lo } else { 1.0 })
            .collect();

        Ok(Self {
            data_min,
            data_max,
            scale,
        })
    }

    /// Number of columns this scaler was fitted on
    pub fn width(&self) -> usize {
        self.data_min.len()
    }

    /// Fitted per-column minimums
    pub fn data_min(&self) -> &[f64] {
        &self.data_min
    }

    /// Fitted per-column maximums
    pub fn data_max(&self) -> &[f64] {
        &self.data_max
    }

    /// Scale a single row into the fitted range
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(col, value)| (value - self.data_min[col]) / self.scale[col])
            .collect())
    }

    /// Map a single scaled row back to raw units
    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(col, value)| value * self.scale[col] + self.data_min[col])
            .collect())
    }

    /// Scale every row
    pub fn transform<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| self.transform_row(row.as_ref()))
            .collect()
    }

    /// Map every scaled row back to raw units
    pub fn inverse_transform<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| self.inverse_transform_row(row.as_ref()))
            .collect()
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.width() {
            return Err(MathError::DimensionMismatch {
                expected: self.width(),
                actual: row.len(),
            });
        }
        Ok(())
    }
}
