//! # Sensor Math
//!
//! Numeric building blocks for sensor sequence forecasting.
//! This crate provides feature scaling, gradient-based optimization,
//! activation functions and forecast error metrics. It knows nothing about
//! sensors or readings; rows are plain `f64` slices.

use thiserror::Error;

pub mod activation;
pub mod metrics;
pub mod optim;
pub mod scaling;

pub use crate::metrics::{mae, mse, rmse};
pub use crate::optim::Adam;
pub use crate::scaling::MinMaxScaler;

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
