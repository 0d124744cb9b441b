//! Error types for the sensor_forecast crate

use sensor_math::MathError;
use thiserror::Error;

/// Custom error types for the sensor_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Fewer readings than one window needs
    #[error("Need at least {needed} data points, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// Enough readings for a window but too few training sequences
    #[error("Not enough data for training: {available} sequences, need at least {needed}")]
    InsufficientWindows { needed: usize, available: usize },

    /// No persisted model and too few readings to train one in place
    #[error("No pre-trained model found and not enough data to train")]
    ModelUnavailable { needed: usize, available: usize },

    /// In-place training during prediction failed
    #[error("Failed to train model")]
    TrainingFailed { details: String },

    /// Fault while fitting or running the scaler or the model
    #[error("Transform error: {0}")]
    Transform(String),

    /// Input that does not describe a list of readings
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from reading or writing persisted artifacts
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::Transform(err.to_string())
    }
}
