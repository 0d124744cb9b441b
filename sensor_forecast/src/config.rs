//! Engine and model configuration

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default directory holding the persisted model and scaler
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Settings for a [`ForecastEngine`](crate::engine::ForecastEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Directory where the model and scaler are persisted
    pub model_dir: PathBuf,
    /// Number of past readings in one model input window
    pub sequence_length: usize,
    /// Minimum number of training sequences accepted by `train`
    pub min_training_windows: usize,
    /// Readings required to train in place when no model is stored
    pub min_readings_for_fallback: usize,
    /// Epochs used by an explicit training run
    pub train_epochs: usize,
    /// Reduced epoch budget for in-place training during prediction
    pub fallback_epochs: usize,
    /// Forecast steps when the caller does not ask for a count
    pub default_steps: usize,
    /// Sensor reporting interval in minutes
    pub cadence_minutes: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            sequence_length: 10,
            min_training_windows: 10,
            min_readings_for_fallback: 20,
            train_epochs: 50,
            fallback_epochs: 30,
            default_steps: 6,
            cadence_minutes: 5,
        }
    }
}

impl ForecastConfig {
    /// Default settings with a custom model directory
    pub fn new<P: AsRef<Path>>(model_dir: P) -> Self {
        Self {
            model_dir: model_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the model directory
    pub fn with_model_dir<P: AsRef<Path>>(mut self, model_dir: P) -> Self {
        self.model_dir = model_dir.as_ref().to_path_buf();
        self
    }

    /// Set the epoch budget for explicit training runs
    pub fn with_train_epochs(mut self, epochs: usize) -> Self {
        self.train_epochs = epochs;
        self
    }

    /// Set the epoch budget for in-place training
    pub fn with_fallback_epochs(mut self, epochs: usize) -> Self {
        self.fallback_epochs = epochs;
        self
    }

    /// Check that the settings are usable together
    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "sequence_length must be positive".to_string(),
            ));
        }
        if self.cadence_minutes <= 0 {
            return Err(ForecastError::InvalidParameter(
                "cadence_minutes must be positive".to_string(),
            ));
        }
        let floor = self.sequence_length + self.min_training_windows;
        if self.min_readings_for_fallback < floor {
            return Err(ForecastError::InvalidParameter(format!(
                "min_readings_for_fallback ({}) must be at least sequence_length + min_training_windows ({})",
                self.min_readings_for_fallback, floor
            )));
        }
        Ok(())
    }
}

/// Hyperparameters of the LSTM sequence model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Units in the recurrent layer
    pub hidden_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Windows per gradient update
    pub batch_size: usize,
    /// Trailing fraction of windows held out for validation
    pub validation_split: f64,
    /// Seed for weight initialization
    pub seed: u64,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            hidden_size: 32,
            learning_rate: 0.001,
            batch_size: 8,
            validation_split: 0.1,
            seed: 42,
        }
    }
}
