//! # Sensor Forecast
//!
//! Short-horizon forecasting of environmental sensor streams (temperature,
//! humidity and soil moisture) from a recent history of readings.
//!
//! ## Features
//!
//! - Reading decoding and feature extraction with a fixed channel order
//! - Per-channel min-max scaling fitted once per training run
//! - Overlapping training windows with single-step targets
//! - An LSTM sequence model trained with backpropagation through time
//! - Recursive multi-step forecasting over a rolling window, with clamped
//!   outputs, decaying confidence and a fixed five-minute cadence
//! - Persistence of the model and scaler in a model directory
//!
//! ## Quick Start
//!
//! ```no_run
//! use sensor_forecast::{ForecastConfig, ForecastEngine, Reading};
//!
//! let readings: Vec<Reading> = (0..30)
//!     .map(|i| Reading::new(20.0 + (i as f64 * 0.3).sin(), 55.0, 40.0 - i as f64 * 0.1))
//!     .collect();
//!
//! let mut engine = ForecastEngine::new(ForecastConfig::new("models"))?;
//! let summary = engine.train(&readings, 50)?;
//! println!("{}", summary.message());
//!
//! let forecast = engine.predict_next(&readings, 6)?;
//! for point in &forecast.predictions {
//!     println!("{} {:.1}C ({}%)", point.timestamp, point.temperature, point.confidence);
//! }
//! # Ok::<(), sensor_forecast::ForecastError>(())
//! ```

pub mod buffer;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod response;
pub mod store;
pub mod window;

// Re-export commonly used types
pub use crate::config::{ForecastConfig, LstmConfig};
pub use crate::data::{parse_readings, Channels, FeatureExtractor, Reading};
pub use crate::engine::{Forecast, ForecastEngine, Prediction, TrainingSummary};
pub use crate::error::ForecastError;
pub use crate::models::{Lstm, SequenceModel, TrainedLstm, TrainedSequenceModel};
pub use crate::store::ModelStore;
pub use crate::window::{TrainingSet, WindowBuilder};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
