//! # Sensor Owl
//!
//! `sensor_owl_workspace` ties together the workspace crates:
//!
//! - [`math`]: scaling, metrics, activations and the Adam optimizer
//! - [`forecast`]: readings, the LSTM model, persistence and the forecast engine
//!
//! ## Example
//!
//! ```
//! use sensor_owl_workspace::prelude::*;
//!
//! let reading = Reading::new(22.5, 61.0, 40.2);
//! assert_eq!(reading.channels(), [22.5, 61.0, 40.2]);
//!
//! let config = ForecastConfig::default();
//! assert_eq!(config.sequence_length, 10);
//! ```

pub use sensor_forecast as forecast;
pub use sensor_math as math;

/// Commonly used types from both crates
pub mod prelude {
    pub use sensor_forecast::{
        ForecastConfig, ForecastEngine, ForecastError, Prediction, Reading, SequenceModel,
        TrainedSequenceModel,
    };
    pub use sensor_math::{MathError, MinMaxScaler};
}
