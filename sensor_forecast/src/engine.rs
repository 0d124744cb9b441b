//! Training and recursive multi-step forecasting
//!
//! The engine owns the fitted model and scaler for the lifetime of one
//! process. Training always fits a new scaler and a new model on the given
//! batch and persists both. Prediction resolves a model (memory, then the
//! store, then in-place training), seeds a rolling window with the most
//! recent readings and feeds every raw normalized prediction back in as the
//! next input. Clamping and rounding only shape the emitted records.

use crate::buffer::RollingWindow;
use crate::config::ForecastConfig;
use crate::data::{Channels, FeatureExtractor, Reading, CHANNELS, CHANNEL_NAMES};
use crate::error::{ForecastError, Result};
use crate::models::{Lstm, SequenceModel, TrainedSequenceModel, TrainingReport};
use crate::store::ModelStore;
use crate::window::WindowBuilder;
use chrono::{DateTime, Duration, FixedOffset, Offset, SecondsFormat, Utc};
use sensor_math::{mae, rmse, MinMaxScaler};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Physically valid output range per channel, in feature order
pub const VALID_RANGES: [(f64, f64); CHANNELS] = [(0.0, 50.0), (0.0, 100.0), (0.0, 100.0)];

/// Confidence of the first forecast step, in percent
pub const MAX_CONFIDENCE: u32 = 95;

/// Confidence lost per additional step
pub const CONFIDENCE_DECAY: u32 = 7;

/// Lowest confidence ever reported
pub const MIN_CONFIDENCE: u32 = 50;

/// One forecast point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(rename = "soilMoisture")]
    pub soil_moisture: f64,
    /// ISO-8601 time the forecast applies to
    pub timestamp: String,
    /// Confidence in percent
    pub confidence: u32,
    #[serde(rename = "isPrediction")]
    pub is_prediction: bool,
}

/// Forecast points ordered by increasing horizon
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub predictions: Vec<Prediction>,
    /// Name of the model that produced the forecast
    pub model: String,
    pub sequence_length: usize,
}

/// Outcome of a successful training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Readings the model was trained on
    pub readings: usize,
    /// Window/target pairs built from them
    pub sequences: usize,
    pub report: TrainingReport,
}

impl TrainingSummary {
    /// Human readable summary
    pub fn message(&self) -> String {
        format!("Model trained on {} readings", self.readings)
    }
}

/// One-step error of a single channel, in raw units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelError {
    pub mae: f64,
    pub rmse: f64,
}

/// Walk-forward one-step evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Number of windows evaluated
    pub samples: usize,
    /// Errors in feature order
    pub channels: [ChannelError; CHANNELS],
}

/// Confidence for the 0-indexed forecast `step`
pub fn confidence_for_step(step: usize) -> u32 {
    let decay = u32::try_from(step)
        .unwrap_or(u32::MAX)
        .saturating_mul(CONFIDENCE_DECAY);
    MAX_CONFIDENCE.saturating_sub(decay).max(MIN_CONFIDENCE)
}

/// Clamp each channel to its physically valid range
pub fn clamp_to_valid_range(values: Channels) -> Channels {
    let mut clamped = values;
    for (value, (lo, hi)) in clamped.iter_mut().zip(VALID_RANGES.iter()) {
        *value = value.clamp(*lo, *hi);
    }
    clamped
}

/// Round to one decimal place
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Timestamp of the 0-indexed forecast `step` after `base`
pub fn forecast_timestamp(
    base: DateTime<FixedOffset>,
    step: usize,
    cadence_minutes: i64,
) -> Result<DateTime<FixedOffset>> {
    let horizon = i64::try_from(step)
        .ok()
        .and_then(|s| s.checked_add(1))
        .and_then(|h| h.checked_mul(cadence_minutes))
        .ok_or_else(|| ForecastError::InvalidParameter("Forecast horizon too large".to_string()))?;

    base.checked_add_signed(Duration::minutes(horizon))
        .ok_or_else(|| ForecastError::InvalidParameter("Forecast horizon too large".to_string()))
}

/// Fitted model and the scaler it was trained with
#[derive(Debug)]
struct FittedState<T> {
    model: T,
    scaler: MinMaxScaler,
}

/// Trains, persists and runs a sequence model over sensor readings
#[derive(Debug)]
pub struct ForecastEngine<M: SequenceModel = Lstm> {
    config: ForecastConfig,
    model: M,
    store: ModelStore,
    extractor: FeatureExtractor,
    windows: WindowBuilder,
    fitted: Option<FittedState<M::Trained>>,
}

impl ForecastEngine<Lstm> {
    /// Create an engine using the default LSTM
    pub fn new(config: ForecastConfig) -> Result<Self> {
        Self::with_model(config, Lstm::default())
    }
}

impl<M: SequenceModel> ForecastEngine<M> {
    /// Create an engine training `model`
    ///
    /// Opens (and creates if needed) the configured model directory.
    pub fn with_model(config: ForecastConfig, model: M) -> Result<Self> {
        config.validate()?;
        let store = ModelStore::open(&config.model_dir)?;

        Ok(Self {
            extractor: FeatureExtractor::new(config.sequence_length),
            windows: WindowBuilder::new(config.sequence_length, config.min_training_windows),
            config,
            model,
            store,
            fitted: None,
        })
    }

    /// Engine settings
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Backing model store
    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Whether a fitted model is held in memory
    pub fn is_ready(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fit a new scaler and model on `readings` and persist them
    ///
    /// `readings` must be ordered oldest to newest.
    pub fn train(&mut self, readings: &[Reading], epochs: usize) -> Result<TrainingSummary> {
        info!(readings = readings.len(), epochs, "Training model");

        let features = self.extractor.extract(readings)?;
        let scaler = MinMaxScaler::fit(&features)?;
        let normalized = normalize(&scaler, &features)?;
        let set = self.windows.build(&normalized)?;

        let trained = self.model.train(&set.windows, &set.targets, epochs)?;
        self.store.save(&trained, &scaler)?;

        let report = trained.report().clone();
        info!(
            sequences = set.len(),
            training_loss = report.training_loss,
            validation_loss = ?report.validation_loss,
            "Training finished"
        );

        self.fitted = Some(FittedState {
            model: trained,
            scaler,
        });

        Ok(TrainingSummary {
            readings: readings.len(),
            sequences: set.len(),
            report,
        })
    }

    /// Forecast the next `steps` readings after `recent`
    ///
    /// `recent` must be ordered oldest to newest; only its last
    /// `sequence_length` readings seed the forecast.
    pub fn predict_next(&mut self, recent: &[Reading], steps: usize) -> Result<Forecast> {
        self.resolve_model(recent)?;
        let fitted = self.fitted_state(recent.len())?;
        let sequence_length = self.config.sequence_length;

        let seed = &recent[recent.len().saturating_sub(sequence_length)..];
        let seed_features = self.extractor.extract(seed)?;
        let seed_window = normalize(&fitted.scaler, &seed_features)?;
        let mut window = RollingWindow::seeded(sequence_length, &seed_window);

        let base = match recent.last() {
            Some(last) => last.parsed_timestamp()?,
            None => None,
        }
        .unwrap_or_else(|| Utc::now().with_timezone(&Utc.fix()));

        // The last timestamp must be representable before any work is done
        if let Some(last_step) = steps.checked_sub(1) {
            forecast_timestamp(base, last_step, self.config.cadence_minutes)?;
        }

        let mut predictions = Vec::new();
        for step in 0..steps {
            let predicted = fitted.model.predict(&window.to_window())?;
            let raw = to_channels(&fitted.scaler.inverse_transform_row(&predicted)?)?;
            let clamped = clamp_to_valid_range(raw);
            let timestamp = forecast_timestamp(base, step, self.config.cadence_minutes)?;

            debug!(step, ?predicted, ?raw, "Forecast step");
            window.push(predicted);

            predictions.push(Prediction {
                temperature: round_to_tenth(clamped[0]),
                humidity: round_to_tenth(clamped[1]),
                soil_moisture: round_to_tenth(clamped[2]),
                timestamp: timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                confidence: confidence_for_step(step),
                is_prediction: true,
            });
        }

        Ok(Forecast {
            predictions,
            model: fitted.model.name().to_string(),
            sequence_length,
        })
    }

    /// One-step-ahead errors of the resolved model across `readings`
    pub fn evaluate(&mut self, readings: &[Reading]) -> Result<Evaluation> {
        self.resolve_model(readings)?;
        let fitted = self.fitted_state(readings.len())?;

        let features = self.extractor.extract(readings)?;
        let normalized = normalize(&fitted.scaler, &features)?;
        let set = self.windows.slice(&normalized);
        if set.is_empty() {
            return Err(ForecastError::InsufficientWindows {
                needed: 1,
                available: 0,
            });
        }

        let mut forecast: [Vec<f64>; CHANNELS] = Default::default();
        let mut actual: [Vec<f64>; CHANNELS] = Default::default();
        for (input, target) in set.windows.iter().zip(set.targets.iter()) {
            let predicted = fitted.model.predict(input)?;
            let predicted = fitted.scaler.inverse_transform_row(&predicted)?;
            let observed = fitted.scaler.inverse_transform_row(target)?;
            for col in 0..CHANNELS {
                forecast[col].push(predicted[col]);
                actual[col].push(observed[col]);
            }
        }

        let channel_error = |col: usize| -> Result<ChannelError> {
            Ok(ChannelError {
                mae: mae(&forecast[col], &actual[col])?,
                rmse: rmse(&forecast[col], &actual[col])?,
            })
        };
        let channels = [channel_error(0)?, channel_error(1)?, channel_error(2)?];

        for (name, err) in CHANNEL_NAMES.iter().zip(channels.iter()) {
            debug!(channel = *name, mae = err.mae, rmse = err.rmse, "Evaluation");
        }

        Ok(Evaluation {
            samples: set.len(),
            channels,
        })
    }

    /// Make a fitted model available: memory, then the store, then
    /// training in place on `recent` if it is long enough
    fn resolve_model(&mut self, recent: &[Reading]) -> Result<()> {
        if self.fitted.is_some() {
            return Ok(());
        }

        if let Some((model, scaler)) = self.store.load::<M::Trained>() {
            self.fitted = Some(FittedState { model, scaler });
            return Ok(());
        }

        let needed = self.config.min_readings_for_fallback;
        if recent.len() < needed {
            return Err(ForecastError::ModelUnavailable {
                needed,
                available: recent.len(),
            });
        }

        let epochs = self.config.fallback_epochs;
        info!(readings = recent.len(), epochs, "No stored model, training in place");
        self.train(recent, epochs)
            .map(|_| ())
            .map_err(|e| ForecastError::TrainingFailed {
                details: e.to_string(),
            })
    }

    fn fitted_state(&self, available: usize) -> Result<&FittedState<M::Trained>> {
        self.fitted
            .as_ref()
            .ok_or(ForecastError::ModelUnavailable {
                needed: self.config.min_readings_for_fallback,
                available,
            })
    }
}

fn to_channels(row: &[f64]) -> Result<Channels> {
    row.try_into().map_err(|_| {
        ForecastError::Transform(format!(
            "Expected {} channels, got {}",
            CHANNELS,
            row.len()
        ))
    })
}

fn normalize(scaler: &MinMaxScaler, features: &[Channels]) -> Result<Vec<Channels>> {
    scaler
        .transform(features)?
        .iter()
        .map(|row| to_channels(row))
        .collect()
}
