//! Sensor readings and feature extraction
//!
//! Readings arrive oldest first and are never reordered. Every feature row
//! holds the channels in the fixed order temperature, humidity, soil
//! moisture; the scaler, the model and the output records all rely on it.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Number of measured channels
pub const CHANNELS: usize = 3;

/// Channel names in feature order
pub const CHANNEL_NAMES: [&str; CHANNELS] = ["temperature", "humidity", "soilMoisture"];

/// One feature row: `[temperature, humidity, soilMoisture]`
pub type Channels = [f64; CHANNELS];

/// Rows of channel values, one per reading, in input order
pub type FeatureMatrix = Vec<Channels>;

/// A single environmental sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Air temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Soil moisture in percent
    #[serde(rename = "soilMoisture")]
    pub soil_moisture: f64,
    /// ISO-8601 time the reading was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Reading {
    /// Create a reading without a timestamp
    pub fn new(temperature: f64, humidity: f64, soil_moisture: f64) -> Self {
        Self {
            temperature,
            humidity,
            soil_moisture,
            timestamp: None,
        }
    }

    /// Attach an ISO-8601 timestamp
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Channel values in feature order
    pub fn channels(&self) -> Channels {
        [self.temperature, self.humidity, self.soil_moisture]
    }

    /// Parse the timestamp, if the reading has one
    pub fn parsed_timestamp(&self) -> Result<Option<DateTime<FixedOffset>>> {
        self.timestamp.as_deref().map(parse_timestamp).transpose()
    }
}

/// Parse an ISO-8601 timestamp
///
/// Accepts RFC 3339 (`Z` or a numeric offset). Timestamps without an offset
/// are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.fix().from_utc_datetime(&naive));
        }
    }

    Err(ForecastError::MalformedInput(format!(
        "Invalid timestamp: {}",
        value
    )))
}

/// Decode a JSON array of readings
pub fn parse_readings(json: &str) -> Result<Vec<Reading>> {
    serde_json::from_str(json).map_err(|e| ForecastError::MalformedInput(e.to_string()))
}

/// Converts readings into feature rows
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    sequence_length: usize,
}

impl FeatureExtractor {
    /// Create an extractor requiring at least `sequence_length` readings
    pub fn new(sequence_length: usize) -> Self {
        Self { sequence_length }
    }

    /// Minimum number of readings accepted
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Extract one `[temperature, humidity, soilMoisture]` row per reading
    pub fn extract(&self, readings: &[Reading]) -> Result<FeatureMatrix> {
        if readings.len() < self.sequence_length {
            return Err(ForecastError::InsufficientData {
                needed: self.sequence_length,
                available: readings.len(),
            });
        }

        Ok(readings.iter().map(Reading::channels).collect())
    }
}
