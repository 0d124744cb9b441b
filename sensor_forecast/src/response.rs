//! JSON result objects written by the command line front end
//!
//! Every engine outcome, success or failure, maps to exactly one of these
//! shapes; errors never escape as anything but an `error` field.

use crate::data::CHANNEL_NAMES;
use crate::engine::{ChannelError, Evaluation, Forecast, Prediction, TrainingSummary};
use crate::error::{ForecastError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Failure body: `{error, ...}` with optional context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl ErrorBody {
    /// Error with a message only
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            needed: None,
            available: None,
            details: None,
            actions: None,
        }
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach the list of supported actions
    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions = Some(actions.iter().map(|a| a.to_string()).collect());
        self
    }
}

impl From<&ForecastError> for ErrorBody {
    fn from(err: &ForecastError) -> Self {
        let body = ErrorBody::message(err.to_string());
        match err {
            ForecastError::InsufficientData { needed, available }
            | ForecastError::InsufficientWindows { needed, available }
            | ForecastError::ModelUnavailable { needed, available } => ErrorBody {
                needed: Some(*needed),
                available: Some(*available),
                ..body
            },
            ForecastError::TrainingFailed { details } => body.with_details(details.clone()),
            _ => body,
        }
    }
}

/// Result of the `train` action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrainResponse {
    Success {
        success: bool,
        message: String,
        sequences: usize,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl From<Result<TrainingSummary>> for TrainResponse {
    fn from(result: Result<TrainingSummary>) -> Self {
        match result {
            Ok(summary) => TrainResponse::Success {
                success: true,
                message: summary.message(),
                sequences: summary.sequences,
            },
            Err(e) => TrainResponse::Failure {
                success: false,
                error: e.to_string(),
            },
        }
    }
}

/// Result of the `predict` action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Success {
        success: bool,
        predictions: Vec<Prediction>,
        model: String,
        sequence_length: usize,
    },
    Failure(ErrorBody),
}

impl From<Result<Forecast>> for PredictResponse {
    fn from(result: Result<Forecast>) -> Self {
        match result {
            Ok(forecast) => PredictResponse::Success {
                success: true,
                predictions: forecast.predictions,
                model: forecast.model,
                sequence_length: forecast.sequence_length,
            },
            Err(e) => PredictResponse::Failure(ErrorBody::from(&e)),
        }
    }
}

/// Result of the `evaluate` action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluateResponse {
    Success {
        success: bool,
        samples: usize,
        metrics: BTreeMap<String, ChannelError>,
    },
    Failure(ErrorBody),
}

impl From<Result<Evaluation>> for EvaluateResponse {
    fn from(result: Result<Evaluation>) -> Self {
        match result {
            Ok(evaluation) => EvaluateResponse::Success {
                success: true,
                samples: evaluation.samples,
                metrics: CHANNEL_NAMES
                    .iter()
                    .map(|name| name.to_string())
                    .zip(evaluation.channels)
                    .collect(),
            },
            Err(e) => EvaluateResponse::Failure(ErrorBody::from(&e)),
        }
    }
}
