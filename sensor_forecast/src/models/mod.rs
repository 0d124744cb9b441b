//! Sequence models: window of past rows in, next row out

use crate::data::Channels;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod lstm;

pub use self::lstm::{Lstm, TrainedLstm};

/// Summary of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Epochs completed
    pub epochs: usize,
    /// Windows used for gradient updates
    pub training_samples: usize,
    /// Windows held out for validation
    pub validation_samples: usize,
    /// Mean squared error on the training windows after the last epoch
    pub training_loss: f64,
    /// Mean squared error on the held-out windows, if any
    pub validation_loss: Option<f64>,
}

/// Trained sequence model
pub trait TrainedSequenceModel: Debug + Serialize + DeserializeOwned {
    /// Predict the row that follows `window` (normalized units)
    fn predict(&self, window: &[Channels]) -> Result<Channels>;

    /// Name of the model
    fn name(&self) -> &str;

    /// How the model was trained
    fn report(&self) -> &TrainingReport;
}

/// Sequence model that can be trained on window/target pairs
pub trait SequenceModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedSequenceModel;

    /// Train a fresh model for `epochs` passes over the windows
    fn train(
        &self,
        windows: &[Vec<Channels>],
        targets: &[Channels],
        epochs: usize,
    ) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}
