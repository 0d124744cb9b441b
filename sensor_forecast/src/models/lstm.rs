//! LSTM sequence model
//!
//! A single recurrent layer over the three input channels followed by a
//! dense head producing the next row. Trained with backpropagation through
//! time on the mean squared error, using Adam and chronological
//! mini-batches. All parameters live in one flat vector so the optimizer
//! and the persisted form share a layout.

use crate::config::LstmConfig;
use crate::data::{Channels, CHANNELS};
use crate::error::{ForecastError, Result};
use crate::models::{SequenceModel, TrainedSequenceModel, TrainingReport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensor_math::activation::{sigmoid, sigmoid_grad, tanh_grad};
use sensor_math::Adam;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, trace};

/// Model name reported in responses
pub const LSTM_NAME: &str = "LSTM";

/// Untrained LSTM configuration
#[derive(Debug, Clone)]
pub struct Lstm {
    name: String,
    config: LstmConfig,
}

/// Trained LSTM weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedLstm {
    name: String,
    layout: Layout,
    params: Vec<f64>,
    report: TrainingReport,
}

/// Offsets of each tensor inside the flat parameter vector
///
/// Gate rows are ordered input, forget, cell, output; each row multiplies
/// the concatenation `[x_t, h_{t-1}]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Layout {
    input: usize,
    hidden: usize,
    output: usize,
}

impl Layout {
    fn concat(&self) -> usize {
        self.input + self.hidden
    }

    fn gate_rows(&self) -> usize {
        4 * self.hidden
    }

    fn gate_weights(&self) -> Range<usize> {
        0..self.gate_rows() * self.concat()
    }

    fn gate_bias(&self) -> Range<usize> {
        let start = self.gate_weights().end;
        start..start + self.gate_rows()
    }

    fn head_weights(&self) -> Range<usize> {
        let start = self.gate_bias().end;
        start..start + self.output * self.hidden
    }

    fn head_bias(&self) -> Range<usize> {
        let start = self.head_weights().end;
        start..start + self.output
    }

    fn total(&self) -> usize {
        self.head_bias().end
    }
}

/// Activations of one time step kept for the backward pass
struct StepCache {
    xh: Vec<f64>,
    input_gate: Vec<f64>,
    forget_gate: Vec<f64>,
    cell_gate: Vec<f64>,
    output_gate: Vec<f64>,
    c_prev: Vec<f64>,
    tanh_c: Vec<f64>,
}

struct ForwardPass {
    steps: Vec<StepCache>,
    hidden: Vec<f64>,
    output: Channels,
}

fn forward(params: &[f64], layout: Layout, window: &[Channels]) -> ForwardPass {
    let hsize = layout.hidden;
    let concat = layout.concat();
    let weights = &params[layout.gate_weights()];
    let bias = &params[layout.gate_bias()];

    let mut h = vec![0.0; hsize];
    let mut c = vec![0.0; hsize];
    let mut steps = Vec::with_capacity(window.len());

    for x in window {
        let mut xh = Vec::with_capacity(concat);
        xh.extend_from_slice(x);
        xh.extend_from_slice(&h);

        let z: Vec<f64> = (0..layout.gate_rows())
            .map(|r| {
                let row = &weights[r * concat..(r + 1) * concat];
                bias[r] + row.iter().zip(xh.iter()).map(|(w, v)| w * v).sum::<f64>()
            })
            .collect();

        let input_gate: Vec<f64> = z[..hsize].iter().map(|&v| sigmoid(v)).collect();
        let forget_gate: Vec<f64> = z[hsize..2 * hsize].iter().map(|&v| sigmoid(v)).collect();
        let cell_gate: Vec<f64> = z[2 * hsize..3 * hsize].iter().map(|v| v.tanh()).collect();
        let output_gate: Vec<f64> = z[3 * hsize..].iter().map(|&v| sigmoid(v)).collect();

        let c_next: Vec<f64> = (0..hsize)
            .map(|k| forget_gate[k] * c[k] + input_gate[k] * cell_gate[k])
            .collect();
        let tanh_c: Vec<f64> = c_next.iter().map(|v| v.tanh()).collect();
        h = (0..hsize).map(|k| output_gate[k] * tanh_c[k]).collect();

        steps.push(StepCache {
            xh,
            input_gate,
            forget_gate,
            cell_gate,
            output_gate,
            c_prev: std::mem::replace(&mut c, c_next),
            tanh_c,
        });
    }

    let head = &params[layout.head_weights()];
    let head_bias = &params[layout.head_bias()];
    let mut output = [0.0; CHANNELS];
    for (j, out) in output.iter_mut().enumerate() {
        let row = &head[j * hsize..(j + 1) * hsize];
        *out = head_bias[j] + row.iter().zip(h.iter()).map(|(w, v)| w * v).sum::<f64>();
    }

    ForwardPass {
        steps,
        hidden: h,
        output,
    }
}

/// Squared error averaged over the output channels
fn sample_loss(output: &Channels, target: &Channels) -> f64 {
    output
        .iter()
        .zip(target.iter())
        .map(|(y, t)| (y - t).powi(2))
        .sum::<f64>()
        / CHANNELS as f64
}

/// Accumulate `scale * dLoss/dParams` for one sample into `grads`
fn backward(
    params: &[f64],
    layout: Layout,
    pass: &ForwardPass,
    target: &Channels,
    scale: f64,
    grads: &mut [f64],
) {
    let hsize = layout.hidden;
    let concat = layout.concat();

    let dy: Vec<f64> = pass
        .output
        .iter()
        .zip(target.iter())
        .map(|(y, t)| scale * 2.0 * (y - t) / CHANNELS as f64)
        .collect();

    let head = &params[layout.head_weights()];
    let head_start = layout.head_weights().start;
    let head_bias_start = layout.head_bias().start;
    let mut dh = vec![0.0; hsize];
    for (j, &d) in dy.iter().enumerate() {
        grads[head_bias_start + j] += d;
        for k in 0..hsize {
            grads[head_start + j * hsize + k] += d * pass.hidden[k];
            dh[k] += head[j * hsize + k] * d;
        }
    }

    let weights = &params[layout.gate_weights()];
    let weights_start = layout.gate_weights().start;
    let bias_start = layout.gate_bias().start;
    let mut dc = vec![0.0; hsize];
    let mut dz = vec![0.0; layout.gate_rows()];

    for step in pass.steps.iter().rev() {
        for k in 0..hsize {
            let d_output = dh[k] * step.tanh_c[k];
            let d_cell = dc[k] + dh[k] * step.output_gate[k] * tanh_grad(step.tanh_c[k]);

            dz[k] = d_cell * step.cell_gate[k] * sigmoid_grad(step.input_gate[k]);
            dz[hsize + k] = d_cell * step.c_prev[k] * sigmoid_grad(step.forget_gate[k]);
            dz[2 * hsize + k] = d_cell * step.input_gate[k] * tanh_grad(step.cell_gate[k]);
            dz[3 * hsize + k] = d_output * sigmoid_grad(step.output_gate[k]);

            dc[k] = d_cell * step.forget_gate[k];
        }

        let mut dh_prev = vec![0.0; hsize];
        for (r, &d) in dz.iter().enumerate() {
            if d == 0.0 {
                continue;
            }
            grads[bias_start + r] += d;
            let offset = r * concat;
            for col in 0..concat {
                grads[weights_start + offset + col] += d * step.xh[col];
                if col >= layout.input {
                    dh_prev[col - layout.input] += weights[offset + col] * d;
                }
            }
        }
        dh = dh_prev;
    }
}

fn mean_loss(params: &[f64], layout: Layout, windows: &[Vec<Channels>], targets: &[Channels]) -> f64 {
    let total: f64 = windows
        .iter()
        .zip(targets.iter())
        .map(|(w, t)| sample_loss(&forward(params, layout, w).output, t))
        .sum();
    total / windows.len() as f64
}

impl Lstm {
    /// Create an LSTM with the given hyperparameters
    pub fn new(config: LstmConfig) -> Result<Self> {
        if config.hidden_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "hidden_size must be positive".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "batch_size must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&config.validation_split) {
            return Err(ForecastError::InvalidParameter(
                "validation_split must be in [0, 1)".to_string(),
            ));
        }
        if config.learning_rate.is_nan() || config.learning_rate <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "learning_rate must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: LSTM_NAME.to_string(),
            config,
        })
    }

    /// Hyperparameters of this model
    pub fn config(&self) -> &LstmConfig {
        &self.config
    }

    fn layout(&self) -> Layout {
        Layout {
            input: CHANNELS,
            hidden: self.config.hidden_size,
            output: CHANNELS,
        }
    }

    /// Glorot-uniform weights, zero biases, forget-gate bias of one
    fn initial_params(&self, layout: Layout) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut params = vec![0.0; layout.total()];

        let gate_limit = (6.0 / (layout.concat() + layout.gate_rows()) as f64).sqrt();
        for w in &mut params[layout.gate_weights()] {
            *w = rng.gen_range(-gate_limit..gate_limit);
        }

        let bias_start = layout.gate_bias().start;
        for k in 0..layout.hidden {
            params[bias_start + layout.hidden + k] = 1.0;
        }

        let head_limit = (6.0 / (layout.hidden + layout.output) as f64).sqrt();
        for w in &mut params[layout.head_weights()] {
            *w = rng.gen_range(-head_limit..head_limit);
        }

        params
    }

    /// Number of windows used for gradient updates; the rest validate
    fn training_count(&self, samples: usize) -> usize {
        if samples < 2 {
            return samples;
        }
        let held_out = (samples as f64 * self.config.validation_split).round() as usize;
        samples - held_out.min(samples - 1)
    }
}

impl Default for Lstm {
    fn default() -> Self {
        Self {
            name: LSTM_NAME.to_string(),
            config: LstmConfig::default(),
        }
    }
}

impl SequenceModel for Lstm {
    type Trained = TrainedLstm;

    fn train(
        &self,
        windows: &[Vec<Channels>],
        targets: &[Channels],
        epochs: usize,
    ) -> Result<Self::Trained> {
        if windows.len() != targets.len() {
            return Err(ForecastError::Transform(format!(
                "Windows ({}) and targets ({}) differ in length",
                windows.len(),
                targets.len()
            )));
        }
        if windows.is_empty() || windows.iter().any(|w| w.is_empty()) {
            return Err(ForecastError::Transform(
                "Cannot train on empty windows".to_string(),
            ));
        }
        if epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "epochs must be positive".to_string(),
            ));
        }

        let layout = self.layout();
        let mut params = self.initial_params(layout);
        let mut optimizer = Adam::new(layout.total(), self.config.learning_rate)?;

        let split = self.training_count(windows.len());
        let (train_windows, val_windows) = windows.split_at(split);
        let (train_targets, val_targets) = targets.split_at(split);

        debug!(
            training = train_windows.len(),
            validation = val_windows.len(),
            epochs,
            "Training LSTM"
        );

        let mut grads = vec![0.0; layout.total()];
        for epoch in 0..epochs {
            for start in (0..train_windows.len()).step_by(self.config.batch_size) {
                let end = (start + self.config.batch_size).min(train_windows.len());
                let scale = 1.0 / (end - start) as f64;

                grads.iter_mut().for_each(|g| *g = 0.0);
                for idx in start..end {
                    let pass = forward(&params, layout, &train_windows[idx]);
                    backward(&params, layout, &pass, &train_targets[idx], scale, &mut grads);
                }
                optimizer.update(&mut params, &grads)?;
            }
            trace!(
                epoch,
                loss = mean_loss(&params, layout, train_windows, train_targets),
                "Epoch finished"
            );
        }

        let training_loss = mean_loss(&params, layout, train_windows, train_targets);
        if !training_loss.is_finite() {
            return Err(ForecastError::Transform(
                "Training diverged to a non-finite loss".to_string(),
            ));
        }
        let validation_loss = if val_windows.is_empty() {
            None
        } else {
            Some(mean_loss(&params, layout, val_windows, val_targets))
        };

        Ok(TrainedLstm {
            name: self.name.clone(),
            layout,
            params,
            report: TrainingReport {
                epochs,
                training_samples: train_windows.len(),
                validation_samples: val_windows.len(),
                training_loss,
                validation_loss,
            },
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSequenceModel for TrainedLstm {
    fn predict(&self, window: &[Channels]) -> Result<Channels> {
        if window.is_empty() {
            return Err(ForecastError::Transform(
                "Cannot predict from an empty window".to_string(),
            ));
        }
        if self.params.len() != self.layout.total() {
            return Err(ForecastError::Transform(format!(
                "Model has {} parameters, layout expects {}",
                self.params.len(),
                self.layout.total()
            )));
        }

        let output = forward(&self.params, self.layout, window).output;
        if output.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::Transform(
                "Model produced a non-finite prediction".to_string(),
            ));
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn report(&self) -> &TrainingReport {
        &self.report
    }
}
