//! Command line front end: reads readings as JSON on stdin and writes one
//! JSON result object on stdout.
//!
//! ```text
//! sensor_predictor train   < history.json
//! sensor_predictor predict 6 < recent.json
//! ```

use clap::error::ErrorKind;
use clap::Parser;
use sensor_forecast::config::DEFAULT_MODEL_DIR;
use sensor_forecast::response::{ErrorBody, EvaluateResponse, PredictResponse, TrainResponse};
use sensor_forecast::{parse_readings, ForecastConfig, ForecastEngine, ForecastError, Reading};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const ACTIONS: [&str; 3] = ["train", "predict", "evaluate"];

#[derive(Parser, Debug)]
#[command(name = "sensor_predictor")]
#[command(about = "LSTM forecasting of temperature, humidity and soil moisture", long_about = None)]
struct Cli {
    /// Action to run (train, predict, evaluate)
    action: Option<String>,

    /// Number of future readings to predict; negative counts predict nothing
    #[arg(allow_negative_numbers = true)]
    steps: Option<String>,

    /// Directory holding the trained model and scaler
    #[arg(long, env = "SENSOR_MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    /// Training epochs (train only)
    #[arg(long)]
    epochs: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SENSOR_FORECAST_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Write the single JSON result object
fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{}", json),
        Err(e) => println!(
            "{}",
            serde_json::json!({ "error": format!("Failed to encode result: {}", e) })
        ),
    }
}

fn read_readings() -> Result<Vec<Reading>, ForecastError> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    parse_readings(&input)
}

/// Parse a step count; negative counts mean no steps
fn parse_steps(arg: &str) -> Option<usize> {
    match arg.parse::<usize>() {
        Ok(steps) => Some(steps),
        Err(_) => match arg.parse::<i64>() {
            Ok(n) if n < 0 => Some(0),
            _ => None,
        },
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            emit(&ErrorBody::message("Invalid arguments").with_details(e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    let Some(action) = cli.action else {
        emit(&ErrorBody::message("Usage: sensor_predictor <action> [steps]").with_actions(&ACTIONS));
        return ExitCode::FAILURE;
    };

    let config = ForecastConfig::new(&cli.model_dir);
    let mut engine = match ForecastEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            emit(&ErrorBody::message("Model directory unavailable").with_details(e.to_string()));
            return ExitCode::FAILURE;
        }
    };

    match action.as_str() {
        "train" => {
            let epochs = cli.epochs.unwrap_or(engine.config().train_epochs);
            let result = read_readings().and_then(|readings| engine.train(&readings, epochs));
            emit(&TrainResponse::from(result));
        }
        "predict" => {
            let steps = match cli.steps.as_deref() {
                None => Some(engine.config().default_steps),
                Some(arg) => parse_steps(arg),
            };
            let Some(steps) = steps else {
                emit(&ErrorBody::message(format!(
                    "Invalid step count: {}",
                    cli.steps.unwrap_or_default()
                )));
                return ExitCode::FAILURE;
            };
            let result = read_readings().and_then(|readings| engine.predict_next(&readings, steps));
            emit(&PredictResponse::from(result));
        }
        "evaluate" => {
            let result = read_readings().and_then(|readings| engine.evaluate(&readings));
            emit(&EvaluateResponse::from(result));
        }
        other => {
            emit(&ErrorBody::message(format!("Unknown action: {}", other)));
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
