use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use sensor_forecast::data::parse_timestamp;
use sensor_forecast::models::TrainingReport;
use sensor_forecast::response::{PredictResponse, TrainResponse};
use sensor_forecast::store::{MODEL_FILE, SCALER_FILE};
use sensor_forecast::{
    Channels, ForecastConfig, ForecastEngine, ForecastError, Reading, SequenceModel,
    TrainedSequenceModel,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use tempfile::{tempdir, TempDir};

const START: &str = "2024-05-01T10:00:00Z";

// Readings every five minutes with gently varying channels
fn field_readings(n: usize) -> Vec<Reading> {
    let start = parse_timestamp(START).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64 * 0.35;
            Reading::new(
                24.0 + 3.0 * t.sin(),
                62.0 + 8.0 * t.cos(),
                38.0 - 0.2 * i as f64,
            )
            .with_timestamp((start + Duration::minutes(5 * i as i64)).to_rfc3339())
        })
        .collect()
}

fn engine_in(dir: &TempDir) -> ForecastEngine {
    ForecastEngine::new(ForecastConfig::new(dir.path())).unwrap()
}

/// Deterministic model: either a fixed normalized output or the last row
/// of the window plus a constant drift
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScriptedModel {
    fixed: Option<Channels>,
    drift: Channels,
    report: TrainingReport,
}

impl ScriptedModel {
    fn new(fixed: Option<Channels>, drift: Channels) -> Self {
        Self {
            fixed,
            drift,
            report: TrainingReport {
                epochs: 0,
                training_samples: 0,
                validation_samples: 0,
                training_loss: 0.0,
                validation_loss: None,
            },
        }
    }
}

impl SequenceModel for ScriptedModel {
    type Trained = ScriptedModel;

    fn train(
        &self,
        windows: &[Vec<Channels>],
        _targets: &[Channels],
        epochs: usize,
    ) -> Result<Self::Trained, ForecastError> {
        let mut trained = self.clone();
        trained.report.epochs = epochs;
        trained.report.training_samples = windows.len();
        Ok(trained)
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

impl TrainedSequenceModel for ScriptedModel {
    fn predict(&self, window: &[Channels]) -> Result<Channels, ForecastError> {
        if window.len() != 10 {
            return Err(ForecastError::Transform(format!(
                "window of {} rows",
                window.len()
            )));
        }
        if let Some(fixed) = self.fixed {
            return Ok(fixed);
        }
        let last = window[window.len() - 1];
        Ok([
            last[0] + self.drift[0],
            last[1] + self.drift[1],
            last[2] + self.drift[2],
        ])
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    fn report(&self) -> &TrainingReport {
        &self.report
    }
}

// Ten readings alternating between the channel extremes, then a constant tail
fn bounded_readings() -> Vec<Reading> {
    let mut readings: Vec<Reading> = (0..10)
        .map(|i| {
            if i % 2 == 0 {
                Reading::new(20.0, 60.0, 30.0)
            } else {
                Reading::new(30.0, 80.0, 40.0)
            }
        })
        .collect();
    readings.extend((0..15).map(|_| Reading::new(25.0, 70.0, 35.0)));
    readings
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let ts = parse_timestamp(START).unwrap() + Duration::minutes(5 * i as i64);
            r.with_timestamp(ts.to_rfc3339())
        })
        .collect()
}

#[test]
fn test_train_with_exactly_one_window_of_readings_fails() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);

    let result = engine.train(&field_readings(10), 5);
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientWindows {
            needed: 10,
            available: 0
        })
    ));
    assert!(!engine.store().exists());

    let response = serde_json::to_value(TrainResponse::from(result)).unwrap();
    assert_eq!(response["success"], json!(false));
}

#[test]
fn test_train_below_sequence_length_reports_counts() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);

    assert!(matches!(
        engine.train(&field_readings(7), 5),
        Err(ForecastError::InsufficientData {
            needed: 10,
            available: 7
        })
    ));
}

#[test]
fn test_train_on_25_readings() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);

    let summary = engine.train(&field_readings(25), 5).unwrap();
    assert_eq!(summary.sequences, 15);
    assert_eq!(summary.readings, 25);
    assert_eq!(summary.report.epochs, 5);
    assert!(engine.is_ready());
    assert!(dir.path().join(MODEL_FILE).is_file());
    assert!(dir.path().join(SCALER_FILE).is_file());

    let response = serde_json::to_value(TrainResponse::from(Ok(summary))).unwrap();
    assert_eq!(
        response,
        json!({"success": true, "message": "Model trained on 25 readings", "sequences": 15})
    );
}

#[test]
fn test_predict_without_model_and_too_few_readings() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);

    let result = engine.predict_next(&field_readings(15), 6);
    assert!(matches!(
        result,
        Err(ForecastError::ModelUnavailable {
            needed: 20,
            available: 15
        })
    ));

    let response = serde_json::to_value(PredictResponse::from(result)).unwrap();
    assert_eq!(
        response,
        json!({
            "error": "No pre-trained model found and not enough data to train",
            "needed": 20,
            "available": 15
        })
    );
}

#[test]
fn test_predict_three_steps() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);
    let readings = field_readings(25);
    engine.train(&readings, 5).unwrap();

    let forecast = engine.predict_next(&readings, 3).unwrap();
    assert_eq!(forecast.predictions.len(), 3);
    assert_eq!(forecast.model, "LSTM");
    assert_eq!(forecast.sequence_length, 10);

    let confidences: Vec<u32> = forecast.predictions.iter().map(|p| p.confidence).collect();
    assert_eq!(confidences, vec![95, 88, 81]);

    let last = parse_timestamp(readings[24].timestamp.as_deref().unwrap()).unwrap();
    for (i, prediction) in forecast.predictions.iter().enumerate() {
        let ts = parse_timestamp(&prediction.timestamp).unwrap();
        assert_eq!(ts, last + Duration::minutes(5 * (i as i64 + 1)));
        assert!(prediction.is_prediction);
        assert!((0.0..=50.0).contains(&prediction.temperature));
        assert!((0.0..=100.0).contains(&prediction.humidity));
        assert!((0.0..=100.0).contains(&prediction.soil_moisture));
    }
}

#[test]
fn test_confidence_floor_over_long_horizon() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);
    let readings = field_readings(25);
    engine.train(&readings, 2).unwrap();

    let forecast = engine.predict_next(&readings, 12).unwrap();
    let confidences: Vec<u32> = forecast.predictions.iter().map(|p| p.confidence).collect();
    assert_eq!(confidences, vec![95, 88, 81, 74, 67, 60, 53, 50, 50, 50, 50, 50]);
}

#[test]
fn test_unrepresentable_horizon_is_rejected() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(None, [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let readings = bounded_readings();
    engine.train(&readings, 1).unwrap();

    assert!(matches!(
        engine.predict_next(&readings, usize::MAX),
        Err(ForecastError::InvalidParameter(_))
    ));

    let forecast = engine.predict_next(&readings, 0).unwrap();
    assert!(forecast.predictions.is_empty());
}

#[test]
fn test_reloaded_model_predicts_identically() {
    let dir = tempdir().unwrap();
    let readings = field_readings(30);

    let mut first = engine_in(&dir);
    first.train(&readings, 5).unwrap();
    let before = first.predict_next(&readings, 6).unwrap();

    let mut second = engine_in(&dir);
    assert!(!second.is_ready());
    let after = second.predict_next(&readings[20..], 6).unwrap();

    assert!(second.is_ready());
    assert_eq!(before, after);
}

#[test]
fn test_predict_trains_in_place_when_enough_readings() {
    let dir = tempdir().unwrap();
    let config = ForecastConfig::new(dir.path()).with_fallback_epochs(3);
    let mut engine = ForecastEngine::new(config).unwrap();

    let forecast = engine.predict_next(&field_readings(22), 2).unwrap();
    assert_eq!(forecast.predictions.len(), 2);
    assert!(engine.store().exists());
}

#[test]
fn test_single_artifact_is_not_usable() {
    let dir = tempdir().unwrap();
    let readings = field_readings(25);
    engine_in(&dir).train(&readings, 2).unwrap();
    fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();

    let mut engine = engine_in(&dir);
    assert!(matches!(
        engine.predict_next(&readings[..15], 3),
        Err(ForecastError::ModelUnavailable { .. })
    ));
}

#[test]
fn test_in_memory_model_takes_precedence() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);
    let readings = field_readings(25);
    engine.train(&readings, 2).unwrap();

    fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();
    fs::remove_file(dir.path().join(SCALER_FILE)).unwrap();

    assert!(engine.predict_next(&readings[..12], 2).is_ok());
}

#[test]
fn test_predict_with_loaded_model_needs_a_full_seed() {
    let dir = tempdir().unwrap();
    let mut engine = engine_in(&dir);
    let readings = field_readings(25);
    engine.train(&readings, 2).unwrap();

    assert!(matches!(
        engine.predict_next(&readings[..6], 2),
        Err(ForecastError::InsufficientData {
            needed: 10,
            available: 6
        })
    ));
}

#[test]
fn test_clamping_happens_after_inverse_transform() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(Some([-1.0, 2.16, 8.0]), [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let readings = bounded_readings();
    engine.train(&readings, 1).unwrap();

    let forecast = engine.predict_next(&readings, 2).unwrap();
    for prediction in &forecast.predictions {
        assert_eq!(prediction.temperature, 10.0);
        assert_eq!(prediction.humidity, 100.0);
        assert_eq!(prediction.soil_moisture, 100.0);
    }
    assert_eq!(forecast.model, "Scripted");
}

#[test]
fn test_unrounded_predictions_feed_the_next_step() {
    let dir = tempdir().unwrap();
    // +0.004 normalized is +0.04 C on the fitted 20..30 range
    let model = ScriptedModel::new(None, [0.004, 0.0, 0.0]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let readings = bounded_readings();
    engine.train(&readings, 1).unwrap();

    let forecast = engine.predict_next(&readings, 4).unwrap();
    let temperatures: Vec<f64> = forecast.predictions.iter().map(|p| p.temperature).collect();
    assert_eq!(temperatures, vec![25.0, 25.1, 25.1, 25.2]);

    let last = &forecast.predictions[3];
    assert_eq!(last.humidity, 70.0);
    assert_eq!(last.soil_moisture, 35.0);
}

#[test]
fn test_timestamp_offset_is_preserved() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(None, [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let mut readings = bounded_readings();
    engine.train(&readings, 1).unwrap();

    let last = readings.len() - 1;
    readings[last].timestamp = Some("2024-05-01T14:00:00+02:00".to_string());
    let forecast = engine.predict_next(&readings, 2).unwrap();

    assert_eq!(forecast.predictions[0].timestamp, "2024-05-01T14:05:00+02:00");
    assert_eq!(forecast.predictions[1].timestamp, "2024-05-01T14:10:00+02:00");
}

#[test]
fn test_missing_timestamp_uses_current_time() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(None, [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let readings: Vec<Reading> = bounded_readings()
        .into_iter()
        .map(|mut r| {
            r.timestamp = None;
            r
        })
        .collect();
    engine.train(&readings, 1).unwrap();

    let before: DateTime<Utc> = Utc::now();
    let forecast = engine.predict_next(&readings, 1).unwrap();
    let after: DateTime<Utc> = Utc::now();

    let ts = parse_timestamp(&forecast.predictions[0].timestamp).unwrap();
    assert!(ts >= before + Duration::minutes(5) - Duration::seconds(1));
    assert!(ts <= after + Duration::minutes(5) + Duration::seconds(1));
}

#[test]
fn test_invalid_timestamp_is_malformed_input() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(None, [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let mut readings = bounded_readings();
    engine.train(&readings, 1).unwrap();

    let last = readings.len() - 1;
    readings[last].timestamp = Some("last tuesday".to_string());
    assert!(matches!(
        engine.predict_next(&readings, 1),
        Err(ForecastError::MalformedInput(_))
    ));
}

#[test]
fn test_retraining_replaces_scaler() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(None, [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();

    engine.train(&bounded_readings(), 1).unwrap();
    let first = fs::read_to_string(dir.path().join(SCALER_FILE)).unwrap();

    engine.train(&field_readings(25), 1).unwrap();
    let second = fs::read_to_string(dir.path().join(SCALER_FILE)).unwrap();

    assert_ne!(first, second);
}

#[test]
fn test_evaluate_walks_every_window() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new(None, [0.0; 3]);
    let mut engine = ForecastEngine::with_model(ForecastConfig::new(dir.path()), model).unwrap();
    let readings = bounded_readings();
    engine.train(&readings, 1).unwrap();

    let evaluation = engine.evaluate(&readings).unwrap();
    assert_eq!(evaluation.samples, 15);
    // A persistence forecast is exact on the constant tail
    assert!(evaluation.channels[0].mae < 5.0);
    assert!(evaluation.channels.iter().all(|c| c.rmse >= c.mae));
}
