//! Error metrics for evaluating forecasts

use crate::{MathError, Result};

fn check_lengths(forecast: &[f64], actual: &[f64]) -> Result<()> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(MathError::InvalidInput(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Mean Squared Error
pub fn mse(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    let n = forecast.len() as f64;
    Ok(forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (a - f).powi(2))
        .sum::<f64>()
        / n)
}

/// Mean Absolute Error
pub fn mae(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(forecast, actual)?;
    let n = forecast.len() as f64;
    Ok(forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (a - f).abs())
        .sum::<f64>()
        / n)
}

/// Root Mean Squared Error
pub fn rmse(forecast: &[f64], actual: &[f64]) -> Result<f64> {
    Ok(mse(forecast, actual)?.sqrt())
}
