//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Error metrics for forecast evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// Mean Squared Error
    pub mse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

/// Square root clamped at zero, so rounding noise below zero cannot yield NaN
pub fn safe_sqrt(value: f64) -> f64 {
    value.max(0.0).sqrt()
}

/// Evaluate predictions against actual values, element by element in order
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<ErrorMetrics> {
    if actual.len() != predicted.len() {
        return Err(ForecastError::ShapeMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ForecastError::insufficient(1, 0, "evaluating a forecast"));
    }

    let n = actual.len() as f64;
    let (sq, abs) = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| a - p)
        .fold((0.0, 0.0), |(sq, abs), e| (sq + e * e, abs + e.abs()));

    let mse = sq / n;
    let mae = abs / n;
    if !mse.is_finite() || !mae.is_finite() {
        return Err(ForecastError::NumericalFault(
            "non-finite error while evaluating forecast".to_string(),
        ));
    }

    Ok(ErrorMetrics {
        mse,
        mae,
        rmse: safe_sqrt(mse),
    })
}

impl ErrorMetrics {
    /// Average a set of per-fold metrics
    pub fn mean(metrics: &[ErrorMetrics]) -> Option<ErrorMetrics> {
        if metrics.is_empty() {
            return None;
        }
        let n = metrics.len() as f64;
        Some(ErrorMetrics {
            mse: metrics.iter().map(|m| m.mse).sum::<f64>() / n,
            mae: metrics.iter().map(|m| m.mae).sum::<f64>() / n,
            rmse: metrics.iter().map(|m| m.rmse).sum::<f64>() / n,
        })
    }
}

impl std::fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MSE: {:.4}, MAE: {:.4}, RMSE: {:.4}",
            self.mse, self.mae, self.rmse
        )
    }
}
