//! Reversible min-max normalization fit once per training run

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Min-max transform mapping the fitted range onto `[0, 1]`
///
/// A constant series (`max == min` exactly) produces a degenerate
/// transform: every value maps to `0.0` and every normalized value inverts
/// back to the constant. Any non-zero range, however small, is scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: f64,
    max: f64,
}

impl MinMaxScaler {
    /// Fit the bounds on a series
    pub fn fit(series: &[f64]) -> Result<Self> {
        if series.is_empty() {
            return Err(ForecastError::insufficient(1, 0, "fitting a normalization transform"));
        }
        check_finite(series, "entering normalization")?;

        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let scaler = Self { min, max };
        if scaler.is_degenerate() {
            warn!(value = min, "constant series, normalization is degenerate");
        }
        Ok(scaler)
    }

    /// Lower bound seen during fitting
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound seen during fitting
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether the fitted range has zero width
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Normalize a single raw value
    pub fn transform(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.min) / self.range()
        }
    }

    /// Normalize a slice of raw values
    pub fn transform_slice(&self, values: &[f64]) -> Result<Vec<f64>> {
        check_finite(values, "entering normalization")?;
        Ok(values.iter().map(|&v| self.transform(v)).collect())
    }

    /// Map a normalized value back to original units
    pub fn inverse(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }

    /// Map a batch of normalized values back to original units
    pub fn inverse_slice(&self, values: &[f64]) -> Result<Vec<f64>> {
        check_finite(values, "leaving normalization")?;
        Ok(values.iter().map(|&v| self.inverse(v)).collect())
    }
}

fn check_finite(values: &[f64], stage: &str) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(ForecastError::NumericalFault(format!(
            "non-finite value {} at position {} {}",
            values[idx], idx, stage
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fit_and_transform_bounds() {
        let scaler = MinMaxScaler::fit(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
        assert_eq!(scaler.min(), 10.0);
        assert_eq!(scaler.max(), 50.0);
        assert_eq!(scaler.transform(10.0), 0.0);
        assert_eq!(scaler.transform(50.0), 1.0);
        assert_abs_diff_eq!(scaler.transform(30.0), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip() {
        let series = [1.05, 0.98, 0.87, 1.12, 0.45, 0.61];
        let scaler = MinMaxScaler::fit(&series).unwrap();
        let normalized = scaler.transform_slice(&series).unwrap();
        let restored = scaler.inverse_slice(&normalized).unwrap();
        for (a, b) in series.iter().zip(restored.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_series() {
        let scaler = MinMaxScaler::fit(&[1.0; 24]).unwrap();
        assert!(scaler.is_degenerate());
        let normalized = scaler.transform_slice(&[1.0; 24]).unwrap();
        assert!(normalized.iter().all(|&v| v == 0.0));
        assert_eq!(scaler.inverse(0.37), 1.0);
    }

    #[test]
    fn test_tiny_range_is_not_degenerate() {
        let series = [1.0, 1.0 + 4.0 * f64::EPSILON, 1.0 + 2.0 * f64::EPSILON];
        let scaler = MinMaxScaler::fit(&series).unwrap();
        assert!(!scaler.is_degenerate());

        let normalized = scaler.transform_slice(&series).unwrap();
        assert_eq!(normalized[0], 0.0);
        assert_eq!(normalized[1], 1.0);
        assert_abs_diff_eq!(normalized[2], 0.5, epsilon = 1e-12);

        let restored = scaler.inverse_slice(&normalized).unwrap();
        assert_eq!(restored[0], series[0]);
        assert_eq!(restored[1], series[1]);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(
            MinMaxScaler::fit(&[1.0, f64::NAN]),
            Err(ForecastError::NumericalFault(_))
        ));

        let scaler = MinMaxScaler::fit(&[0.0, 1.0]).unwrap();
        assert!(matches!(
            scaler.inverse_slice(&[0.5, f64::INFINITY]),
            Err(ForecastError::NumericalFault(_))
        ));
    }

    #[test]
    fn test_empty_series() {
        assert!(matches!(
            MinMaxScaler::fit(&[]),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
