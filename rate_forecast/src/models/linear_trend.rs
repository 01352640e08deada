//! Straight-line trend over the month index

use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel, TrainingSet};

/// Ordinary least squares fit of value against month index
#[derive(Debug, Clone, Default)]
pub struct LinearTrend;

/// Fitted slope and intercept
#[derive(Debug, Clone)]
pub struct TrainedLinearTrend {
    slope: f64,
    intercept: f64,
}

impl LinearTrend {
    /// Create a new linear trend model
    pub fn new() -> Self {
        Self
    }
}

/// Least squares line through `(i, values[i])`
fn fit_line(values: &[f64]) -> Result<(f64, f64)> {
    if values.len() < 2 {
        return Err(ForecastError::insufficient(
            2,
            values.len(),
            "fitting a linear trend",
        ));
    }

    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let (numerator, denominator) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, &y)| {
        let dx = i as f64 - x_mean;
        (num + dx * (y - y_mean), den + dx * dx)
    });

    let slope = numerator / denominator;
    Ok((slope, y_mean - slope * x_mean))
}

impl ForecastModel for LinearTrend {
    type Trained = TrainedLinearTrend;

    fn train(&self, data: &TrainingSet<'_>) -> Result<TrainedLinearTrend> {
        let (slope, intercept) = fit_line(data.series)?;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(ForecastError::NumericalFault(
                "linear trend fit produced non-finite coefficients".to_string(),
            ));
        }

        Ok(TrainedLinearTrend {
            slope,
            intercept,
        })
    }

    fn name(&self) -> &str {
        "LinearTrend"
    }
}

impl TrainedLinearTrend {
    /// Fitted slope per month (normalized units)
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Fitted intercept at month zero (normalized units)
    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl TrainedForecastModel for TrainedLinearTrend {
    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        match window.last() {
            Some(last) => Ok(last + self.slope),
            None => Err(ForecastError::insufficient(1, 0, "linear trend prediction")),
        }
    }

    // Month indices count from the start of `history`, the same origin as the fit
    fn native_forecast(&self, history: &[f64], horizon: usize) -> Option<Result<Vec<f64>>> {
        let n = history.len();
        Some(Ok((n..n + horizon)
            .map(|i| self.intercept + self.slope * i as f64)
            .collect()))
    }

    fn name(&self) -> &str {
        "LinearTrend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_perfect_line() {
        let series = vec![10.0, 20.0, 30.0];
        let cancel = CancellationToken::new();
        let data = TrainingSet {
            inputs: &[],
            targets: &[],
            series: &series,
            look_back: 1,
            cancel: &cancel,
        };
        let trained = LinearTrend::new().train(&data).unwrap();
        assert_abs_diff_eq!(trained.slope(), 10.0, epsilon = 1e-12);

        let forecast = trained.native_forecast(&series, 2).unwrap().unwrap();
        assert_abs_diff_eq!(forecast[0], 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(forecast[1], 50.0, epsilon = 1e-9);

        // A longer observed history moves the starting point forward
        let extended = [10.0, 20.0, 30.0, 40.0, 50.0];
        let forecast = trained.native_forecast(&extended, 1).unwrap().unwrap();
        assert_abs_diff_eq!(forecast[0], 60.0, epsilon = 1e-9);
        assert_abs_diff_eq!(trained.predict_one(&[20.0, 30.0]).unwrap(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_needs_two_points() {
        assert!(fit_line(&[1.0]).is_err());
    }
}
