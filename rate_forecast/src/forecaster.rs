//! Recursive multi-step forecasting

use crate::error::{ForecastError, Result};
use crate::forecast::ForecastVector;
use crate::models::TrainedForecastModel;
use crate::scaler::MinMaxScaler;
use std::collections::VecDeque;
use tracing::debug;

/// Forecast `horizon` months past the end of `series` (raw units)
///
/// The window is seeded with the normalized tail of `series`; each
/// prediction is pushed in as the newest element and the oldest dropped.
/// Predictions stay normalized until the loop ends and are inverted in one
/// batch. Models with a native multi-step forecast are asked once instead,
/// continuing the whole normalized `series`.
pub fn forecast(
    model: &dyn TrainedForecastModel,
    series: &[f64],
    transform: &MinMaxScaler,
    look_back: usize,
    horizon: usize,
) -> Result<ForecastVector> {
    if horizon == 0 {
        return Ok(ForecastVector::default());
    }

    let history = transform.transform_slice(series)?;
    let normalized = match model.native_forecast(&history, horizon) {
        Some(result) => {
            debug!(model = model.name(), horizon, "using native multi-step forecast");
            let values = result?;
            if values.len() != horizon {
                return Err(ForecastError::ShapeMismatch {
                    expected: horizon,
                    got: values.len(),
                });
            }
            values
        }
        None => recursive_steps(model, &history, look_back, horizon)?,
    };

    Ok(ForecastVector::new(transform.inverse_slice(&normalized)?))
}

fn recursive_steps(
    model: &dyn TrainedForecastModel,
    history: &[f64],
    look_back: usize,
    horizon: usize,
) -> Result<Vec<f64>> {
    if look_back == 0 {
        return Err(ForecastError::InvalidParameter(
            "look_back must be at least 1".to_string(),
        ));
    }
    if history.len() < look_back {
        return Err(ForecastError::insufficient(
            look_back,
            history.len(),
            "seeding the forecast window",
        ));
    }

    let mut window: VecDeque<f64> = history[history.len() - look_back..].iter().copied().collect();
    let mut predictions = Vec::with_capacity(horizon);

    for step in 0..horizon {
        let next = model.predict_one(window.make_contiguous())?;
        if !next.is_finite() {
            return Err(ForecastError::NumericalFault(format!(
                "non-finite prediction at step {}",
                step + 1
            )));
        }
        window.pop_front();
        window.push_back(next);
        predictions.push(next);
    }

    debug!(model = model.name(), horizon, "recursive forecast finished");
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::cell::RefCell;

    /// Predicts the mean of the window plus a fixed step and records every window seen
    #[derive(Debug, Default)]
    struct RecordingModel {
        step: f64,
        seen: RefCell<Vec<Vec<f64>>>,
    }

    impl TrainedForecastModel for RecordingModel {
        fn predict_one(&self, window: &[f64]) -> Result<f64> {
            self.seen.borrow_mut().push(window.to_vec());
            Ok(window.iter().sum::<f64>() / window.len() as f64 + self.step)
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    /// Repeats the last value of the history it is handed
    #[derive(Debug, Default)]
    struct NativeModel {
        history: RefCell<Vec<f64>>,
    }

    impl TrainedForecastModel for NativeModel {
        fn predict_one(&self, _window: &[f64]) -> Result<f64> {
            Err(ForecastError::NumericalFault("must not be called".to_string()))
        }

        fn native_forecast(&self, history: &[f64], horizon: usize) -> Option<Result<Vec<f64>>> {
            *self.history.borrow_mut() = history.to_vec();
            history.last().map(|last| Ok(vec![*last; horizon]))
        }

        fn name(&self) -> &str {
            "native"
        }
    }

    #[test]
    fn test_zero_horizon_skips_model() {
        let model = RecordingModel::default();
        let transform = MinMaxScaler::fit(&[0.0, 1.0]).unwrap();
        let result = forecast(&model, &[0.0, 1.0], &transform, 2, 0).unwrap();
        assert!(result.is_empty());
        assert!(model.seen.borrow().is_empty());
    }

    #[test]
    fn test_predictions_are_fed_back() {
        let model = RecordingModel {
            step: 0.1,
            ..Default::default()
        };
        let series = [0.0, 2.0, 4.0, 10.0];
        let transform = MinMaxScaler::fit(&series).unwrap();

        let result = forecast(&model, &series, &transform, 2, 3).unwrap();
        let seen = model.seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], vec![0.4, 1.0]);

        // Each window ends with the previous prediction
        let p1 = 0.7 + 0.1;
        assert_abs_diff_eq!(seen[1][0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(seen[1][1], p1, epsilon = 1e-12);
        let p2 = (1.0 + p1) / 2.0 + 0.1;
        assert_abs_diff_eq!(seen[2][1], p2, epsilon = 1e-12);

        let p3 = (p1 + p2) / 2.0 + 0.1;
        assert_abs_diff_eq!(result.values()[0], p1 * 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.values()[2], p3 * 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_native_forecast_is_preferred() {
        let model = NativeModel::default();
        let transform = MinMaxScaler::fit(&[2.0, 4.0]).unwrap();
        let result = forecast(&model, &[2.0, 4.0, 3.0], &transform, 12, 4).unwrap();
        assert_eq!(result.values(), &[3.0, 3.0, 3.0, 3.0]);
        assert_eq!(*model.history.borrow(), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_short_series() {
        let model = RecordingModel::default();
        let transform = MinMaxScaler::fit(&[1.0, 2.0]).unwrap();
        let result = forecast(&model, &[1.0, 2.0], &transform, 3, 1);
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData { needed: 3, got: 2, .. })
        ));
    }
}
