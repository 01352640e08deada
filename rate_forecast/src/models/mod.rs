//! Forecasting models for monthly rate series
//!
//! Every variant is trained from the same [`TrainingSet`] and exposes the
//! same single-step contract through [`TrainedForecastModel`]. Variants that
//! are intrinsically multi-step also answer
//! [`TrainedForecastModel::native_forecast`], which the recursive forecaster
//! prefers over feeding predictions back.

use crate::cancel::CancellationToken;
use crate::error::Result;
use std::fmt::Debug;

/// Normalized material a model is fit on
///
/// `series` is the normalized history the windows were cut from, truncated
/// so that its last element is the last target. Sequence models learn from
/// `inputs`/`targets`; statistical models fit on `series` directly.
#[derive(Debug, Clone, Copy)]
pub struct TrainingSet<'a> {
    /// Input windows in chronological order
    pub inputs: &'a [Vec<f64>],
    /// One-step-ahead target per window
    pub targets: &'a [f64],
    /// Normalized history ending at the last target
    pub series: &'a [f64],
    /// Window length
    pub look_back: usize,
    /// Checked between epochs by iterative fits
    pub cancel: &'a CancellationToken,
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Predict the value that follows `window` (normalized space)
    fn predict_one(&self, window: &[f64]) -> Result<f64>;

    /// Predict the successor of each window
    fn predict_batch(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        windows.iter().map(|w| self.predict_one(w)).collect()
    }

    /// Direct multi-step forecast continuing `history` (normalized, oldest
    /// first), if the model produces one natively
    ///
    /// `history` may be longer than the series the model was fit on; the
    /// forecast always starts right after its last element.
    fn native_forecast(&self, _history: &[f64], _horizon: usize) -> Option<Result<Vec<f64>>> {
        None
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on windowed data
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model
    fn train(&self, data: &TrainingSet<'_>) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod linear_trend;
pub mod lstm;
pub mod sarima;

pub use linear_trend::{LinearTrend, TrainedLinearTrend};
pub use lstm::{LstmRegressor, TrainedLstm, TrainingHistory};
pub use sarima::{Sarima, TrainedSarima};
