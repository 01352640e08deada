//! Single-fit and cross-validated training over windowed, normalized data

use crate::cancel::CancellationToken;
use crate::config::{CrossValidationConfig, FoldSelection};
use crate::cross_validation::TimeSeriesSplit;
use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate, ErrorMetrics};
use crate::models::{ForecastModel, TrainedForecastModel, TrainingSet};
use crate::scaler::MinMaxScaler;
use crate::window::{prepare, PreparedData};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A fitted model bound to the transform and window length it was trained with
#[derive(Debug, Clone)]
pub struct TrainedModel<T> {
    /// Fitted model
    pub model: T,
    /// Normalization fit on the training series
    pub transform: MinMaxScaler,
    /// Window length
    pub look_back: usize,
}

impl<T> TrainedModel<T> {
    /// Convert the fitted model while keeping its transform and window length
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TrainedModel<U> {
        TrainedModel {
            model: f(self.model),
            transform: self.transform,
            look_back: self.look_back,
        }
    }
}

/// Test-range error of one fold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    /// Zero-based fold index
    pub fold: usize,
    /// Windows the fold trained on
    pub train_windows: usize,
    /// Windows the fold was scored on
    pub test_windows: usize,
    /// Errors in normalized units
    pub metrics: ErrorMetrics,
}

/// Per-fold diagnostics of a cross-validated training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    /// Reports in fold order
    pub folds: Vec<FoldReport>,
    /// Mean of the fold metrics
    pub mean: ErrorMetrics,
    /// Fold whose model was kept
    pub selected_fold: usize,
}

/// Outcome of [`train_with_cross_validation`]
#[derive(Debug, Clone)]
pub struct CrossValidatedModel<T> {
    /// The kept fold's model with its transform
    pub trained: TrainedModel<T>,
    /// Fold diagnostics
    pub report: CrossValidationReport,
}

impl<T> CrossValidatedModel<T> {
    /// Convert the kept model, leaving the report untouched
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CrossValidatedModel<U> {
        CrossValidatedModel {
            trained: self.trained.map(f),
            report: self.report,
        }
    }
}

fn training_set<'a>(
    prepared: &'a PreparedData,
    windows: std::ops::Range<usize>,
    cancel: &'a CancellationToken,
) -> TrainingSet<'a> {
    let look_back = prepared.look_back();
    TrainingSet {
        inputs: &prepared.inputs[windows.clone()],
        targets: &prepared.targets[windows.clone()],
        series: &prepared.normalized[windows.start..windows.end + look_back],
        look_back,
        cancel,
    }
}

/// Fit `model` once on every window of `series`
pub fn train<M: ForecastModel>(
    model: &M,
    series: &[f64],
    look_back: usize,
    cancel: &CancellationToken,
) -> Result<TrainedModel<M::Trained>> {
    let prepared = prepare(series, look_back)?;
    info!(
        model = model.name(),
        observations = series.len(),
        windows = prepared.len(),
        look_back,
        "training"
    );

    let data = training_set(&prepared, 0..prepared.len(), cancel);
    let trained = model.train(&data)?;

    Ok(TrainedModel {
        model: trained,
        transform: prepared.transform,
        look_back,
    })
}

/// Fit one independent model per expanding-window fold and score each on
/// the windows that follow its training range
///
/// `series` needs at least `look_back + n_splits + 1` observations: the
/// windows are cut into `n_splits + 1` equal blocks, the first block only
/// ever trains, and each fold is scored on the next block, so every fold
/// trains on a window and tests on at least one. Shorter series fail with
/// [`ForecastError::InsufficientData`].
///
/// The transform is fit once on the whole series, so fold test values
/// influence the scaling seen during training. Scores are reported in
/// normalized units.
pub fn train_with_cross_validation<M: ForecastModel>(
    model: &M,
    series: &[f64],
    look_back: usize,
    config: &CrossValidationConfig,
    cancel: &CancellationToken,
) -> Result<CrossValidatedModel<M::Trained>> {
    let splitter = TimeSeriesSplit::new(config.n_splits)?;
    let needed = look_back + config.n_splits + 1;
    if series.len() < needed {
        return Err(ForecastError::insufficient(
            needed,
            series.len(),
            format!(
                "{} time-ordered folds with look_back {}",
                config.n_splits, look_back
            ),
        ));
    }

    let prepared = prepare(series, look_back)?;
    let folds = splitter.split(prepared.len())?;
    info!(
        model = model.name(),
        folds = folds.len(),
        windows = prepared.len(),
        selection = ?config.selection,
        "cross-validating"
    );

    let mut reports = Vec::with_capacity(folds.len());
    let mut kept: Option<(usize, M::Trained, f64)> = None;

    for fold in &folds {
        cancel.check(&format!("fold {} of {}", fold.index + 1, folds.len()))?;

        let data = training_set(&prepared, fold.train.clone(), cancel);
        let trained = model.train(&data)?;

        let actual = &prepared.targets[fold.test.clone()];
        let predicted = match trained.native_forecast(data.series, actual.len()) {
            Some(result) => result?,
            None => trained.predict_batch(&prepared.inputs[fold.test.clone()])?,
        };
        let metrics = evaluate(actual, &predicted)?;
        info!(
            fold = fold.index + 1,
            mse = metrics.mse,
            mae = metrics.mae,
            rmse = metrics.rmse,
            "fold scored"
        );

        reports.push(FoldReport {
            fold: fold.index,
            train_windows: fold.train.len(),
            test_windows: fold.test.len(),
            metrics,
        });

        kept = match (config.selection, kept.take()) {
            (FoldSelection::BestByRmse, Some(best)) if best.2 <= metrics.rmse => Some(best),
            _ => Some((fold.index, trained, metrics.rmse)),
        };
    }

    let fold_metrics: Vec<ErrorMetrics> = reports.iter().map(|r| r.metrics).collect();
    let (selected_fold, model, mean) = match (kept, ErrorMetrics::mean(&fold_metrics)) {
        (Some((index, model, _)), Some(mean)) => (index, model, mean),
        _ => {
            return Err(ForecastError::insufficient(
                needed,
                series.len(),
                "cross-validation produced no folds",
            ))
        }
    };
    info!(selected_fold = selected_fold + 1, mean_rmse = mean.rmse, "cross-validation finished");

    Ok(CrossValidatedModel {
        trained: TrainedModel {
            model,
            transform: prepared.transform,
            look_back,
        },
        report: CrossValidationReport {
            folds: reports,
            mean,
            selected_fold,
        },
    })
}
