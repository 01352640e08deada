//! End-to-end forecasting pipeline with a selectable model variant

use crate::cancel::CancellationToken;
use crate::config::{ModelKind, PipelineConfig};
use crate::data::RateSeries;
use crate::error::Result;
use crate::forecast::ForecastVector;
use crate::forecaster;
use crate::models::{
    LinearTrend, LstmRegressor, Sarima, TrainedForecastModel, TrainedLinearTrend, TrainedLstm,
    TrainedSarima, TrainingHistory,
};
use crate::trainer::{self, CrossValidatedModel, CrossValidationReport, TrainedModel};
use crate::window::{prepare, PreparedData};
use serde::Serialize;
use tracing::info;

/// A fitted model of any variant
#[derive(Debug, Clone)]
pub enum FittedModel {
    /// Stacked LSTM regressor
    Lstm(TrainedLstm),
    /// Seasonal ARIMA
    Sarima(TrainedSarima),
    /// Straight-line trend
    LinearTrend(TrainedLinearTrend),
}

impl FittedModel {
    fn inner(&self) -> &dyn TrainedForecastModel {
        match self {
            FittedModel::Lstm(m) => m,
            FittedModel::Sarima(m) => m,
            FittedModel::LinearTrend(m) => m,
        }
    }

    /// Training loss curves, for the sequence regressor
    pub fn history(&self) -> Option<&TrainingHistory> {
        match self {
            FittedModel::Lstm(m) => Some(m.history()),
            _ => None,
        }
    }
}

impl TrainedForecastModel for FittedModel {
    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        self.inner().predict_one(window)
    }

    fn predict_batch(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        self.inner().predict_batch(windows)
    }

    fn native_forecast(&self, history: &[f64], horizon: usize) -> Option<Result<Vec<f64>>> {
        self.inner().native_forecast(history, horizon)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

/// Everything a pipeline run hands back
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Name of the model that produced the forecast
    pub model_name: String,
    /// Denormalized forecast
    pub forecast: ForecastVector,
    /// Loss curves of the sequence regressor
    pub history: Option<TrainingHistory>,
    /// Fold diagnostics when cross-validation was used
    pub cross_validation: Option<CrossValidationReport>,
}

/// Explicit pipeline: prepare, train, forecast
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl ForecastPipeline {
    /// Create a pipeline after validating `config`
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort training through `cancel`
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Token checked between epochs and folds
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Windows, targets and transform for `series`
    pub fn prepare(&self, series: &RateSeries) -> Result<PreparedData> {
        prepare(series.values(), self.config.look_back)
    }

    /// Single fit of the configured variant over the whole series
    pub fn train(&self, series: &RateSeries) -> Result<TrainedModel<FittedModel>> {
        let values = series.values();
        let look_back = self.config.look_back;
        match self.config.model {
            ModelKind::Lstm => {
                let model = LstmRegressor::new(self.config.lstm.clone())?;
                Ok(trainer::train(&model, values, look_back, &self.cancel)?.map(FittedModel::Lstm))
            }
            ModelKind::Sarima => {
                let model = Sarima::new(self.config.sarima.clone())?;
                Ok(trainer::train(&model, values, look_back, &self.cancel)?.map(FittedModel::Sarima))
            }
            ModelKind::LinearTrend => Ok(trainer::train(&LinearTrend::new(), values, look_back, &self.cancel)?
                .map(FittedModel::LinearTrend)),
        }
    }

    /// Cross-validated fit; the kept fold follows the configured selection
    pub fn train_with_cross_validation(
        &self,
        series: &RateSeries,
    ) -> Result<CrossValidatedModel<FittedModel>> {
        let values = series.values();
        let look_back = self.config.look_back;
        let cv = &self.config.cross_validation;
        match self.config.model {
            ModelKind::Lstm => {
                let model = LstmRegressor::new(self.config.lstm.clone())?.with_epochs(cv.epochs)?;
                Ok(
                    trainer::train_with_cross_validation(&model, values, look_back, cv, &self.cancel)?
                        .map(FittedModel::Lstm),
                )
            }
            ModelKind::Sarima => {
                let model = Sarima::new(self.config.sarima.clone())?;
                Ok(
                    trainer::train_with_cross_validation(&model, values, look_back, cv, &self.cancel)?
                        .map(FittedModel::Sarima),
                )
            }
            ModelKind::LinearTrend => Ok(trainer::train_with_cross_validation(
                &LinearTrend::new(),
                values,
                look_back,
                cv,
                &self.cancel,
            )?
            .map(FittedModel::LinearTrend)),
        }
    }

    /// Forecast `horizon` months past the end of `series`
    ///
    /// Steps are dated when the series is, and the seasonal variant adds
    /// prediction intervals when a confidence level is configured.
    pub fn forecast(
        &self,
        trained: &TrainedModel<FittedModel>,
        series: &RateSeries,
    ) -> Result<ForecastVector> {
        let horizon = self.config.horizon;
        let mut forecast = forecaster::forecast(
            &trained.model,
            series.values(),
            &trained.transform,
            trained.look_back,
            horizon,
        )?;

        if let (FittedModel::Sarima(model), Some(level)) = (&trained.model, self.config.confidence_level) {
            if horizon > 0 {
                let history = trained.transform.transform_slice(series.values())?;
                let bounds = model.forecast_with_intervals(&history, horizon, level)?;
                let lower: Vec<f64> = bounds.iter().map(|b| b.1).collect();
                let upper: Vec<f64> = bounds.iter().map(|b| b.2).collect();
                let lower = trained.transform.inverse_slice(&lower)?;
                let upper = trained.transform.inverse_slice(&upper)?;
                forecast = forecast.with_intervals(lower.into_iter().zip(upper).collect())?;
            }
        }

        if let Some(last) = series.last_date() {
            forecast = forecast.starting_after(last)?;
        }
        Ok(forecast)
    }

    /// Train once and forecast
    pub fn run(&self, series: &RateSeries) -> Result<PipelineOutput> {
        let trained = self.train(series)?;
        let forecast = self.forecast(&trained, series)?;
        info!(model = trained.model.name(), steps = forecast.len(), "forecast ready");

        Ok(PipelineOutput {
            model_name: trained.model.name().to_string(),
            history: trained.model.history().cloned(),
            forecast,
            cross_validation: None,
        })
    }

    /// Cross-validate, then forecast with the kept fold's model
    pub fn run_with_cross_validation(&self, series: &RateSeries) -> Result<PipelineOutput> {
        let CrossValidatedModel { trained, report } = self.train_with_cross_validation(series)?;
        let forecast = self.forecast(&trained, series)?;
        info!(
            model = trained.model.name(),
            steps = forecast.len(),
            mean_rmse = report.mean.rmse,
            "cross-validated forecast ready"
        );

        Ok(PipelineOutput {
            model_name: trained.model.name().to_string(),
            history: trained.model.history().cloned(),
            forecast,
            cross_validation: Some(report),
        })
    }
}
