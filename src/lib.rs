//! # CDI Outlook
//!
//! `cdi_outlook` forecasts the monthly CDI rate and weighs the forecast
//! against a calf fattening investment.
//!
//! ## Example
//!
//! ```
//! use cdi_outlook::{project_investment, InvestmentParams};
//! use rate_forecast::{ModelKind, PipelineConfig, RateSeries};
//!
//! let series = RateSeries::from_values((0..24).map(|i| 0.8 + 0.01 * i as f64).collect()).unwrap();
//! let config = PipelineConfig::default().with_model(ModelKind::LinearTrend);
//! let outlook = project_investment(&series, config, &InvestmentParams::default()).unwrap();
//! assert_eq!(outlook.forecast.forecast.len(), 18);
//! ```

use rate_forecast::{ForecastError, ForecastPipeline, PipelineConfig, PipelineOutput, RateSeries};
use scenario_math::{compare_returns, scenario_table, ReturnComparison, ScenarioError, ScenarioRow};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

pub use scenario_math::InvestmentParams;

/// Errors from either half of the outlook
#[derive(Debug, Error)]
pub enum OutlookError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Result type for outlook operations
pub type Result<T> = std::result::Result<T, OutlookError>;

/// Forecast plus the scenario figures computed from it
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentOutlook {
    /// Pipeline output the comparison was computed from
    pub forecast: PipelineOutput,
    /// Quarterly weight and return rows
    pub scenarios: Vec<ScenarioRow>,
    /// Final values of each alternative
    pub comparison: ReturnComparison,
}

/// Forecast `params.horizon_months` of CDI and compare against the calf sale
///
/// The pipeline horizon is overridden by the investment horizon.
pub fn project_investment(
    series: &RateSeries,
    config: PipelineConfig,
    params: &InvestmentParams,
) -> Result<InvestmentOutlook> {
    let pipeline = ForecastPipeline::new(config.with_horizon(params.horizon_months as usize))?;
    let forecast = pipeline.run(series)?;
    outlook_from(forecast, params)
}

/// Like [`project_investment`], training through cross-validation
pub fn project_investment_cv(
    series: &RateSeries,
    config: PipelineConfig,
    params: &InvestmentParams,
) -> Result<InvestmentOutlook> {
    let pipeline = ForecastPipeline::new(config.with_horizon(params.horizon_months as usize))?;
    let forecast = pipeline.run_with_cross_validation(series)?;
    outlook_from(forecast, params)
}

fn outlook_from(forecast: PipelineOutput, params: &InvestmentParams) -> Result<InvestmentOutlook> {
    let scenarios = scenario_table(params)?;
    let comparison = compare_returns(params, forecast.forecast.values())?;
    info!(
        model = %forecast.model_name,
        cdi = comparison.cdi_value,
        best = ?comparison.best(),
        "investment outlook ready"
    );

    Ok(InvestmentOutlook {
        forecast,
        scenarios,
        comparison,
    })
}
