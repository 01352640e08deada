//! # Rate Forecast
//!
//! Multi-step forecasting of monthly interest-rate series.
//!
//! ## Features
//!
//! - Monthly rate series loaded from CSV, the central bank SGS JSON payload or memory
//! - Min-max normalization and sliding-window preparation
//! - Forecasting models (stacked LSTM, seasonal ARIMA, linear trend)
//! - Expanding-window cross-validation with per-fold MSE/MAE/RMSE
//! - Recursive multi-step forecasting with a single final denormalization
//! - Cooperative cancellation of long training runs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rate_forecast::config::{ModelKind, PipelineConfig};
//! use rate_forecast::data::DataLoader;
//! use rate_forecast::pipeline::ForecastPipeline;
//!
//! # fn main() -> rate_forecast::error::Result<()> {
//! // Load the monthly series
//! let series = DataLoader::from_csv("cdi.csv")?;
//!
//! // Seasonal model, 18 months ahead
//! let config = PipelineConfig::default()
//!     .with_model(ModelKind::Sarima)
//!     .with_horizon(18);
//!
//! let output = ForecastPipeline::new(config)?.run(&series)?;
//! for value in output.forecast.values() {
//!     println!("{:.4}", value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod cross_validation;
pub mod data;
pub mod error;
pub mod forecast;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod optimization;
pub mod pipeline;
pub mod scaler;
pub mod trainer;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use crate::cancel::CancellationToken;
pub use crate::config::{FoldSelection, ModelKind, PipelineConfig};
pub use crate::data::{DataLoader, RateObservation, RateSeries};
pub use crate::error::ForecastError;
pub use crate::forecast::ForecastVector;
pub use crate::metrics::{evaluate, ErrorMetrics};
pub use crate::models::{ForecastModel, TrainedForecastModel};
pub use crate::pipeline::{FittedModel, ForecastPipeline, PipelineOutput};
pub use crate::scaler::MinMaxScaler;
pub use crate::window::{prepare, PreparedData};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
