//! Pipeline configuration with serde-backed JSON loading

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which model variant the pipeline trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Two stacked LSTM layers with dropout and a linear head
    #[default]
    Lstm,
    /// Seasonal ARIMA fit by conditional maximum likelihood
    Sarima,
    /// Ordinary least squares line over the month index
    LinearTrend,
}

/// Which fold's model cross-validation hands back for production use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldSelection {
    /// Whichever fold trained last
    #[default]
    LastFold,
    /// The fold with the lowest test RMSE
    BestByRmse,
}

/// Hyperparameters of the sequence regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Hidden width of both recurrent layers
    pub units: usize,
    /// Dropout rate applied after each recurrent layer
    pub dropout: f64,
    /// Adam step size
    pub learning_rate: f64,
    /// Passes over the training windows
    pub epochs: usize,
    /// Windows per gradient step
    pub batch_size: usize,
    /// Trailing share of windows held out for loss monitoring
    pub validation_fraction: f64,
    /// Shuffle training windows every epoch
    pub shuffle: bool,
    /// Seed for weight initialization, dropout masks and shuffling
    pub seed: Option<u64>,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            units: 64,
            dropout: 0.3,
            learning_rate: 0.001,
            epochs: 10,
            batch_size: 16,
            validation_fraction: 0.2,
            shuffle: true,
            seed: None,
        }
    }
}

impl LstmConfig {
    /// Validate the hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.units == 0 {
            return Err(ForecastError::InvalidParameter(
                "units must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "epochs must be at least 1".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(ForecastError::InvalidParameter(format!(
                "validation_fraction must be in [0, 1), got {}",
                self.validation_fraction
            )));
        }
        Ok(())
    }
}

/// Orders of the seasonal statistical model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarimaConfig {
    /// Non-seasonal (p, d, q)
    pub order: (usize, usize, usize),
    /// Seasonal (P, D, Q, s)
    pub seasonal_order: (usize, usize, usize, usize),
    /// Optimizer iteration cap
    pub max_iterations: usize,
    /// Optimizer convergence tolerance
    pub tolerance: f64,
}

impl Default for SarimaConfig {
    fn default() -> Self {
        Self {
            order: (1, 1, 1),
            seasonal_order: (1, 0, 1, 12),
            max_iterations: 1000,
            tolerance: 1e-8,
        }
    }
}

impl SarimaConfig {
    /// Validate the orders
    pub fn validate(&self) -> Result<()> {
        let (sp, sd, sq, period) = self.seasonal_order;
        if sp + sd + sq > 0 && period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "seasonal period must be at least 2 when seasonal terms are present, got {}",
                period
            )));
        }
        if self.max_iterations == 0 {
            return Err(ForecastError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(ForecastError::InvalidParameter(
                "tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for time-ordered cross-validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    /// Number of expanding-window folds
    pub n_splits: usize,
    /// Epochs per fold for the sequence regressor
    pub epochs: usize,
    /// Which fold's model is returned
    pub selection: FoldSelection,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            epochs: 20,
            selection: FoldSelection::LastFold,
        }
    }
}

/// Full configuration surface of the forecasting pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Model variant
    pub model: ModelKind,
    /// Trailing months fed to the model
    pub look_back: usize,
    /// Months to forecast
    pub horizon: usize,
    /// Sequence regressor hyperparameters
    pub lstm: LstmConfig,
    /// Seasonal model orders
    pub sarima: SarimaConfig,
    /// Cross-validation settings
    pub cross_validation: CrossValidationConfig,
    /// Prediction interval level for the statistical variant
    pub confidence_level: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Lstm,
            look_back: 12,
            horizon: 18,
            lstm: LstmConfig::default(),
            sarima: SarimaConfig::default(),
            cross_validation: CrossValidationConfig::default(),
            confidence_level: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder-style model selection
    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    /// Builder-style horizon
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        if self.look_back == 0 {
            return Err(ForecastError::InvalidParameter(
                "look_back must be at least 1".to_string(),
            ));
        }
        if self.cross_validation.n_splits < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "n_splits must be at least 2, got {}",
                self.cross_validation.n_splits
            )));
        }
        if self.cross_validation.epochs == 0 {
            return Err(ForecastError::InvalidParameter(
                "cross-validation epochs must be at least 1".to_string(),
            ));
        }
        if let Some(level) = self.confidence_level {
            if !(level > 0.0 && level < 1.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "confidence_level must be in (0, 1), got {}",
                    level
                )));
            }
        }
        self.lstm.validate()?;
        self.sarima.validate()
    }
}
