//! # Scenario Math
//!
//! Closed-form arithmetic for comparing a fixed-income alternative against a
//! calf fattening investment. This crate provides compounded CDI accrual,
//! weight-growth scenarios and the breeder-fee profit table.

use thiserror::Error;

pub mod comparison;
pub mod livestock;
pub mod returns;

pub use comparison::{compare_returns, Alternative, ReturnComparison};
pub use livestock::{client_share, scenario_table, weight_profit, InvestmentParams, ScenarioRow, WeightScenario};
pub use returns::{accrual_path, compound_growth};

/// Errors that can occur in scenario calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for scenario operations
pub type Result<T> = std::result::Result<T, ScenarioError>;
