//! Calf weight-growth scenarios and the breeder-fee profit table

use crate::{Result, ScenarioError};
use serde::{Deserialize, Serialize};

/// Growth assumption for the calf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightScenario {
    /// 10 kg per month up to 300 kg
    Optimistic,
    /// 5 kg per month up to 250 kg
    Pessimistic,
}

impl WeightScenario {
    /// Weight gained per month
    pub fn monthly_gain_kg(self) -> f64 {
        match self {
            WeightScenario::Optimistic => 10.0,
            WeightScenario::Pessimistic => 5.0,
        }
    }

    /// Weight the animal never exceeds
    pub fn cap_kg(self) -> f64 {
        match self {
            WeightScenario::Optimistic => 300.0,
            WeightScenario::Pessimistic => 250.0,
        }
    }

    /// Estimated weight after `months`
    pub fn weight_after(self, initial_kg: f64, months: u32) -> f64 {
        (initial_kg + self.monthly_gain_kg() * f64::from(months)).min(self.cap_kg())
    }
}

/// Inputs of the calf investment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestmentParams {
    /// Purchase price per kg
    pub price_per_kg: f64,
    /// Weight at purchase
    pub initial_weight_kg: f64,
    /// Sale price per kg
    pub sale_price_per_kg: f64,
    /// Months until sale
    pub horizon_months: u32,
    /// Share of the weight gain kept by the breeder, in percent
    pub breeder_fee_pct: f64,
}

impl Default for InvestmentParams {
    fn default() -> Self {
        Self {
            price_per_kg: 17.0,
            initial_weight_kg: 100.0,
            sale_price_per_kg: 20.0,
            horizon_months: 18,
            breeder_fee_pct: 50.0,
        }
    }
}

impl InvestmentParams {
    /// Check every field
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("price_per_kg", self.price_per_kg),
            ("initial_weight_kg", self.initial_weight_kg),
            ("sale_price_per_kg", self.sale_price_per_kg),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ScenarioError::InvalidInput(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.horizon_months == 0 {
            return Err(ScenarioError::InvalidInput(
                "horizon_months must be at least 1".to_string(),
            ));
        }
        client_share(self.breeder_fee_pct).map(|_| ())
    }

    /// Amount paid for the calf
    pub fn purchase_value(&self) -> f64 {
        self.price_per_kg * self.initial_weight_kg
    }
}

/// Fraction of the weight profit that stays with the investor
pub fn client_share(breeder_fee_pct: f64) -> Result<f64> {
    if !(0.0..=100.0).contains(&breeder_fee_pct) {
        return Err(ScenarioError::InvalidInput(format!(
            "breeder fee must be between 0 and 100%, got {}",
            breeder_fee_pct
        )));
    }
    Ok(1.0 - breeder_fee_pct / 100.0)
}

/// Sale value of the weight gained between purchase and sale
pub fn weight_profit(initial_kg: f64, final_kg: f64, sale_price_per_kg: f64) -> f64 {
    sale_price_per_kg * (final_kg - initial_kg)
}

/// One quarter of the scenario table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    /// Months since purchase
    pub month: u32,
    /// Amount paid for the calf
    pub purchase_value: f64,
    /// Weight under the pessimistic scenario
    pub pessimistic_weight_kg: f64,
    /// Weight under the optimistic scenario
    pub optimistic_weight_kg: f64,
    /// Purchase value plus the investor's share of the pessimistic weight profit
    pub pessimistic_return: f64,
    /// Purchase value plus the investor's share of the optimistic weight profit
    pub optimistic_return: f64,
}

/// Rows for months `0, 3, 6, ...` up to the horizon
pub fn scenario_table(params: &InvestmentParams) -> Result<Vec<ScenarioRow>> {
    params.validate()?;
    let share = client_share(params.breeder_fee_pct)?;
    let purchase_value = params.purchase_value();

    let value_at = |weight: f64| {
        purchase_value
            + share * weight_profit(params.initial_weight_kg, weight, params.sale_price_per_kg)
    };

    Ok((0..=params.horizon_months)
        .step_by(3)
        .map(|month| {
            let pessimistic = WeightScenario::Pessimistic.weight_after(params.initial_weight_kg, month);
            let optimistic = WeightScenario::Optimistic.weight_after(params.initial_weight_kg, month);
            ScenarioRow {
                month,
                purchase_value,
                pessimistic_weight_kg: pessimistic,
                optimistic_weight_kg: optimistic,
                pessimistic_return: value_at(pessimistic),
                optimistic_return: value_at(optimistic),
            }
        })
        .collect())
}
