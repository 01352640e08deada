//! Side-by-side comparison of the CDI alternative and the calf sale

use crate::livestock::{scenario_table, InvestmentParams};
use crate::returns::compound_growth;
use crate::{Result, ScenarioError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the purchase money ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alternative {
    /// Invested at the forecast CDI rates
    Cdi,
    /// Calf sold under the pessimistic weight scenario
    PessimisticSale,
    /// Calf sold under the optimistic weight scenario
    OptimisticSale,
}

/// Final values of each alternative at the horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnComparison {
    /// Amount paid for the calf
    pub purchase_value: f64,
    /// Purchase value compounded at the forecast rates
    pub cdi_value: f64,
    /// Sale value at the last quarter, pessimistic scenario
    pub pessimistic_sale: f64,
    /// Sale value at the last quarter, optimistic scenario
    pub optimistic_sale: f64,
}

impl ReturnComparison {
    /// Alternative with the highest final value
    pub fn best(&self) -> Alternative {
        [
            (Alternative::Cdi, self.cdi_value),
            (Alternative::PessimisticSale, self.pessimistic_sale),
            (Alternative::OptimisticSale, self.optimistic_sale),
        ]
        .into_iter()
        .fold((Alternative::Cdi, f64::NEG_INFINITY), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
        .0
    }

    /// Final value of `alternative`
    pub fn value_of(&self, alternative: Alternative) -> f64 {
        match alternative {
            Alternative::Cdi => self.cdi_value,
            Alternative::PessimisticSale => self.pessimistic_sale,
            Alternative::OptimisticSale => self.optimistic_sale,
        }
    }
}

impl fmt::Display for ReturnComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Purchase value:          R$ {:.2}", self.purchase_value)?;
        writeln!(f, "Forecast CDI:            R$ {:.2}", self.cdi_value)?;
        writeln!(f, "Sale (pessimistic):      R$ {:.2}", self.pessimistic_sale)?;
        write!(f, "Sale (optimistic):       R$ {:.2}", self.optimistic_sale)
    }
}

/// Compare the purchase amount compounded over the first `horizon_months`
/// forecast rates against the sale values of the last scenario row
pub fn compare_returns(params: &InvestmentParams, forecast_rates_pct: &[f64]) -> Result<ReturnComparison> {
    let table = scenario_table(params)?;
    let horizon = params.horizon_months as usize;
    if forecast_rates_pct.len() < horizon {
        return Err(ScenarioError::InsufficientData(format!(
            "need {} forecast months, got {}",
            horizon,
            forecast_rates_pct.len()
        )));
    }

    let last = table.last().ok_or_else(|| {
        ScenarioError::InsufficientData("scenario table is empty".to_string())
    })?;
    let purchase_value = params.purchase_value();

    Ok(ReturnComparison {
        purchase_value,
        cdi_value: compound_growth(purchase_value, &forecast_rates_pct[..horizon])?,
        pessimistic_sale: last.pessimistic_return,
        optimistic_sale: last.optimistic_return,
    })
}
