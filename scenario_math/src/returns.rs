//! Compounded accrual of monthly percentage rates

use crate::{Result, ScenarioError};

fn check_rates(monthly_rates_pct: &[f64]) -> Result<()> {
    for (month, &rate) in monthly_rates_pct.iter().enumerate() {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(ScenarioError::InvalidInput(format!(
                "rate {} in month {} must be finite and above -100%",
                rate,
                month + 1
            )));
        }
    }
    Ok(())
}

fn check_principal(principal: f64) -> Result<()> {
    if !principal.is_finite() || principal < 0.0 {
        return Err(ScenarioError::InvalidInput(format!(
            "principal must be finite and non-negative, got {}",
            principal
        )));
    }
    Ok(())
}

/// Value of `principal` after compounding each monthly rate (in percent)
pub fn compound_growth(principal: f64, monthly_rates_pct: &[f64]) -> Result<f64> {
    check_principal(principal)?;
    check_rates(monthly_rates_pct)?;

    Ok(monthly_rates_pct
        .iter()
        .fold(principal, |value, rate| value * (1.0 + rate / 100.0)))
}

/// Balance at the end of every month
pub fn accrual_path(principal: f64, monthly_rates_pct: &[f64]) -> Result<Vec<f64>> {
    check_principal(principal)?;
    check_rates(monthly_rates_pct)?;

    Ok(monthly_rates_pct
        .iter()
        .scan(principal, |value, rate| {
            *value *= 1.0 + rate / 100.0;
            Some(*value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compound_growth() {
        let value = compound_growth(1000.0, &[1.0, 1.0]).unwrap();
        assert_relative_eq!(value, 1020.1, epsilon = 1e-9);

        assert_eq!(compound_growth(1700.0, &[]).unwrap(), 1700.0);
    }

    #[test]
    fn test_accrual_path_ends_at_compound_value() {
        let rates = [0.97, 0.80, 0.83, 0.89];
        let path = accrual_path(500.0, &rates).unwrap();
        assert_eq!(path.len(), 4);
        assert_relative_eq!(path[3], compound_growth(500.0, &rates).unwrap());
        assert!(path.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(compound_growth(100.0, &[f64::NAN]).is_err());
        assert!(compound_growth(100.0, &[-100.0]).is_err());
        assert!(compound_growth(-1.0, &[1.0]).is_err());
        assert!(accrual_path(100.0, &[f64::INFINITY]).is_err());
    }
}
