//! Seasonal ARIMA(p,d,q)(P,D,Q,s) fit by conditional maximum likelihood
//!
//! The series is differenced `d` times at lag 1 and `D` times at lag `s`.
//! The stationary remainder `w` follows the multiplicative model
//!
//! ```text
//! φ(B) Φ(B^s) (w_t - μ) = θ(B) Θ(B^s) e_t
//! ```
//!
//! Both polynomial products are expanded into plain lag coefficients, the
//! residuals are filtered conditionally on the first observations, and the
//! Gaussian log-likelihood (with σ² concentrated out) is maximized with a
//! bounded simplex search.

use crate::config::SarimaConfig;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, TrainedForecastModel, TrainingSet};
use crate::optimization::{minimize, SimplexConfig};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use tracing::debug;

const COEFFICIENT_BOUND: f64 = 0.99;

/// Untrained seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct Sarima {
    name: String,
    config: SarimaConfig,
}

/// Seasonal ARIMA with estimated coefficients
#[derive(Debug, Clone)]
pub struct TrainedSarima {
    name: String,
    intercept: f64,
    ar: Vec<f64>,
    seasonal_ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ma: Vec<f64>,
    /// Expanded AR coefficients, index `k` holds lag `k + 1`
    ar_lags: Vec<f64>,
    /// Expanded MA coefficients, index `k` holds lag `k + 1`
    ma_lags: Vec<f64>,
    /// Lag of each differencing step, in the order applied
    lags: Vec<usize>,
    sigma2: f64,
    log_likelihood: f64,
    converged: bool,
}

impl Sarima {
    /// Create a model from its orders
    pub fn new(config: SarimaConfig) -> Result<Self> {
        config.validate()?;
        let (p, d, q) = config.order;
        let (sp, sd, sq, s) = config.seasonal_order;
        Ok(Self {
            name: format!("SARIMA({},{},{})({},{},{},{})", p, d, q, sp, sd, sq, s),
            config,
        })
    }

    fn lag_steps(&self) -> Vec<usize> {
        let (_, d, _) = self.config.order;
        let (_, sd, _, s) = self.config.seasonal_order;
        std::iter::repeat(1)
            .take(d)
            .chain(std::iter::repeat(s).take(sd))
            .collect()
    }

    /// Minimum history length the orders can be estimated from
    pub fn min_observations(&self) -> usize {
        let (p, d, q) = self.config.order;
        let (sp, sd, sq, s) = self.config.seasonal_order;
        let ar_len = p + sp * s;
        let ma_len = q + sq * s;
        d + sd * s + ar_len.max(ma_len) + 2
    }
}

impl Default for Sarima {
    fn default() -> Self {
        Self {
            name: "SARIMA(1,1,1)(1,0,1,12)".to_string(),
            config: SarimaConfig::default(),
        }
    }
}

/// Lag-`lag` difference of `series`
fn difference(series: &[f64], lag: usize) -> Vec<f64> {
    series
        .iter()
        .skip(lag)
        .zip(series.iter())
        .map(|(curr, prev)| curr - prev)
        .collect()
}

/// Undo one lag-`lag` difference for values continuing `history`
fn undifference(future: &[f64], history: &[f64], lag: usize) -> Vec<f64> {
    let mut extended = history.to_vec();
    for &w in future {
        let base = extended[extended.len() - lag];
        extended.push(w + base);
    }
    extended.split_off(history.len())
}

/// Apply the differencing steps, recording each intermediate series
fn difference_all(series: &[f64], lags: &[usize]) -> (Vec<(usize, Vec<f64>)>, Vec<f64>) {
    let mut history = Vec::with_capacity(lags.len());
    let mut current = series.to_vec();
    for &lag in lags {
        let next = difference(&current, lag);
        history.push((lag, current));
        current = next;
    }
    (history, current)
}

/// Coefficients of `(1 - Σ a_i B^i)(1 - Σ A_j B^{js})` as lag weights
fn expand_ar(ar: &[f64], seasonal: &[f64], period: usize) -> Vec<f64> {
    let mut lags = vec![0.0; ar.len() + seasonal.len() * period];
    for (i, &a) in ar.iter().enumerate() {
        lags[i] += a;
    }
    for (j, &sa) in seasonal.iter().enumerate() {
        let base = (j + 1) * period;
        lags[base - 1] += sa;
        for (i, &a) in ar.iter().enumerate() {
            lags[base + i] -= a * sa;
        }
    }
    lags
}

/// Coefficients of `(1 + Σ m_i B^i)(1 + Σ M_j B^{js})` as lag weights
fn expand_ma(ma: &[f64], seasonal: &[f64], period: usize) -> Vec<f64> {
    let mut lags = vec![0.0; ma.len() + seasonal.len() * period];
    for (i, &m) in ma.iter().enumerate() {
        lags[i] += m;
    }
    for (j, &sm) in seasonal.iter().enumerate() {
        let base = (j + 1) * period;
        lags[base - 1] += sm;
        for (i, &m) in ma.iter().enumerate() {
            lags[base + i] += m * sm;
        }
    }
    lags
}

/// One-step prediction of `w[t]` from everything before it
fn predict_at(w: &[f64], e: &[f64], t: usize, mu: f64, ar_lags: &[f64], ma_lags: &[f64]) -> f64 {
    let ar_part: f64 = ar_lags
        .iter()
        .enumerate()
        .take_while(|(k, _)| *k < t)
        .map(|(k, a)| a * (w[t - 1 - k] - mu))
        .sum();
    let ma_part: f64 = ma_lags
        .iter()
        .enumerate()
        .take_while(|(k, _)| *k < t)
        .map(|(k, m)| m * e[t - 1 - k])
        .sum();
    mu + ar_part + ma_part
}

/// Residuals filtered from `start`; earlier residuals are zero
fn filter_residuals(w: &[f64], start: usize, mu: f64, ar_lags: &[f64], ma_lags: &[f64]) -> Vec<f64> {
    let mut e = vec![0.0; w.len()];
    for t in start..w.len() {
        e[t] = w[t] - predict_at(w, &e, t, mu, ar_lags, ma_lags);
    }
    e
}

/// Concentrated Gaussian log-likelihood of a residual sum of squares
fn log_likelihood(css: f64, n_eff: usize) -> f64 {
    let n = n_eff as f64;
    let sigma2 = (css / n).max(f64::MIN_POSITIVE);
    -0.5 * n * ((2.0 * PI * sigma2).ln() + 1.0)
}

struct Params<'a> {
    intercept: f64,
    ar: &'a [f64],
    seasonal_ar: &'a [f64],
    ma: &'a [f64],
    seasonal_ma: &'a [f64],
}

fn split_params(params: &[f64], orders: (usize, usize, usize, usize)) -> Params<'_> {
    let (p, sp, q, sq) = orders;
    let (ar, rest) = params[1..].split_at(p);
    let (seasonal_ar, rest) = rest.split_at(sp);
    let (ma, rest) = rest.split_at(q);
    let seasonal_ma = &rest[..sq];
    Params {
        intercept: params[0],
        ar,
        seasonal_ar,
        ma,
        seasonal_ma,
    }
}

impl ForecastModel for Sarima {
    type Trained = TrainedSarima;

    fn train(&self, data: &TrainingSet<'_>) -> Result<TrainedSarima> {
        let series = data.series;
        let needed = self.min_observations();
        if series.len() < needed {
            return Err(ForecastError::insufficient(
                needed,
                series.len(),
                format!("fitting {}", self.name),
            ));
        }

        let (p, _, q) = self.config.order;
        let (sp, _, sq, period) = self.config.seasonal_order;
        let orders = (p, sp, q, sq);

        let lags = self.lag_steps();
        let (_, w) = difference_all(series, &lags);
        let start = p + sp * period;
        let n_eff = w.len() - start;
        let mean = w.iter().sum::<f64>() / w.len() as f64;

        let objective = |params: &[f64]| {
            let split = split_params(params, orders);
            let ar_lags = expand_ar(split.ar, split.seasonal_ar, period);
            let ma_lags = expand_ma(split.ma, split.seasonal_ma, period);
            let e = filter_residuals(&w, start, split.intercept, &ar_lags, &ma_lags);
            let css: f64 = e[start..].iter().map(|r| r * r).sum();
            -log_likelihood(css, n_eff)
        };

        let n_coefficients = p + sp + q + sq;
        let mut initial = vec![mean];
        initial.extend((0..n_coefficients).map(|_| 0.1));
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        bounds.extend((0..n_coefficients).map(|_| (-COEFFICIENT_BOUND, COEFFICIENT_BOUND)));

        let result = minimize(
            objective,
            &initial,
            &bounds,
            &SimplexConfig {
                max_iter: self.config.max_iterations,
                tolerance: self.config.tolerance,
                ..SimplexConfig::default()
            },
        );
        if !result.value.is_finite() || result.point.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::NumericalFault(format!(
                "{} likelihood did not reach a finite optimum",
                self.name
            )));
        }

        let split = split_params(&result.point, orders);
        let ar_lags = expand_ar(split.ar, split.seasonal_ar, period);
        let ma_lags = expand_ma(split.ma, split.seasonal_ma, period);
        let residuals = filter_residuals(&w, start, split.intercept, &ar_lags, &ma_lags);
        let css: f64 = residuals[start..].iter().map(|r| r * r).sum();

        debug!(
            model = %self.name,
            iterations = result.iterations,
            converged = result.converged,
            css,
            "seasonal model fitted"
        );

        Ok(TrainedSarima {
            name: self.name.clone(),
            intercept: split.intercept,
            ar: split.ar.to_vec(),
            seasonal_ar: split.seasonal_ar.to_vec(),
            ma: split.ma.to_vec(),
            seasonal_ma: split.seasonal_ma.to_vec(),
            ar_lags,
            ma_lags,
            lags,
            sigma2: (css / n_eff as f64).max(f64::MIN_POSITIVE),
            log_likelihood: log_likelihood(css, n_eff),
            converged: result.converged,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSarima {
    /// Intercept of the differenced series
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Non-seasonal AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// Seasonal AR coefficients
    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.seasonal_ar
    }

    /// Non-seasonal MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Seasonal MA coefficients
    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.seasonal_ma
    }

    /// Residual variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Maximized conditional log-likelihood
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        let k = (1 + self.ar.len() + self.seasonal_ar.len() + self.ma.len() + self.seasonal_ma.len()) as f64;
        2.0 * k - 2.0 * self.log_likelihood
    }

    /// Whether the optimizer met its tolerance
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Extend the differenced series `horizon` steps with zero future shocks
    fn forecast_differenced(&self, w: &[f64], e: &[f64], horizon: usize) -> Vec<f64> {
        let mut w = w.to_vec();
        let mut e = e.to_vec();
        for _ in 0..horizon {
            let t = w.len();
            let next = predict_at(&w, &e, t, self.intercept, &self.ar_lags, &self.ma_lags);
            w.push(next);
            e.push(0.0);
        }
        w.split_off(w.len() - horizon)
    }

    fn integrate(&self, mut values: Vec<f64>, history: &[(usize, Vec<f64>)]) -> Vec<f64> {
        for (lag, level) in history.iter().rev() {
            values = undifference(&values, level, *lag);
        }
        values
    }

    /// Multi-step forecast continuing `history`
    ///
    /// `history` is differenced and filtered with the fitted coefficients,
    /// so it may extend past the series the model was estimated on.
    pub fn forecast(&self, history: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let needed = self.lags.iter().sum::<usize>() + 1;
        if history.len() < needed {
            return Err(ForecastError::insufficient(
                needed,
                history.len(),
                format!("{} forecast", self.name),
            ));
        }
        if horizon == 0 {
            return Ok(Vec::new());
        }

        let (levels, w) = difference_all(history, &self.lags);
        let e = filter_residuals(&w, 0, self.intercept, &self.ar_lags, &self.ma_lags);
        let diff = self.forecast_differenced(&w, &e, horizon);
        Ok(self.integrate(diff, &levels))
    }

    /// Forecast continuing `history` with symmetric normal prediction
    /// intervals at `level`
    pub fn forecast_with_intervals(
        &self,
        history: &[f64],
        horizon: usize,
        level: f64,
    ) -> Result<Vec<(f64, f64, f64)>> {
        if !(level > 0.0 && level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::NumericalFault(e.to_string()))?;
        let z = normal.inverse_cdf((1.0 + level) / 2.0);

        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        Ok(self
            .forecast(history, horizon)?
            .into_iter()
            .zip(psi.iter())
            .map(|(mean, weight)| {
                cumulative += weight * weight;
                let half_width = z * (self.sigma2 * cumulative).max(0.0).sqrt();
                (mean, mean - half_width, mean + half_width)
            })
            .collect())
    }

    /// MA(∞) weights of the integrated model, `psi[0] = 1`
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        // Polynomial 1 - Σ a_k B^k times every differencing factor (1 - B^lag)
        let mut poly = vec![1.0];
        poly.extend(self.ar_lags.iter().map(|a| -a));
        for &lag in &self.lags {
            let mut next = vec![0.0; poly.len() + lag];
            for (i, &c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + lag] -= c;
            }
            poly = next;
        }

        let mut psi = Vec::with_capacity(horizon);
        for j in 0..horizon {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let ma = self.ma_lags.get(j - 1).copied().unwrap_or(0.0);
            let ar: f64 = (1..=j)
                .filter_map(|k| poly.get(k).map(|c| -c * psi[j - k]))
                .sum();
            psi.push(ma + ar);
        }
        psi
    }
}

impl TrainedForecastModel for TrainedSarima {
    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        self.forecast(window, 1)?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::NumericalFault("empty one-step forecast".to_string()))
    }

    fn native_forecast(&self, history: &[f64], horizon: usize) -> Option<Result<Vec<f64>>> {
        Some(self.forecast(history, horizon))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use approx::assert_abs_diff_eq;

    fn train_on(series: &[f64], config: SarimaConfig) -> Result<TrainedSarima> {
        let cancel = CancellationToken::new();
        let data = TrainingSet {
            inputs: &[],
            targets: &[],
            series,
            look_back: 12,
            cancel: &cancel,
        };
        Sarima::new(config)?.train(&data)
    }

    #[test]
    fn test_difference_round_trip() {
        let series = vec![1.0, 3.0, 6.0, 10.0, 15.0];
        let diff = difference(&series, 1);
        assert_eq!(diff, vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(undifference(&[6.0, 7.0], &series, 1), vec![21.0, 28.0]);

        let seasonal = difference(&series, 2);
        assert_eq!(seasonal, vec![5.0, 7.0, 9.0]);
        assert_eq!(undifference(&[11.0], &series, 2), vec![21.0]);
    }

    #[test]
    fn test_polynomial_expansion() {
        let ar = expand_ar(&[0.5], &[0.4], 4);
        assert_eq!(ar.len(), 5);
        assert_abs_diff_eq!(ar[0], 0.5);
        assert_abs_diff_eq!(ar[3], 0.4);
        assert_abs_diff_eq!(ar[4], -0.2);

        let ma = expand_ma(&[0.5], &[0.4], 4);
        assert_abs_diff_eq!(ma[4], 0.2);
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let trained = train_on(&[0.0; 24], SarimaConfig::default()).unwrap();
        for value in trained.forecast(&[0.0; 24], 3).unwrap() {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_linear_series_is_non_decreasing() {
        let series: Vec<f64> = (0..36).map(|i| i as f64 / 35.0).collect();
        let trained = train_on(&series, SarimaConfig::default()).unwrap();
        let forecast = trained.forecast(&series, 6).unwrap();
        assert_eq!(forecast.len(), 6);
        assert!(forecast[0] >= series[35] - 1e-9);
        for pair in forecast.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9);
        }
    }

    #[test]
    fn test_insufficient_history() {
        let err = train_on(&[0.1; 10], SarimaConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { needed: 16, .. }));
    }

    #[test]
    fn test_intervals_widen_with_horizon() {
        let series: Vec<f64> = (0..48)
            .map(|i| 0.5 + 0.3 * ((i as f64) * std::f64::consts::PI / 6.0).sin() + 0.01 * (i % 5) as f64)
            .collect();
        let trained = train_on(&series, SarimaConfig::default()).unwrap();
        let intervals = trained.forecast_with_intervals(&series, 4, 0.95).unwrap();
        assert_eq!(intervals.len(), 4);
        for (mean, lower, upper) in &intervals {
            assert!(lower <= mean && mean <= upper);
        }
        let width = |i: usize| intervals[i].2 - intervals[i].1;
        assert!(width(3) >= width(0));
    }

    #[test]
    fn test_forecast_continues_given_history() {
        let series: Vec<f64> = (0..36).map(|i| i as f64 / 35.0).collect();
        let trained = train_on(&series[..24], SarimaConfig::default()).unwrap();
        let forecast = trained.forecast(&series, 2).unwrap();
        assert_abs_diff_eq!(forecast[0], 36.0 / 35.0, epsilon = 1e-4);
        assert_abs_diff_eq!(forecast[1], 37.0 / 35.0, epsilon = 1e-4);

        let native = trained.native_forecast(&series, 2).unwrap().unwrap();
        assert_eq!(native, forecast);
    }

    #[test]
    fn test_forecast_needs_differencing_history() {
        let series: Vec<f64> = (0..36).map(|i| i as f64 / 35.0).collect();
        let trained = train_on(&series, SarimaConfig::default()).unwrap();
        let err = trained.forecast(&[0.5], 3).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { needed: 2, got: 1, .. }));
    }

    #[test]
    fn test_one_step_prediction_from_window() {
        let series: Vec<f64> = (0..36).map(|i| i as f64 / 35.0).collect();
        let trained = train_on(&series, SarimaConfig::default()).unwrap();
        let next = trained.predict_one(&series[24..]).unwrap();
        assert!(next > series[35] - 1e-6);
    }
}
