//! Sliding-window preparation of a univariate series

use crate::error::{ForecastError, Result};
use crate::scaler::MinMaxScaler;
use ndarray::Array3;

/// Normalized windows, their one-step-ahead targets and the fitted transform
///
/// Window `i` holds `series[i..i + look_back]` and its target is
/// `series[i + look_back]`, both in normalized space. Windows stay in
/// chronological order.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Input windows, each `look_back` long
    pub inputs: Vec<Vec<f64>>,
    /// Targets, one per window
    pub targets: Vec<f64>,
    /// Transform fit on the full series
    pub transform: MinMaxScaler,
    /// Normalized copy of the whole series
    pub normalized: Vec<f64>,
    look_back: usize,
}

impl PreparedData {
    /// Number of windows
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no windows were produced
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Window length
    pub fn look_back(&self) -> usize {
        self.look_back
    }
}

/// Fit a min-max transform on `series` and cut it into overlapping windows
pub fn prepare(series: &[f64], look_back: usize) -> Result<PreparedData> {
    if look_back == 0 {
        return Err(ForecastError::InvalidParameter(
            "look_back must be at least 1".to_string(),
        ));
    }
    if series.len() <= look_back {
        return Err(ForecastError::insufficient(
            look_back + 1,
            series.len(),
            format!("windowing with look_back {}", look_back),
        ));
    }

    let transform = MinMaxScaler::fit(series)?;
    let normalized = transform.transform_slice(series)?;

    let (inputs, targets) = sliding_windows(&normalized, look_back);

    Ok(PreparedData {
        inputs,
        targets,
        transform,
        normalized,
        look_back,
    })
}

/// Cut an already-normalized series into `len - look_back` windows
pub fn sliding_windows(series: &[f64], look_back: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    if look_back == 0 || series.len() <= look_back {
        return (Vec::new(), Vec::new());
    }

    series
        .windows(look_back + 1)
        .map(|w| (w[..look_back].to_vec(), w[look_back]))
        .unzip()
}

/// Stack windows into a `(samples, look_back, 1)` tensor
pub fn windows_to_tensor(windows: &[Vec<f64>], look_back: usize) -> Array3<f64> {
    let mut tensor = Array3::zeros((windows.len(), look_back, 1));
    for (i, window) in windows.iter().enumerate() {
        for (t, &value) in window.iter().take(look_back).enumerate() {
            tensor[[i, t, 0]] = value;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case(13, 12)]
    #[case(24, 12)]
    #[case(36, 6)]
    #[case(5, 1)]
    fn test_window_count_and_targets(#[case] len: usize, #[case] look_back: usize) {
        let series: Vec<f64> = (0..len).map(|i| 0.5 + 0.01 * i as f64).collect();
        let prepared = prepare(&series, look_back).unwrap();

        assert_eq!(prepared.len(), len - look_back);
        for (i, window) in prepared.inputs.iter().enumerate() {
            assert_eq!(window.len(), look_back);
            let expected = prepared.transform.transform(series[i + look_back]);
            assert_abs_diff_eq!(prepared.targets[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_windows_preserve_order() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let (inputs, targets) = sliding_windows(&series, 2);
        assert_eq!(inputs, vec![vec![1.0, 2.0], vec![2.0, 3.0], vec![3.0, 4.0]]);
        assert_eq!(targets, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_too_short_series() {
        let err = prepare(&[1.0; 12], 12).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData { needed: 13, got: 12, .. }
        ));
    }

    #[test]
    fn test_tensor_shape() {
        let series: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let prepared = prepare(&series, 4).unwrap();
        let tensor = windows_to_tensor(&prepared.inputs, prepared.look_back());
        assert_eq!(tensor.shape(), &[16, 4, 1]);
        assert_abs_diff_eq!(tensor[[3, 2, 0]], prepared.inputs[3][2]);
    }
}
