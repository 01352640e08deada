use approx::assert_abs_diff_eq;
use rate_forecast::error::ForecastError;
use rate_forecast::metrics::{evaluate, safe_sqrt, ErrorMetrics};

#[test]
fn test_regression_metrics() {
    let actual = vec![10.0, 20.0, 30.0, 40.0, 50.0];
    let predicted = vec![12.0, 18.0, 33.0, 37.0, 52.0];

    let metrics = evaluate(&actual, &predicted).unwrap();
    assert_abs_diff_eq!(metrics.mae, 2.4, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.mse, 6.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.rmse, 6.0_f64.sqrt(), epsilon = 1e-12);
}

#[test]
fn test_identical_vectors_have_zero_error() {
    let values = vec![0.9, 1.0, 1.1];
    let metrics = evaluate(&values, &values).unwrap();
    assert_eq!(metrics.mse, 0.0);
    assert_eq!(metrics.rmse, metrics.mse.sqrt());
    assert_eq!(metrics.rmse, 0.0);
}

#[test]
fn test_order_matters() {
    let actual = [1.0, 2.0, 3.0];
    let aligned = evaluate(&actual, &[1.0, 2.0, 3.0]).unwrap();
    let shuffled = evaluate(&actual, &[3.0, 1.0, 2.0]).unwrap();
    assert!(shuffled.mse > aligned.mse);
}

#[test]
fn test_mismatched_lengths() {
    let result = evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
    assert!(matches!(
        result,
        Err(ForecastError::ShapeMismatch { expected: 3, got: 2 })
    ));
}

#[test]
fn test_safe_sqrt_never_faults() {
    assert_eq!(safe_sqrt(0.0), 0.0);
    assert_eq!(safe_sqrt(-1e-18), 0.0);
    assert_eq!(safe_sqrt(4.0), 2.0);
}

#[test]
fn test_mean_of_folds() {
    let folds = [
        ErrorMetrics { mse: 1.0, mae: 1.0, rmse: 1.0 },
        ErrorMetrics { mse: 4.0, mae: 2.0, rmse: 2.0 },
    ];
    let mean = ErrorMetrics::mean(&folds).unwrap();
    assert_abs_diff_eq!(mean.mse, 2.5);
    assert_abs_diff_eq!(mean.rmse, 1.5);
    assert!(ErrorMetrics::mean(&[]).is_none());
}
