use chrono::NaiveDate;
use rate_forecast::config::{CrossValidationConfig, LstmConfig, ModelKind, PipelineConfig};
use rate_forecast::{DataLoader, ForecastError, ForecastPipeline, RateSeries};
use std::io::Write;
use tempfile::NamedTempFile;

fn quick_lstm() -> LstmConfig {
    LstmConfig {
        units: 8,
        epochs: 5,
        seed: Some(3),
        ..LstmConfig::default()
    }
}

// Monthly CDI-like history starting January 2021
fn create_sample_data(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,valor").unwrap();
    for i in 0..len {
        let date = NaiveDate::from_ymd_opt(2021 + (i / 12) as i32, (i % 12 + 1) as u32, 1).unwrap();
        let value = 0.2 + 0.025 * i as f64 + 0.03 * ((i % 12) as f64 / 2.0).sin();
        writeln!(file, "{},{:.4}", date.format("%Y-%m-%d"), value).unwrap();
    }
    file
}

#[test]
fn test_constant_series_forecast_stays_flat() {
    let series = RateSeries::from_values(vec![1.0; 24]).unwrap();

    for model in [ModelKind::Lstm, ModelKind::Sarima] {
        let config = PipelineConfig {
            model,
            look_back: 12,
            horizon: 3,
            lstm: quick_lstm(),
            ..PipelineConfig::default()
        };
        let output = ForecastPipeline::new(config).unwrap().run(&series).unwrap();

        assert_eq!(output.forecast.len(), 3);
        for value in output.forecast.values() {
            assert!((value - 1.0).abs() <= 0.2, "{:?} forecast {}", model, value);
        }
    }
}

#[test]
fn test_linear_series_seasonal_forecast_non_decreasing() {
    let values: Vec<f64> = (0..36).map(|i| 0.5 + 0.01 * i as f64).collect();
    let series = RateSeries::from_values(values).unwrap();
    let config = PipelineConfig::default()
        .with_model(ModelKind::Sarima)
        .with_horizon(6);

    let output = ForecastPipeline::new(config).unwrap().run(&series).unwrap();
    let forecast = output.forecast.values();
    assert_eq!(forecast.len(), 6);
    for pair in forecast.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-9, "forecast decreased: {:?}", forecast);
    }
}

#[test]
fn test_zero_horizon_is_empty() {
    let series = RateSeries::from_values((0..20).map(|i| 1.0 + 0.01 * i as f64).collect()).unwrap();
    for model in [ModelKind::Lstm, ModelKind::Sarima, ModelKind::LinearTrend] {
        let config = PipelineConfig {
            model,
            horizon: 0,
            lstm: quick_lstm(),
            ..PipelineConfig::default()
        };
        let output = ForecastPipeline::new(config).unwrap().run(&series).unwrap();
        assert!(output.forecast.is_empty());
    }
}

#[test]
fn test_full_forecast_workflow() {
    // 1. Load data
    let data_file = create_sample_data(48);
    let series = DataLoader::from_csv(data_file.path()).unwrap();
    assert_eq!(series.len(), 48);

    // 2. Seasonal model with intervals
    let config = PipelineConfig {
        model: ModelKind::Sarima,
        horizon: 6,
        confidence_level: Some(0.9),
        ..PipelineConfig::default()
    };
    let pipeline = ForecastPipeline::new(config).unwrap();
    let output = pipeline.run(&series).unwrap();

    // 3. Forecast is dated from the month after the last observation
    let forecast = &output.forecast;
    assert_eq!(forecast.len(), 6);
    assert_eq!(
        forecast.dates().unwrap()[0],
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    );
    for (value, (lower, upper)) in forecast.values().iter().zip(forecast.intervals().unwrap()) {
        assert!(lower <= value && value <= upper);
    }

    // 4. Written out as CSV
    let out = NamedTempFile::new().unwrap();
    forecast.write_csv(out.path()).unwrap();
    let written = std::fs::read_to_string(out.path()).unwrap();
    assert!(written.starts_with("step,date,forecast,lower,upper\n1,2025-01-01,"));
    assert_eq!(written.lines().count(), 7);
}

#[test]
fn test_cross_validated_workflow() {
    let data_file = create_sample_data(60);
    let series = DataLoader::from_csv(data_file.path()).unwrap();
    let config = PipelineConfig::default()
        .with_model(ModelKind::Sarima)
        .with_horizon(4);

    let output = ForecastPipeline::new(config)
        .unwrap()
        .run_with_cross_validation(&series)
        .unwrap();

    let report = output.cross_validation.unwrap();
    assert_eq!(report.folds.len(), 5);
    assert_eq!(report.selected_fold, 4);
    assert!(report.mean.rmse.is_finite());
    assert_eq!(output.forecast.len(), 4);
}

#[test]
fn test_cross_validated_forecast_continues_the_series() {
    // 0.50, 0.51, ... 1.09; the next month is 1.10
    let series = RateSeries::from_values((0..60).map(|i| 0.5 + 0.01 * i as f64).collect()).unwrap();

    for (model, tolerance) in [(ModelKind::LinearTrend, 1e-9), (ModelKind::Sarima, 1e-3)] {
        let config = PipelineConfig {
            model,
            look_back: 6,
            horizon: 3,
            cross_validation: CrossValidationConfig {
                n_splits: 2,
                ..CrossValidationConfig::default()
            },
            ..PipelineConfig::default()
        };
        let pipeline = ForecastPipeline::new(config).unwrap();
        let output = pipeline.run_with_cross_validation(&series).unwrap();
        assert_eq!(output.cross_validation.unwrap().selected_fold, 1);

        let values = output.forecast.values();
        assert_eq!(values.len(), 3);
        for (step, value) in values.iter().enumerate() {
            let expected = 1.10 + 0.01 * step as f64;
            assert!(
                (value - expected).abs() < tolerance,
                "{:?} step {}: {} vs {}",
                model,
                step + 1,
                value,
                expected
            );
        }
    }
}

#[test]
fn test_cross_validation_needs_enough_points() {
    let series = RateSeries::from_values(vec![1.0; 17]).unwrap();
    let config = PipelineConfig::default().with_model(ModelKind::LinearTrend);
    let result = ForecastPipeline::new(config)
        .unwrap()
        .run_with_cross_validation(&series);

    assert!(matches!(
        result,
        Err(ForecastError::InsufficientData { needed: 18, got: 17, .. })
    ));
}

#[test]
fn test_series_shorter_than_window() {
    let series = RateSeries::from_values(vec![1.0; 12]).unwrap();
    let result = ForecastPipeline::new(PipelineConfig::default())
        .unwrap()
        .run(&series);
    assert!(matches!(
        result,
        Err(ForecastError::InsufficientData { needed: 13, got: 12, .. })
    ));
}
