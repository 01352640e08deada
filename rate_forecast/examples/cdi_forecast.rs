use rate_forecast::config::{ModelKind, PipelineConfig};
use rate_forecast::{DataLoader, ForecastPipeline};
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load the monthly CDI history
    let csv_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("examples")
        .join("csv")
        .join("cdi_monthly.csv");

    println!("Loading data from: {}", csv_path.display());
    let series = DataLoader::from_csv(csv_path)?;
    println!("Loaded {} monthly observations", series.len());

    // Seasonal model with 95% intervals, then the sequence regressor
    for model in [ModelKind::Sarima, ModelKind::Lstm] {
        let mut config = PipelineConfig::default().with_model(model).with_horizon(12);
        config.confidence_level = Some(0.95);
        config.lstm.seed = Some(42);

        let output = ForecastPipeline::new(config)?.run_with_cross_validation(&series)?;

        println!("\nForecast for the next 12 months using {}:", output.model_name);
        if let Some(report) = &output.cross_validation {
            for fold in &report.folds {
                println!("  fold {}: {}", fold.fold + 1, fold.metrics);
            }
            println!("  mean:   {}", report.mean);
        }

        let dates = output.forecast.dates().unwrap_or_default();
        for (i, value) in output.forecast.values().iter().enumerate() {
            let label = dates
                .get(i)
                .map(|d| d.format("%Y-%m").to_string())
                .unwrap_or_else(|| format!("Month {}", i + 1));
            match output.forecast.intervals() {
                Some(bounds) => println!(
                    "{}: {:.4}% [{:.4}, {:.4}]",
                    label, value, bounds[i].0, bounds[i].1
                ),
                None => println!("{}: {:.4}%", label, value),
            }
        }
    }

    Ok(())
}
