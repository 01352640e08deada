use cdi_outlook::{project_investment, project_investment_cv, InvestmentParams};
use clap::Parser;
use rate_forecast::{DataLoader, PipelineConfig, RateSeries};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Forecast the monthly CDI rate and compare it against a calf sale
#[derive(Parser, Debug)]
#[command(name = "cdi_outlook", version, about)]
struct Cli {
    /// Rate history, CSV or SGS JSON
    series: PathBuf,

    /// Pipeline configuration (JSON)
    config: Option<PathBuf>,

    /// Investment parameters (JSON)
    investment: Option<PathBuf>,

    /// Train through time-ordered cross-validation
    #[arg(long)]
    cv: bool,
}

// CSV files go through the column detector, anything else is read as an SGS payload
fn load_series(path: &Path) -> Result<RateSeries, Box<dyn Error>> {
    let is_csv = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    let series = if is_csv {
        DataLoader::from_csv(path)?
    } else {
        DataLoader::from_sgs_json(path)?
    };
    Ok(series)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let series_path = cli.series.as_path();

    let series = load_series(series_path)?;
    println!("Loaded {} monthly observations from {}", series.len(), series_path.display());

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let params: InvestmentParams = match &cli.investment {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => InvestmentParams::default(),
    };

    let outlook = if cli.cv {
        project_investment_cv(&series, config, &params)?
    } else {
        project_investment(&series, config, &params)?
    };

    println!("\nForecast using {}:", outlook.forecast.model_name);
    let forecast = &outlook.forecast.forecast;
    for (i, value) in forecast.values().iter().enumerate() {
        let label = forecast
            .dates()
            .and_then(|d| d.get(i))
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_else(|| format!("Month {}", i + 1));
        println!("  {}: {:.4}%", label, value);
    }

    if let Some(report) = &outlook.forecast.cross_validation {
        println!("\nCross-validation:");
        for fold in &report.folds {
            println!("  Fold {}: {}", fold.fold + 1, fold.metrics);
        }
        println!("  Mean:   {}", report.mean);
    }

    println!("\nQuarterly scenarios:");
    println!("  {:>6} {:>12} {:>12} {:>12} {:>12}", "Month", "Weight(-)", "Weight(+)", "Return(-)", "Return(+)");
    for row in &outlook.scenarios {
        println!(
            "  {:>6} {:>12.1} {:>12.1} {:>12.2} {:>12.2}",
            row.month,
            row.pessimistic_weight_kg,
            row.optimistic_weight_kg,
            row.pessimistic_return,
            row.optimistic_return
        );
    }

    println!("\n{}", outlook.comparison);
    println!("Best alternative: {:?}", outlook.comparison.best());

    Ok(())
}
