//! Multi-step forecast output

use crate::error::{ForecastError, Result};
use crate::metrics::{evaluate, ErrorMetrics};
use crate::utils::future_months;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Denormalized forecast, one value per future month in chronological order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastVector {
    values: Vec<f64>,
    /// Prediction intervals (lower, upper), if the model produced them
    intervals: Option<Vec<(f64, f64)>>,
    /// Month-start date of each step, if the history was dated
    dates: Option<Vec<NaiveDate>>,
}

impl ForecastVector {
    /// Create a forecast from its values
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            intervals: None,
            dates: None,
        }
    }

    /// Attach prediction intervals, one per step
    pub fn with_intervals(mut self, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if intervals.len() != self.values.len() {
            return Err(ForecastError::ShapeMismatch {
                expected: self.values.len(),
                got: intervals.len(),
            });
        }
        self.intervals = Some(intervals);
        Ok(self)
    }

    /// Date the steps as the months following `last_observed`
    pub fn starting_after(mut self, last_observed: NaiveDate) -> Result<Self> {
        self.dates = Some(future_months(last_observed, self.values.len())?);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the prediction intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Get the step dates, if available
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Number of forecast steps
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the forecast is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take the forecasted values
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Score the forecast against realized values
    pub fn evaluate_against(&self, actual: &[f64]) -> Result<ErrorMetrics> {
        evaluate(actual, &self.values)
    }

    /// Render as CSV: `step[,date],forecast[,lower,upper]`
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_records(&mut writer)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| ForecastError::CsvError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ForecastError::CsvError(e.to_string()))
    }

    /// Write the CSV rendering to `path`
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        self.write_records(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_records<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        let mut header = vec!["step"];
        if self.dates.is_some() {
            header.push("date");
        }
        header.push("forecast");
        if self.intervals.is_some() {
            header.extend(["lower", "upper"]);
        }
        writer.write_record(&header)?;

        for (i, value) in self.values.iter().enumerate() {
            let mut record = vec![(i + 1).to_string()];
            if let Some(dates) = &self.dates {
                record.push(dates[i].format("%Y-%m-%d").to_string());
            }
            record.push(value.to_string());
            if let Some(intervals) = &self.intervals {
                let (lower, upper) = intervals[i];
                record.push(lower.to_string());
                record.push(upper.to_string());
            }
            writer.write_record(&record)?;
        }
        Ok(())
    }
}
