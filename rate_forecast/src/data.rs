//! Monthly rate series and loaders for the formats the series arrives in

use crate::error::{ForecastError, Result};
use crate::utils::{parse_date, parse_decimal};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// One monthly observation, value in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    /// Reference date of the observation
    pub date: NaiveDate,
    /// Rate in percent (`1.05` means 1.05%)
    pub value: f64,
}

/// Ordered monthly rate series
///
/// Values are always present; dates only when the source carried them.
/// The series is never mutated by the forecasting core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSeries {
    values: Vec<f64>,
    dates: Option<Vec<NaiveDate>>,
}

fn check_finite(values: &[f64]) -> Result<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(ForecastError::NumericalFault(format!(
            "non-finite rate {} at position {}",
            values[i], i
        ))),
        None => Ok(()),
    }
}

impl RateSeries {
    /// Series from bare values in chronological order
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        check_finite(&values)?;
        Ok(Self { values, dates: None })
    }

    /// Series from dated observations, sorted chronologically
    pub fn from_observations(mut observations: Vec<RateObservation>) -> Result<Self> {
        observations.sort_by_key(|o| o.date);
        let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
        check_finite(&values)?;
        Ok(Self {
            values,
            dates: Some(observations.iter().map(|o| o.date).collect()),
        })
    }

    /// Rate values in percent
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observation dates, if known
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Date of the most recent observation, if known
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.as_ref().and_then(|d| d.last().copied())
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dated observations, if the series carries dates
    pub fn observations(&self) -> Option<Vec<RateObservation>> {
        self.dates.as_ref().map(|dates| {
            dates
                .iter()
                .zip(&self.values)
                .map(|(&date, &value)| RateObservation { date, value })
                .collect()
        })
    }
}

/// One record of the central bank time-series (SGS) JSON payload
#[derive(Debug, Deserialize)]
struct SgsRecord {
    data: String,
    valor: SgsValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SgsValue {
    Text(String),
    Number(f64),
}

/// Data loader for rate series
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a series from a CSV file with a date column and a value column
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<RateSeries> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Build a series from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<RateSeries> {
        let date_column = Self::detect_date_column(df)?;
        let value_column = Self::detect_value_column(df, &date_column)?;
        debug!(%date_column, %value_column, rows = df.height(), "detected rate columns");

        let dates = Self::read_dates(df.column(&date_column)?)?;
        let values = Self::read_values(df.column(&value_column)?)?;

        RateSeries::from_observations(
            dates
                .into_iter()
                .zip(values)
                .map(|(date, value)| RateObservation { date, value })
                .collect(),
        )
    }

    /// Load a series from a file holding an SGS JSON payload
    pub fn from_sgs_json<P: AsRef<Path>>(path: P) -> Result<RateSeries> {
        let text = std::fs::read_to_string(path)?;
        Self::from_sgs_json_str(&text)
    }

    /// Parse an SGS JSON payload: `[{"data": "dd/mm/yyyy", "valor": "0.38"}, ...]`
    pub fn from_sgs_json_str(payload: &str) -> Result<RateSeries> {
        let records: Vec<SgsRecord> = serde_json::from_str(payload)?;

        let observations = records
            .into_iter()
            .enumerate()
            .map(|(row, record)| {
                let date = NaiveDate::parse_from_str(record.data.trim(), "%d/%m/%Y").map_err(|_| {
                    ForecastError::DataError(format!("row {}: unparsable date {:?}", row, record.data))
                })?;
                let value = match record.valor {
                    SgsValue::Number(v) => v,
                    SgsValue::Text(ref s) => parse_decimal(s).ok_or_else(|| {
                        ForecastError::DataError(format!("row {}: unparsable value {:?}", row, s))
                    })?,
                };
                Ok(RateObservation { date, value })
            })
            .collect::<Result<Vec<_>>>()?;

        RateSeries::from_observations(observations)
    }

    /// Detect the date column in a DataFrame
    fn detect_date_column(df: &DataFrame) -> Result<String> {
        for name in df.get_column_names() {
            let lower = name.to_lowercase();
            if lower.contains("date") || lower == "data" || lower.contains("month") || lower.contains("time")
            {
                return Ok(name.to_string());
            }
        }

        if let Some(first) = df.get_columns().first() {
            if first.dtype().is_temporal() {
                return Ok(first.name().to_string());
            }
        }

        Err(ForecastError::DataError(
            "No date column found in data".to_string(),
        ))
    }

    /// Detect the value column, falling back to the first non-date column
    fn detect_value_column(df: &DataFrame, date_column: &str) -> Result<String> {
        let names = df.get_column_names();
        let keywords = ["valor", "value", "rate", "taxa", "cdi"];

        names
            .iter()
            .find(|name| {
                let lower = name.to_lowercase();
                keywords.iter().any(|k| lower.contains(k))
            })
            .or_else(|| names.iter().find(|name| **name != date_column))
            .map(|name| name.to_string())
            .ok_or_else(|| ForecastError::DataError("No value column found in data".to_string()))
    }

    fn read_dates(column: &Series) -> Result<Vec<NaiveDate>> {
        let text = match column.dtype() {
            DataType::Utf8 => column.clone(),
            _ => column.cast(&DataType::Utf8)?,
        };

        text.utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.and_then(parse_date).ok_or_else(|| {
                    ForecastError::DataError(format!("row {}: unparsable date {:?}", row, cell))
                })
            })
            .collect()
    }

    fn read_values(column: &Series) -> Result<Vec<f64>> {
        if let DataType::Utf8 = column.dtype() {
            return column
                .utf8()?
                .into_iter()
                .enumerate()
                .map(|(row, cell)| {
                    cell.and_then(parse_decimal).ok_or_else(|| {
                        ForecastError::DataError(format!("row {}: unparsable value {:?}", row, cell))
                    })
                })
                .collect();
        }

        column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.ok_or_else(|| ForecastError::DataError(format!("row {}: missing value", row)))
            })
            .collect()
    }
}
