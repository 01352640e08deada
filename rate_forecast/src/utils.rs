//! Utility functions for the rate_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// Split into a leading training part and a trailing holdout part
///
/// The holdout never takes the last training element; a ratio outside
/// `(0, 1)` yields an empty holdout.
pub fn holdout_split<T>(data: &[T], test_ratio: f64) -> (&[T], &[T]) {
    if data.len() < 2 || !(test_ratio > 0.0 && test_ratio < 1.0) {
        return (data, &[]);
    }

    let test_size = ((data.len() as f64 * test_ratio).round() as usize).min(data.len() - 1);
    data.split_at(data.len() - test_size)
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Month-start dates of the `horizon` months following `last`
pub fn future_months(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    let base = month_start(last);
    (1..=horizon)
        .map(|step| {
            u32::try_from(step)
                .ok()
                .and_then(|m| base.checked_add_months(Months::new(m)))
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "cannot step {} months past {}",
                        step, last
                    ))
                })
        })
        .collect()
}

/// Parse a date written as `yyyy-mm-dd`, `dd/mm/yyyy` or `yyyy-mm`
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").ok())
}

/// Parse a number that may use a comma as decimal separator
pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let normalized = if text.contains(',') && !text.contains('.') {
        text.replace(',', ".")
    } else {
        text.replace(',', "")
    };
    normalized.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holdout_split() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (train, test) = holdout_split(&data, 0.4);
        assert_eq!(train, &[1.0, 2.0, 3.0]);
        assert_eq!(test, &[4.0, 5.0]);

        let (train, test) = holdout_split(&data, 0.0);
        assert_eq!(train.len(), 5);
        assert!(test.is_empty());

        let (train, test) = holdout_split(&[7usize, 8], 0.9);
        assert_eq!(train, &[7]);
        assert_eq!(test, &[8]);
        assert!(holdout_split(&[1.0], 0.5).1.is_empty());
    }

    #[test]
    fn test_future_months_cross_year() {
        let last = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        let months = future_months(last, 3).unwrap();
        assert_eq!(
            months,
            vec![
                NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ]
        );
        assert!(future_months(last, 0).unwrap().is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_date("2024-03-01"), Some(expected));
        assert_eq!(parse_date("01/03/2024"), Some(expected));
        assert_eq!(parse_date("2024-03"), Some(expected));
        assert_eq!(parse_date("March"), None);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0,38"), Some(0.38));
        assert_eq!(parse_decimal("1.05"), Some(1.05));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("n/a"), None);
    }
}
