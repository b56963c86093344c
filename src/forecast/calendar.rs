//! Mapping of (year, month) aggregate rows onto a monthly time series.
//!
//! This is the only place that knows how rows become a regular series, so the
//! gap handling strategy can change without touching the model.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::error::ForecastError;
use crate::models::reservation::ReservationCount;

/// Longest series `fill_zero` will build (fifty years of months)
pub const MAX_FILLED_MONTHS: usize = 600;

/// How months missing from the query result are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Rows are taken in the order given and assumed to be contiguous months
    #[default]
    AsObserved,
    /// Months between the first and last row that have no row get a zero count
    FillZero,
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Returns `None` when `month` is outside 1..=12 or the year is not representable
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// First day of the month
    pub fn to_date(self) -> NaiveDate {
        // Construction guarantees a valid first-of-month date
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Months since year 0, used for month arithmetic
    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// The month `months` after this one (negative goes back), with year rollover
    pub fn offset(self, months: i64) -> Self {
        Self::from_ordinal(self.ordinal() + months)
    }

    /// Number of months from `self` to `other`
    pub fn months_until(self, other: YearMonth) -> i64 {
        other.ordinal() - self.ordinal()
    }
}

/// Regularly spaced monthly series built from aggregate rows
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl MonthlySeries {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Month of the last observation; forecasts start right after it
    pub fn last_month(&self) -> Option<YearMonth> {
        self.dates.last().copied().map(YearMonth::from_date)
    }

    /// Build the series from rows according to `policy`
    pub fn from_rows(rows: &[ReservationCount], policy: GapPolicy) -> Result<Self, ForecastError> {
        let observed = rows
            .iter()
            .map(parse_row)
            .collect::<Result<Vec<_>, _>>()?;

        match policy {
            GapPolicy::AsObserved => Ok(Self {
                dates: observed.iter().map(|(m, _)| m.to_date()).collect(),
                values: observed.iter().map(|(_, v)| *v).collect(),
            }),
            GapPolicy::FillZero => fill_zero(&observed),
        }
    }
}

fn parse_row(row: &ReservationCount) -> Result<(YearMonth, f64), ForecastError> {
    let month = u32::try_from(row.month)
        .ok()
        .and_then(|m| YearMonth::new(row.year, m))
        .ok_or_else(|| {
            ForecastError::MalformedInput(format!("invalid month {}-{}", row.year, row.month))
        })?;

    if row.count < 0 {
        return Err(ForecastError::MalformedInput(format!(
            "negative count {} for {}-{:02}",
            row.count, month.year, month.month
        )));
    }

    Ok((month, row.count as f64))
}

fn fill_zero(observed: &[(YearMonth, f64)]) -> Result<MonthlySeries, ForecastError> {
    let mut dates = Vec::new();
    let mut values = Vec::new();
    let mut previous: Option<YearMonth> = None;

    for &(month, count) in observed {
        if let Some(prev) = previous {
            let step = prev.months_until(month);
            if step <= 0 {
                return Err(ForecastError::MalformedInput(format!(
                    "rows are not strictly increasing at {}-{:02}",
                    month.year, month.month
                )));
            }
            if dates.len() + step as usize > MAX_FILLED_MONTHS {
                return Err(ForecastError::MalformedInput(format!(
                    "gap before {}-{:02} would extend the series past {} months",
                    month.year, month.month, MAX_FILLED_MONTHS
                )));
            }
            for gap in 1..step {
                dates.push(prev.offset(gap).to_date());
                values.push(0.0);
            }
        }
        dates.push(month.to_date());
        values.push(count);
        previous = Some(month);
    }

    Ok(MonthlySeries { dates, values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32, month: i32, count: i64) -> ReservationCount {
        ReservationCount { year, month, count }
    }

    #[test]
    fn test_year_month_date_round_trip() {
        for year in [1999, 2023, 2024] {
            for month in 1..=12 {
                let ym = YearMonth::new(year, month).unwrap();
                let date = ym.to_date();
                assert_eq!(date.day(), 1);
                assert_eq!(YearMonth::from_date(date), ym);
            }
        }
    }

    #[test]
    fn test_offset_rolls_over_year() {
        let dec = YearMonth::new(2024, 12).unwrap();
        assert_eq!(dec.offset(1), YearMonth::new(2025, 1).unwrap());
        assert_eq!(dec.offset(14), YearMonth::new(2026, 2).unwrap());
        assert_eq!(dec.offset(-12), YearMonth::new(2023, 12).unwrap());

        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.offset(-1), YearMonth::new(2023, 12).unwrap());
        assert_eq!(jan.months_until(dec), 11);
    }

    #[test]
    fn test_invalid_months_rejected() {
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());

        let err = MonthlySeries::from_rows(&[row(2024, 13, 1)], GapPolicy::AsObserved).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(_)));

        let err = MonthlySeries::from_rows(&[row(2024, 2, -1)], GapPolicy::AsObserved).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(_)));
    }

    #[test]
    fn test_as_observed_keeps_gaps() {
        let rows = [row(2023, 1, 4), row(2023, 3, 6), row(2023, 4, 2)];
        let series = MonthlySeries::from_rows(&rows, GapPolicy::AsObserved).unwrap();
        assert_eq!(series.values(), &[4.0, 6.0, 2.0]);
        assert_eq!(series.dates()[1], NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(series.last_month(), YearMonth::new(2023, 4));
    }

    #[test]
    fn test_fill_zero_inserts_missing_months() {
        let rows = [row(2023, 11, 4), row(2024, 2, 6)];
        let series = MonthlySeries::from_rows(&rows, GapPolicy::FillZero).unwrap();
        assert_eq!(series.values(), &[4.0, 0.0, 0.0, 6.0]);
        assert_eq!(series.dates()[1], NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(series.dates()[2], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_fill_zero_rejects_unordered_rows() {
        let rows = [row(2023, 5, 4), row(2023, 5, 6)];
        let err = MonthlySeries::from_rows(&rows, GapPolicy::FillZero).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(_)));

        let rows = [row(2023, 5, 4), row(2023, 2, 6)];
        assert!(MonthlySeries::from_rows(&rows, GapPolicy::FillZero).is_err());
        assert!(MonthlySeries::from_rows(&rows, GapPolicy::AsObserved).is_ok());
    }

    #[test]
    fn test_fill_zero_rejects_runaway_gaps() {
        let rows = [row(2020, 1, 3), row(9000, 1, 5)];
        let err = MonthlySeries::from_rows(&rows, GapPolicy::FillZero).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(_)));

        // Exactly at the cap is still accepted
        let last = YearMonth::new(2000, 1).unwrap().offset(MAX_FILLED_MONTHS as i64 - 1);
        let rows = [row(2000, 1, 3), row(last.year, last.month as i32, 5)];
        let series = MonthlySeries::from_rows(&rows, GapPolicy::FillZero).unwrap();
        assert_eq!(series.len(), MAX_FILLED_MONTHS);
    }
}
