//! Calendar month type used as the unit of allocation.
//!
//! A `YearMonth` is always valid: month in `1..=12` and a positive year.
//! Anything decoded from storage goes through [`YearMonth::new`] or
//! [`str::parse`] before it is allowed to reach comparison or arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A calendar month, 1-indexed.
///
/// Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

/// Error returned when a value cannot be turned into a `YearMonth`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Month outside `1..=12`.
    #[error("Invalid month: {0}")]
    InvalidMonth(i64),

    /// Year zero or negative, or beyond the calendar range.
    #[error("Invalid year: {0}")]
    InvalidYear(i64),

    /// Text not in `YYYY-MM` form.
    #[error("Invalid period key: {0}")]
    InvalidKey(String),
}

impl YearMonth {
    /// Creates a new period, validating both components.
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth(i64::from(month)));
        }
        if year <= 0 || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PeriodError::InvalidYear(i64::from(year)));
        }
        Ok(Self { year, month })
    }

    /// Creates a period from wide integers, as decoded from untrusted input.
    pub fn from_parts(year: i64, month: i64) -> Result<Self, PeriodError> {
        let month = u32::try_from(month).map_err(|_| PeriodError::InvalidMonth(month))?;
        let year = i32::try_from(year).map_err(|_| PeriodError::InvalidYear(year))?;
        Self::new(year, month)
    }

    /// Returns the month containing `date`.
    ///
    /// Fails only for dates before year 1.
    pub fn from_date(date: NaiveDate) -> Result<Self, PeriodError> {
        Self::new(date.year(), date.month())
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1 = January.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Zero-padded storage key, e.g. `2024-03`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    /// The following month, rolling the year after December.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| PeriodError::InvalidKey(s.to_string()))?;
        let year: i64 = year
            .parse()
            .map_err(|_| PeriodError::InvalidKey(s.to_string()))?;
        let month: i64 = month
            .parse()
            .map_err(|_| PeriodError::InvalidKey(s.to_string()))?;
        Self::from_parts(year, month)
    }
}

#[derive(Deserialize)]
struct YearMonthParts {
    year: i32,
    month: u32,
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parts = YearMonthParts::deserialize(deserializer)?;
        Self::new(parts.year, parts.month).map_err(serde::de::Error::custom)
    }
}
