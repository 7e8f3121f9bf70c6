//! Calendar month spans.

use chrono::NaiveDate;
use seamline_shared::YearMonth;

use super::time::RawTimestamp;

/// Months from `start` to `end` inclusive, compared by year and month only.
///
/// Empty when `start` falls in a later month than `end`.
#[must_use]
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<YearMonth> {
    let (Ok(first), Ok(last)) = (YearMonth::from_date(start), YearMonth::from_date(end)) else {
        return Vec::new();
    };

    let mut months = Vec::new();
    let mut current = first;
    while current <= last {
        months.push(current);
        current = current.next();
    }
    months
}

/// Months spanned by two stored date values.
///
/// Unparseable dates yield an empty span rather than an error; callers treat
/// that as "nothing to allocate".
#[must_use]
pub fn generate_months_between_dates(start: &RawTimestamp, end: &RawTimestamp) -> Vec<YearMonth> {
    match (start.to_date(), end.to_date()) {
        (Some(start), Some(end)) => months_between(start, end),
        _ => Vec::new(),
    }
}
