//! Proposed allocation plans for a service period.
//!
//! Percentages are rounded to two decimals with the Largest Remainder
//! Method, so a proposed plan always sums to exactly 100:
//! 1. Compute each month's exact share of 100
//! 2. Round every share down
//! 3. Hand the leftover hundredths to the largest fractional parts

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use seamline_shared::YearMonth;

use super::span::months_between;
use super::types::PlanEntry;

const PERCENT_DECIMAL_PLACES: u32 = 2;

/// One plan entry per month, weighted by service days in that month.
///
/// Both endpoints count as service days. Empty when `start` is after `end`.
#[must_use]
pub fn prorate_by_days(start: NaiveDate, end: NaiveDate) -> Vec<PlanEntry> {
    if start > end {
        return Vec::new();
    }

    let months = months_between(start, end);
    let days: Vec<u32> = months
        .iter()
        .map(|month| {
            let from = start.max(month.first_day());
            let to = end.min(month.last_day());
            u32::try_from((to - from).num_days() + 1).unwrap_or(0)
        })
        .collect();

    let weights: Vec<Decimal> = days.iter().map(|d| Decimal::from(*d)).collect();
    let percentages = split_hundred(&weights);

    months
        .into_iter()
        .zip(days)
        .zip(percentages)
        .map(|((period, days), percentage)| PlanEntry {
            period,
            percentage,
            days: Some(days),
        })
        .collect()
}

/// Equal shares across `months`.
#[must_use]
pub fn split_evenly(months: &[YearMonth]) -> Vec<PlanEntry> {
    let weights = vec![Decimal::ONE; months.len()];
    months
        .iter()
        .zip(split_hundred(&weights))
        .map(|(period, percentage)| PlanEntry::new(*period, percentage))
        .collect()
}

/// Splits 100 proportionally to `weights`, summing to exactly 100.
fn split_hundred(weights: &[Decimal]) -> Vec<Decimal> {
    let total_weight: Decimal = weights.iter().copied().sum();
    if weights.is_empty() || total_weight.is_zero() {
        return vec![Decimal::ZERO; weights.len()];
    }

    let hundred = Decimal::ONE_HUNDRED;
    let unit = Decimal::new(1, PERCENT_DECIMAL_PLACES);

    let exact: Vec<Decimal> = weights
        .iter()
        .map(|w| hundred * *w / total_weight)
        .collect();

    let mut rounded: Vec<Decimal> = exact
        .iter()
        .map(|p| p.round_dp_with_strategy(PERCENT_DECIMAL_PLACES, RoundingStrategy::ToZero))
        .collect();

    let sum_rounded: Decimal = rounded.iter().copied().sum();
    let units_to_distribute = ((hundred - sum_rounded) / unit)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_usize()
        .unwrap_or(0);

    if units_to_distribute == 0 {
        return rounded;
    }

    let mut remainders: Vec<(usize, Decimal)> = exact
        .iter()
        .zip(rounded.iter())
        .enumerate()
        .map(|(i, (e, r))| (i, *e - *r))
        .collect();

    // Stable: ties go to the earlier month.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));

    for (idx, _) in remainders.iter().take(units_to_distribute) {
        rounded[*idx] += unit;
    }

    rounded
}
