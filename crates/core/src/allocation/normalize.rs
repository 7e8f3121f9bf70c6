//! Decoding stored allocation entries into canonical form.
//!
//! This is the only place month indexing is interpreted. Two generations of
//! records exist:
//!
//! - current: explicit `month`/`year`, usually 1-indexed, but some older
//!   writes stored a 0-indexed month verbatim;
//! - legacy: a `monthKey` string, `YYYY-M` or `YYYY-MM`, with the same bug.
//!
//! A month of 0 can only be a 0-indexed January and is corrected to 1. Any
//! value in `1..=12` is taken as already 1-indexed, so 12 is always December.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use seamline_shared::YearMonth;
use serde_json::Map;
use tracing::warn;

use super::time::normalize_applied_at;
use super::types::{
    CanonicalAllocation, CanonicalMonthEntry, OrderFinancials, RawAllocation, RawAllocationEntry,
    amount,
};

/// Resolves the calendar month an entry refers to.
///
/// Explicit `month`/`year` take precedence over `monthKey`; when both are
/// present but unusable the entry is rejected without consulting the key.
#[must_use]
pub fn extract_month_year(entry: &RawAllocationEntry) -> Option<YearMonth> {
    if let (Some(month), Some(year)) = (&entry.month, &entry.year) {
        let month = whole_number(month.to_decimal()?)?;
        let year = whole_number(year.to_decimal()?)?;
        return resolve(year, month);
    }

    let key = entry.month_key.as_deref()?;
    let mut parts = key.split('-');
    let year = parts.next()?.trim().parse::<i64>().ok()?;
    let month = parts.next()?.trim().parse::<i64>().ok()?;
    resolve(year, month)
}

fn whole_number(value: Decimal) -> Option<i64> {
    if value.fract().is_zero() {
        value.to_i64()
    } else {
        None
    }
}

fn resolve(year: i64, month: i64) -> Option<YearMonth> {
    let month = if month == 0 { 1 } else { month };
    YearMonth::from_parts(year, month).ok()
}

/// Converts one stored entry to canonical form.
///
/// Money fields already on the entry are kept as stored; legacy records may
/// hold hand-adjusted figures. Missing ones are derived from `totals`.
#[must_use]
pub fn normalize_allocation_item(
    entry: &RawAllocationEntry,
    totals: &OrderFinancials,
) -> Option<CanonicalMonthEntry> {
    let Some(period) = extract_month_year(entry) else {
        warn!(
            month = ?entry.month,
            year = ?entry.year,
            month_key = ?entry.month_key,
            "Dropping allocation entry with unresolvable month"
        );
        return None;
    };

    let percentage = entry.percentage_value();
    let share = |total: Decimal| total * percentage / Decimal::ONE_HUNDRED;

    Some(CanonicalMonthEntry {
        period,
        percentage,
        revenue: amount(entry.revenue.as_ref()).unwrap_or_else(|| share(totals.revenue)),
        cost: amount(entry.cost.as_ref()).unwrap_or_else(|| share(totals.cost)),
        profit: amount(entry.profit.as_ref())
            .unwrap_or_else(|| share(totals.effective_profit())),
        days: amount(entry.days.as_ref()),
        extra: Map::new(),
    })
}

pub(crate) fn normalize_entries(
    entries: &[RawAllocationEntry],
    totals: &OrderFinancials,
) -> Vec<CanonicalMonthEntry> {
    entries
        .iter()
        .filter_map(|entry| normalize_allocation_item(entry, totals))
        .collect()
}

/// Converts a stored allocation to canonical form.
///
/// Returns `None` when there is no `allocations` array. Entry order is kept;
/// run [`super::deduplicate_allocations`] for unique, sorted months.
#[must_use]
pub fn normalize_allocation(
    allocation: &RawAllocation,
    totals: &OrderFinancials,
) -> Option<CanonicalAllocation> {
    let entries = allocation.allocations.as_deref()?;

    Some(CanonicalAllocation {
        allocations: normalize_entries(entries, totals),
        applied_at: normalize_applied_at(allocation.applied_at.as_ref(), Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::time::RawTimestamp;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> RawAllocationEntry {
        serde_json::from_value(value).unwrap()
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn totals() -> OrderFinancials {
        OrderFinancials::new(dec!(1000), dec!(400))
    }

    #[rstest]
    #[case(json!({ "month": 0, "year": 2024 }), Some((2024, 1)))]
    #[case(json!({ "month": 1, "year": 2024 }), Some((2024, 1)))]
    #[case(json!({ "month": 11, "year": 2024 }), Some((2024, 11)))]
    #[case(json!({ "month": 12, "year": 2024 }), Some((2024, 12)))]
    #[case(json!({ "month": "3", "year": "2024" }), Some((2024, 3)))]
    #[case(json!({ "month": 3.0, "year": 2024 }), Some((2024, 3)))]
    #[case(json!({ "month": 13, "year": 2024 }), None)]
    #[case(json!({ "month": -1, "year": 2024 }), None)]
    #[case(json!({ "month": 2.5, "year": 2024 }), None)]
    #[case(json!({ "month": 3, "year": 0 }), None)]
    #[case(json!({ "month": 3, "year": -2024 }), None)]
    #[case(json!({ "month": "March", "year": 2024 }), None)]
    #[case(json!({ "month": 3, "year": "NaN" }), None)]
    fn test_extract_explicit_fields(
        #[case] raw: serde_json::Value,
        #[case] expected: Option<(i32, u32)>,
    ) {
        let expected = expected.map(|(year, month)| ym(year, month));
        assert_eq!(extract_month_year(&entry(raw)), expected);
    }

    #[rstest]
    #[case("2024-00", Some((2024, 1)))]
    #[case("2024-0", Some((2024, 1)))]
    #[case("2024-3", Some((2024, 3)))]
    #[case("2024-03", Some((2024, 3)))]
    #[case("2024-12", Some((2024, 12)))]
    #[case("2024-13", None)]
    #[case("2024", None)]
    #[case("2024-", None)]
    #[case("abcd-03", None)]
    #[case("0000-03", None)]
    #[case("", None)]
    fn test_extract_month_key(#[case] key: &str, #[case] expected: Option<(i32, u32)>) {
        let raw = RawAllocationEntry::keyed(key, dec!(10));
        assert_eq!(
            extract_month_year(&raw),
            expected.map(|(year, month)| ym(year, month))
        );
    }

    #[test]
    fn test_explicit_fields_win_over_month_key() {
        let raw = entry(json!({ "month": 5, "year": 2024, "monthKey": "2023-01" }));
        assert_eq!(extract_month_year(&raw), Some(ym(2024, 5)));
    }

    #[test]
    fn test_invalid_explicit_fields_do_not_fall_back() {
        let raw = entry(json!({ "month": 40, "year": 2024, "monthKey": "2024-04" }));
        assert_eq!(extract_month_year(&raw), None);
    }

    #[test]
    fn test_half_explicit_uses_month_key() {
        let raw = entry(json!({ "month": 5, "monthKey": "2024-04" }));
        assert_eq!(extract_month_year(&raw), Some(ym(2024, 4)));
    }

    #[test]
    fn test_no_month_information() {
        let raw = entry(json!({ "percentage": 100 }));
        assert_eq!(extract_month_year(&raw), None);
    }

    #[test]
    fn test_item_derives_missing_amounts() {
        let raw = RawAllocationEntry::dated(2024, 3, dec!(25));
        let item = normalize_allocation_item(&raw, &totals()).unwrap();

        assert_eq!(item.period, ym(2024, 3));
        assert_eq!(item.percentage, dec!(25));
        assert_eq!(item.revenue, dec!(250));
        assert_eq!(item.cost, dec!(100));
        assert_eq!(item.profit, dec!(150));
        assert_eq!(item.days, None);
    }

    #[test]
    fn test_item_keeps_stored_amounts() {
        let raw = entry(json!({
            "month": 3,
            "year": 2024,
            "percentage": 25,
            "revenue": 300,
            "profit": "175.50",
            "days": 12
        }));
        let item = normalize_allocation_item(&raw, &totals()).unwrap();

        assert_eq!(item.revenue, dec!(300));
        assert_eq!(item.cost, dec!(100));
        assert_eq!(item.profit, dec!(175.50));
        assert_eq!(item.days, Some(dec!(12)));
    }

    #[test]
    fn test_item_uses_supplied_profit_total() {
        let totals = OrderFinancials::with_profit(dec!(1000), dec!(400), dec!(500));
        let raw = RawAllocationEntry::dated(2024, 3, dec!(10));
        let item = normalize_allocation_item(&raw, &totals).unwrap();
        assert_eq!(item.profit, dec!(50));
    }

    #[test]
    fn test_item_without_percentage() {
        let raw = entry(json!({ "monthKey": "2024-07" }));
        let item = normalize_allocation_item(&raw, &totals()).unwrap();
        assert_eq!(item.percentage, Decimal::ZERO);
        assert_eq!(item.revenue, Decimal::ZERO);
    }

    #[test]
    fn test_item_ignores_superseded_fields() {
        let raw = entry(json!({
            "monthKey": "2024-07",
            "percentage": 10,
            "method": "prorated",
            "originalRevenue": 999
        }));
        let item = normalize_allocation_item(&raw, &totals()).unwrap();
        assert!(item.extra.is_empty());
        assert_eq!(item.revenue, dec!(100));
    }

    #[test]
    fn test_unresolvable_item_dropped() {
        let raw = entry(json!({ "month": 14, "year": 2024, "percentage": 50 }));
        assert!(normalize_allocation_item(&raw, &totals()).is_none());
    }

    #[test]
    fn test_allocation_filters_bad_entries() {
        let allocation: RawAllocation = serde_json::from_value(json!({
            "allocations": [
                { "month": 0, "year": 2024, "percentage": 50 },
                { "monthKey": "garbage", "percentage": 10 },
                { "monthKey": "2024-02", "percentage": 50 }
            ],
            "appliedAt": { "seconds": 1_709_649_000_i64, "nanoseconds": 0 }
        }))
        .unwrap();

        let normalized = normalize_allocation(&allocation, &totals()).unwrap();
        let periods: Vec<YearMonth> = normalized.allocations.iter().map(|e| e.period).collect();

        assert_eq!(periods, vec![ym(2024, 1), ym(2024, 2)]);
        assert_eq!(normalized.applied_at, "2024-03-05T14:30:00.000Z");
    }

    #[test]
    fn test_explicit_fields_survive_non_string_month_key() {
        let allocation: RawAllocation = serde_json::from_value(json!({
            "allocations": [
                { "month": 3, "year": 2024, "percentage": 50, "monthKey": 202_403 },
                { "month": 4, "year": 2024, "percentage": 50 }
            ],
            "appliedAt": "2024-03-01T00:00:00.000Z"
        }))
        .unwrap();

        let normalized = normalize_allocation(&allocation, &totals()).unwrap();
        let periods: Vec<YearMonth> = normalized.allocations.iter().map(|e| e.period).collect();

        assert_eq!(periods, vec![ym(2024, 3), ym(2024, 4)]);
        assert_eq!(normalized.allocations[0].revenue, dec!(500));
    }

    #[test]
    fn test_allocation_without_array_is_none() {
        let allocation = RawAllocation {
            applied_at: Some(RawTimestamp::from("2024-01-01")),
            ..RawAllocation::default()
        };
        assert!(normalize_allocation(&allocation, &totals()).is_none());
    }

    #[test]
    fn test_missing_applied_at_defaults_to_now() {
        let before = Utc::now();
        let allocation = RawAllocation {
            allocations: Some(vec![]),
            ..RawAllocation::default()
        };
        let normalized = normalize_allocation(&allocation, &totals()).unwrap();
        let applied = chrono::DateTime::parse_from_rfc3339(&normalized.applied_at).unwrap();

        // Millisecond formatting truncates, so compare at that resolution.
        assert!(applied.timestamp_millis() >= before.timestamp_millis());
        assert!(normalized.allocations.is_empty());
    }
}
