//! Merging duplicate month entries.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use rust_decimal::Decimal;
use seamline_shared::YearMonth;
use tracing::warn;

use super::normalize::extract_month_year;
use super::types::{CanonicalMonthEntry, RawAllocationEntry, amount};

/// Entries at or below this percentage are leftovers from manual edits.
pub const NEGLIGIBLE_PERCENTAGE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Merges entries that resolve to the same month.
///
/// Negligible entries are dropped first. Quantities of duplicates are summed;
/// carried-over fields are last-write-wins. Output is one entry per month in
/// chronological order. Input is never modified, so this is safe to run on
/// every read.
#[must_use]
pub fn deduplicate_allocations(entries: &[RawAllocationEntry]) -> Vec<CanonicalMonthEntry> {
    let mut merged: BTreeMap<YearMonth, CanonicalMonthEntry> = BTreeMap::new();

    for entry in entries {
        let percentage = entry.percentage_value();
        if percentage <= NEGLIGIBLE_PERCENTAGE {
            continue;
        }

        let Some(period) = extract_month_year(entry) else {
            warn!(
                month = ?entry.month,
                year = ?entry.year,
                month_key = ?entry.month_key,
                "Skipping allocation entry with unresolvable month during merge"
            );
            continue;
        };

        let incoming = CanonicalMonthEntry {
            period,
            percentage,
            revenue: amount(entry.revenue.as_ref()).unwrap_or(Decimal::ZERO),
            cost: amount(entry.cost.as_ref()).unwrap_or(Decimal::ZERO),
            profit: amount(entry.profit.as_ref()).unwrap_or(Decimal::ZERO),
            days: amount(entry.days.as_ref()),
            extra: entry.extra.clone(),
        };

        match merged.entry(period) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => absorb(slot.get_mut(), incoming),
        }
    }

    merged.into_values().collect()
}

fn absorb(target: &mut CanonicalMonthEntry, incoming: CanonicalMonthEntry) {
    target.percentage += incoming.percentage;
    target.revenue += incoming.revenue;
    target.cost += incoming.cost;
    target.profit += incoming.profit;
    target.days = match (target.days, incoming.days) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    };
    target.extra.extend(incoming.extra);
}
