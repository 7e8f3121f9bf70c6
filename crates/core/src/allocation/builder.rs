//! Building a new allocation from a committed plan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Map;

use super::error::AllocationError;
use super::time::to_iso_string;
use super::types::{CanonicalAllocation, CanonicalMonthEntry, OrderFinancials, PlanEntry};
use super::validation::get_allocation_status;

/// Builds the allocation to persist for `plan`, stamped with the current time.
///
/// Performs no validation: check [`get_allocation_status`] before committing.
/// The result replaces any previously stored allocation wholesale.
#[must_use]
pub fn create_allocation(plan: &[PlanEntry], totals: &OrderFinancials) -> CanonicalAllocation {
    create_allocation_at(plan, totals, Utc::now())
}

/// Same as [`create_allocation`] with an explicit commit instant.
#[must_use]
pub fn create_allocation_at(
    plan: &[PlanEntry],
    totals: &OrderFinancials,
    applied_at: DateTime<Utc>,
) -> CanonicalAllocation {
    let profit = totals.effective_profit();

    let allocations = plan
        .iter()
        .map(|entry| {
            let share = |total: Decimal| total * entry.percentage / Decimal::ONE_HUNDRED;
            CanonicalMonthEntry {
                period: entry.period,
                percentage: entry.percentage,
                revenue: share(totals.revenue),
                cost: share(totals.cost),
                profit: share(profit),
                days: entry.days.map(Decimal::from),
                extra: Map::new(),
            }
        })
        .collect();

    CanonicalAllocation {
        allocations,
        applied_at: to_iso_string(applied_at),
    }
}

/// Builds the allocation only if the plan's percentages sum to 100.
pub fn create_checked_allocation(
    plan: &[PlanEntry],
    totals: &OrderFinancials,
) -> Result<CanonicalAllocation, AllocationError> {
    let status = get_allocation_status(plan);
    if !status.is_valid() {
        return Err(AllocationError::Unbalanced {
            status: status.status,
            message: status.message,
        });
    }
    Ok(create_allocation(plan, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::validation::StatusKind;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use seamline_shared::YearMonth;

    fn plan() -> Vec<PlanEntry> {
        vec![
            PlanEntry::from_parts(2023, 12, dec!(25)).unwrap(),
            PlanEntry::from_parts(2024, 1, dec!(50)).unwrap(),
            PlanEntry::from_parts(2024, 2, dec!(25)).unwrap(),
        ]
    }

    #[test]
    fn test_amounts_scaled_by_percentage() {
        let totals = OrderFinancials::new(dec!(1200), dec!(500));
        let applied = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let allocation = create_allocation_at(&plan(), &totals, applied);

        assert_eq!(allocation.applied_at, "2024-01-10T09:00:00.000Z");
        assert_eq!(allocation.allocations.len(), 3);

        let january = &allocation.allocations[1];
        assert_eq!(january.period, YearMonth::new(2024, 1).unwrap());
        assert_eq!(january.revenue, dec!(600));
        assert_eq!(january.cost, dec!(250));
        assert_eq!(january.profit, dec!(350));
    }

    #[test]
    fn test_supplied_profit_used() {
        let totals = OrderFinancials::with_profit(dec!(1200), dec!(500), dec!(400));
        let allocation = create_allocation(&plan(), &totals);
        assert_eq!(allocation.allocations[0].profit, dec!(100));
    }

    #[test]
    fn test_days_carried() {
        let mut entries = plan();
        entries[0].days = Some(9);
        let allocation = create_allocation(&entries, &OrderFinancials::new(dec!(100), dec!(0)));
        assert_eq!(allocation.allocations[0].days, Some(dec!(9)));
        assert_eq!(allocation.allocations[1].days, None);
    }

    #[test]
    fn test_unbalanced_plan_still_built() {
        let entries = vec![PlanEntry::from_parts(2024, 1, dec!(130)).unwrap()];
        let allocation = create_allocation(&entries, &OrderFinancials::new(dec!(100), dec!(40)));
        assert_eq!(allocation.allocations[0].revenue, dec!(130));
    }

    #[test]
    fn test_checked_rejects_unbalanced_plan() {
        let entries = vec![PlanEntry::from_parts(2024, 1, dec!(60)).unwrap()];
        let result = create_checked_allocation(&entries, &OrderFinancials::new(dec!(100), dec!(40)));

        match result {
            Err(AllocationError::Unbalanced { status, message }) => {
                assert_eq!(status, StatusKind::Under);
                assert!(message.contains("40.0"));
            }
            other => panic!("expected Unbalanced, got {other:?}"),
        }
    }

    #[test]
    fn test_checked_accepts_complete_plan() {
        let allocation =
            create_checked_allocation(&plan(), &OrderFinancials::new(dec!(100), dec!(40))).unwrap();
        assert_eq!(allocation.allocations.len(), 3);
    }

    #[test]
    fn test_empty_plan() {
        let allocation = create_allocation(&[], &OrderFinancials::new(dec!(100), dec!(40)));
        assert!(allocation.allocations.is_empty());
    }
}
