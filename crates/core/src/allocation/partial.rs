//! Per-period slices of an order's figures for reporting.

use rayon::prelude::*;
use rust_decimal::Decimal;
use seamline_shared::YearMonth;

use super::normalize::normalize_entries;
use super::types::{OrderFinancials, OrderRecord, OrderSnapshot, PartialAmounts, PaymentInfo};

/// Returns the part of an order's figures that belongs to `target`.
///
/// - Unallocated orders are single-period: the full totals come back.
/// - Allocated orders return the target month's share, or all zeros when the
///   order is allocated only to other months, so that totals are never
///   counted in a period the order was moved out of.
#[must_use]
pub fn calculate_partial_amounts(
    order: &OrderRecord,
    totals: &OrderFinancials,
    payment: &PaymentInfo,
    target: YearMonth,
) -> PartialAmounts {
    let entries = match order
        .allocation
        .as_ref()
        .and_then(|allocation| allocation.allocations.as_deref())
    {
        Some(entries) if !entries.is_empty() => entries,
        _ => return unsliced(totals, payment),
    };

    normalize_entries(entries, totals)
        .iter()
        .find(|entry| entry.period == target)
        .map_or_else(PartialAmounts::zero, |entry| {
            sliced(totals, payment, entry.percentage)
        })
}

fn unsliced(totals: &OrderFinancials, payment: &PaymentInfo) -> PartialAmounts {
    PartialAmounts {
        revenue: totals.revenue,
        cost: totals.cost,
        profit: totals.effective_profit(),
        paid_amount: payment.amount_paid,
        balance: payment
            .balance
            .unwrap_or(totals.revenue - payment.amount_paid),
    }
}

fn sliced(totals: &OrderFinancials, payment: &PaymentInfo, percentage: Decimal) -> PartialAmounts {
    let share = |total: Decimal| total * percentage / Decimal::ONE_HUNDRED;

    let revenue = share(totals.revenue);
    let cost = share(totals.cost);
    let paid_amount = share(payment.amount_paid);

    PartialAmounts {
        revenue,
        cost,
        profit: revenue - cost,
        paid_amount,
        balance: revenue - paid_amount,
    }
}

/// Slices every order for `target`, in parallel.
///
/// One result per snapshot, in input order. No totals are rolled up.
#[must_use]
pub fn slice_orders(snapshots: &[OrderSnapshot], target: YearMonth) -> Vec<PartialAmounts> {
    snapshots
        .par_iter()
        .map(|snapshot| {
            calculate_partial_amounts(&snapshot.order, &snapshot.totals, &snapshot.payment, target)
        })
        .collect()
}
