//! End-to-end allocation flow over stored order documents.
//!
//! Covers both schema generations as they come out of the document store:
//! - parse, normalize and merge a stored order
//! - slice orders for a reporting month
//! - commit a plan, persist it as JSON and read it back

#![allow(clippy::unreadable_literal)]

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use seamline_core::YearMonth;
use seamline_core::allocation::{
    AllocationError, OrderFinancials, OrderRecord, OrderSnapshot, PaymentInfo, PlanEntry,
    RawAllocation, StatusKind, calculate_partial_amounts, create_allocation_at,
    create_checked_allocation, deduplicate_allocations, generate_months_between_dates,
    get_allocation_status, normalize_allocation, prorate_by_days, slice_orders,
};

fn ym(year: i32, month: u32) -> YearMonth {
    YearMonth::new(year, month).unwrap()
}

fn legacy_order() -> OrderRecord {
    serde_json::from_value(json!({
        "id": "ord-1042",
        "customer": "Harbor Cafe",
        "startDate": { "seconds": 1_701_388_800_i64, "nanoseconds": 0 },
        "endDate": "2024-02-10",
        "allocation": {
            "method": "manual",
            "appliedAt": { "_seconds": 1_704_067_200_i64, "_nanoseconds": 0 },
            "allocations": [
                { "monthKey": "2023-12", "percentage": 25, "method": "manual" },
                { "month": 0, "year": 2024, "percentage": "50" },
                { "monthKey": "2024-2", "percentage": 25, "originalRevenue": 900 },
                { "monthKey": "2024-02", "percentage": 0.005 },
                { "month": 19, "year": 2024, "percentage": 10 }
            ]
        }
    }))
    .unwrap()
}

#[test]
fn stored_order_normalizes_and_merges() {
    let order = legacy_order();
    let totals = OrderFinancials::new(dec!(1000), dec!(400));
    let allocation = order.allocation.as_ref().unwrap();

    let normalized = normalize_allocation(allocation, &totals).unwrap();
    let periods: Vec<YearMonth> = normalized.allocations.iter().map(|e| e.period).collect();
    assert_eq!(
        periods,
        vec![ym(2023, 12), ym(2024, 1), ym(2024, 2), ym(2024, 2)],
        "unresolvable month dropped, order kept"
    );
    assert_eq!(normalized.applied_at, "2024-01-01T00:00:00.000Z");
    assert_eq!(normalized.allocations[1].revenue, dec!(500));

    let merged = deduplicate_allocations(allocation.allocations.as_deref().unwrap());
    let summary: Vec<(YearMonth, Decimal)> =
        merged.iter().map(|e| (e.period, e.percentage)).collect();
    assert_eq!(
        summary,
        vec![
            (ym(2023, 12), dec!(25)),
            (ym(2024, 1), dec!(50)),
            (ym(2024, 2), dec!(25)),
        ]
    );
    assert!(get_allocation_status(&merged).is_valid());
    assert_eq!(merged[2].extra["originalRevenue"], json!(900));
}

#[test]
fn service_period_spans_stored_timestamps() {
    let order = legacy_order();
    let months = generate_months_between_dates(
        order.start_date.as_ref().unwrap(),
        order.end_date.as_ref().unwrap(),
    );
    assert_eq!(months, vec![ym(2023, 12), ym(2024, 1), ym(2024, 2)]);
}

#[test]
fn monthly_report_slices_each_order() {
    let totals = OrderFinancials::new(dec!(1000), dec!(400));
    let snapshots = vec![
        OrderSnapshot {
            order: legacy_order(),
            totals,
            payment: PaymentInfo::paid(dec!(200)),
        },
        OrderSnapshot {
            order: OrderRecord::default(),
            totals: OrderFinancials::new(dec!(300), dec!(100)),
            payment: PaymentInfo {
                amount_paid: dec!(100),
                balance: Some(dec!(150)),
            },
        },
    ];

    let january = slice_orders(&snapshots, ym(2024, 1));
    assert_eq!(january.len(), 2);
    assert_eq!(january[0].revenue, dec!(500));
    assert_eq!(january[0].cost, dec!(200));
    assert_eq!(january[0].profit, dec!(300));
    assert_eq!(january[0].paid_amount, dec!(100));
    assert_eq!(january[0].balance, dec!(400));
    assert_eq!(january[1].revenue, dec!(300), "unallocated order is unsliced");
    assert_eq!(january[1].balance, dec!(150));

    let march = slice_orders(&snapshots, ym(2024, 3));
    assert_eq!(march[0].revenue, Decimal::ZERO);
    assert_eq!(march[0].paid_amount, Decimal::ZERO);
}

#[test]
fn committed_plan_survives_persistence() {
    let totals = OrderFinancials::with_profit(dec!(1000), dec!(400), dec!(600));
    let plan = vec![
        PlanEntry::from_parts(2024, 11, dec!(25)).unwrap(),
        PlanEntry::from_parts(2024, 12, dec!(50)).unwrap(),
        PlanEntry::from_parts(2025, 1, dec!(25)).unwrap(),
    ];
    let applied_at = Utc.with_ymd_and_hms(2024, 10, 30, 9, 15, 0).unwrap();

    let built = create_allocation_at(&plan, &totals, applied_at);
    let stored = serde_json::to_string(&built).unwrap();
    let read_back = RawAllocation::from_json(&stored).unwrap();
    let normalized = normalize_allocation(&read_back, &totals).unwrap();

    assert_eq!(normalized, built);
    assert_eq!(normalized.applied_at, "2024-10-30T09:15:00.000Z");

    let order = OrderRecord::with_allocation(read_back);
    let december = calculate_partial_amounts(
        &order,
        &totals,
        &PaymentInfo::paid(dec!(400)),
        ym(2024, 12),
    );
    assert_eq!(december.revenue, dec!(500));
    assert_eq!(december.paid_amount, dec!(200));
    assert_eq!(december.balance, dec!(300));
}

#[test]
fn prorated_plan_commits_cleanly() {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    let end = chrono::NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    let plan = prorate_by_days(start, end);
    let totals = OrderFinancials::new(dec!(1200), dec!(500));

    let committed = create_checked_allocation(&plan, &totals).unwrap();
    let revenue: Decimal = committed.allocations.iter().map(|e| e.revenue).sum();
    assert_eq!(revenue, dec!(1200));
}

#[test]
fn unbalanced_plan_is_rejected_when_checked() {
    let plan = vec![PlanEntry::from_parts(2024, 5, dec!(80)).unwrap()];
    let totals = OrderFinancials::new(dec!(100), dec!(50));

    match create_checked_allocation(&plan, &totals) {
        Err(AllocationError::Unbalanced { status, message }) => {
            assert_eq!(status, StatusKind::Under);
            assert!(message.starts_with("Under-allocated by 20.0%"));
        }
        other => panic!("expected unbalanced error, got {other:?}"),
    }
}
