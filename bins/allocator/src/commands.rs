//! Command handlers.
//!
//! Each handler loads its input, hands it to a pure report function and
//! returns the report as JSON. Only the loading half touches the filesystem.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use seamline_core::YearMonth;
use seamline_core::allocation::{
    AllocationStatus, CanonicalAllocation, CanonicalMonthEntry, NormalizationCache,
    OrderFinancials, OrderRecord, OrderSnapshot, PartialAmounts, PlanEntry, RawTimestamp,
    create_allocation, create_checked_allocation, deduplicate_allocations,
    generate_months_between_dates, get_allocation_status, months_between, prorate_by_days,
    slice_orders, split_evenly,
};
use seamline_shared::{AppConfig, AppError, AppResult};

use crate::cli::{Command, PeriodArgs};

/// Runs one command and returns its JSON report.
pub fn run(command: &Command, config: &AppConfig) -> anyhow::Result<Value> {
    let report = match command {
        Command::Span(period) => serde_json::to_value(span(period)?)?,
        Command::Prorate { period, even } => {
            let (start, end) = service_period(period)?;
            serde_json::to_value(proposal(start, end, *even))?
        }
        Command::Normalize { orders, totals } => {
            let cache =
                NormalizationCache::with_config(config.cache.max_capacity, config.cache.ttl_secs);
            let documents = orders
                .iter()
                .map(|path| Ok((path.as_path(), read_json::<OrderRecord>(path)?)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            serde_json::to_value(normalized_all(
                &cache,
                documents,
                &OrderFinancials::from(totals),
            ))?
        }
        Command::Dedupe { order } => {
            let order: OrderRecord = read_json(order)?;
            serde_json::to_value(merged(&order))?
        }
        Command::Build {
            plan,
            totals,
            strict,
        } => {
            let plan: Vec<PlanEntry> = read_json(plan)?;
            serde_json::to_value(built(&plan, &OrderFinancials::from(totals), *strict)?)?
        }
        Command::Partial { orders, target } => {
            let snapshots: Vec<OrderSnapshot> = read_json(orders)?;
            serde_json::to_value(sliced(&snapshots, *target))?
        }
    };

    Ok(report)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    debug!(path = %path.display(), "Reading input");
    let text = fs::read_to_string(path)
        .map_err(AppError::from)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&text)
        .map_err(|e| AppError::Validation(e.to_string()))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn service_period(args: &PeriodArgs) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = RawTimestamp::from(args.start.as_str()).require_date()?;
    let end = RawTimestamp::from(args.end.as_str()).require_date()?;
    Ok((start, end))
}

#[derive(Debug, Serialize)]
struct SpanReport {
    months: Vec<YearMonth>,
    keys: Vec<String>,
}

fn span(args: &PeriodArgs) -> AppResult<SpanReport> {
    let start = RawTimestamp::from(args.start.as_str());
    let end = RawTimestamp::from(args.end.as_str());
    let months = generate_months_between_dates(&start, &end);

    if months.is_empty() {
        // Distinguish bad input from a reversed period.
        start.require_date()?;
        end.require_date()?;
        warn!(start = %args.start, end = %args.end, "Service period ends before it starts");
    }

    info!(count = months.len(), "Generated month span");
    Ok(SpanReport {
        keys: months.iter().map(YearMonth::key).collect(),
        months,
    })
}

#[derive(Debug, Serialize)]
struct ProposalReport {
    plan: Vec<PlanEntry>,
    status: AllocationStatus,
}

fn proposal(start: NaiveDate, end: NaiveDate, even: bool) -> ProposalReport {
    let plan = if even {
        split_evenly(&months_between(start, end))
    } else {
        prorate_by_days(start, end)
    };
    info!(months = plan.len(), even, "Proposed allocation plan");

    ProposalReport {
        status: get_allocation_status(&plan),
        plan,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalizeReport {
    file: String,
    id: Option<String>,
    cached: bool,
    allocation: Option<CanonicalAllocation>,
}

fn normalized(
    cache: &NormalizationCache,
    path: &Path,
    order: &OrderRecord,
    totals: &OrderFinancials,
) -> NormalizeReport {
    let (allocation, cached) = match &order.allocation {
        Some(raw) => {
            let result = cache.normalize_cached(raw, totals);
            (result.allocation.as_deref().cloned(), result.cached)
        }
        None => (None, false),
    };

    if allocation.is_none() {
        info!(file = %path.display(), "Order has no stored allocation");
    }

    NormalizeReport {
        file: path.display().to_string(),
        id: order.id.clone(),
        cached,
        allocation,
    }
}

fn normalized_all(
    cache: &NormalizationCache,
    documents: Vec<(&Path, OrderRecord)>,
    totals: &OrderFinancials,
) -> Vec<NormalizeReport> {
    documents
        .into_iter()
        .map(|(path, order)| normalized(cache, path, &order, totals))
        .collect()
}

#[derive(Debug, Serialize)]
struct DedupeReport<'a> {
    id: Option<&'a str>,
    allocations: Vec<CanonicalMonthEntry>,
    status: AllocationStatus,
}

fn merged(order: &OrderRecord) -> DedupeReport<'_> {
    let entries = order
        .allocation
        .as_ref()
        .and_then(|allocation| allocation.allocations.as_deref())
        .unwrap_or_default();
    let allocations = deduplicate_allocations(entries);
    info!(
        stored = entries.len(),
        merged = allocations.len(),
        "Deduplicated allocation"
    );

    DedupeReport {
        id: order.id.as_deref(),
        status: get_allocation_status(&allocations),
        allocations,
    }
}

#[derive(Debug, Serialize)]
struct BuildReport {
    allocation: CanonicalAllocation,
    status: AllocationStatus,
}

fn built(plan: &[PlanEntry], totals: &OrderFinancials, strict: bool) -> AppResult<BuildReport> {
    let status = get_allocation_status(plan);
    let allocation = if strict {
        create_checked_allocation(plan, totals)?
    } else {
        if !status.is_valid() {
            warn!(status = %status.status, total = %status.total, "Building incomplete allocation");
        }
        create_allocation(plan, totals)
    };

    Ok(BuildReport { allocation, status })
}

#[derive(Debug, Serialize)]
struct OrderSlice<'a> {
    id: Option<&'a str>,
    #[serde(flatten)]
    amounts: PartialAmounts,
}

#[derive(Debug, Serialize)]
struct PartialReport<'a> {
    target: String,
    orders: Vec<OrderSlice<'a>>,
}

fn sliced(snapshots: &[OrderSnapshot], target: YearMonth) -> PartialReport<'_> {
    let amounts = slice_orders(snapshots, target);
    info!(month = %target, orders = amounts.len(), "Sliced orders");

    PartialReport {
        target: target.key(),
        orders: snapshots
            .iter()
            .zip(amounts)
            .map(|(snapshot, amounts)| OrderSlice {
                id: snapshot.order.id.as_deref(),
                amounts,
            })
            .collect(),
    }
}
