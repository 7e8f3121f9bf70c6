//! Allocation data types.
//!
//! `Raw*` types mirror what sits in the document store and are untrusted.
//! Canonical types are only ever produced by this crate, so they implement
//! `Serialize` but not `Deserialize`: persisted data has to come back in
//! through the normalizer.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use seamline_shared::YearMonth;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

use super::error::AllocationError;
use super::time::RawTimestamp;

/// Order totals computed upstream by the costing module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFinancials {
    /// Total revenue.
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    /// Total cost.
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    /// Total profit, when the costing module supplies one.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub profit: Option<Decimal>,
}

impl OrderFinancials {
    /// Creates totals with profit derived from revenue and cost.
    #[must_use]
    pub const fn new(revenue: Decimal, cost: Decimal) -> Self {
        Self {
            revenue,
            cost,
            profit: None,
        }
    }

    /// Creates totals with an explicit profit figure.
    #[must_use]
    pub const fn with_profit(revenue: Decimal, cost: Decimal, profit: Decimal) -> Self {
        Self {
            revenue,
            cost,
            profit: Some(profit),
        }
    }

    /// Supplied profit, or `revenue - cost`.
    #[must_use]
    pub fn effective_profit(&self) -> Decimal {
        self.profit.unwrap_or(self.revenue - self.cost)
    }
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    /// Amount received so far.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_paid: Decimal,
    /// Outstanding balance, when tracked separately.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub balance: Option<Decimal>,
}

impl PaymentInfo {
    /// Creates payment info with only an amount paid.
    #[must_use]
    pub const fn paid(amount_paid: Decimal) -> Self {
        Self {
            amount_paid,
            balance: None,
        }
    }
}

/// A JSON value sitting in a numeric slot of a stored entry.
///
/// Numbers and numeric strings coerce to `Decimal`; anything else does not.
#[derive(Debug, Clone, PartialEq)]
pub enum RawNumber {
    /// Value built in-process, exact.
    Decimal(Decimal),
    /// Value read from a document.
    Json(Value),
}

impl RawNumber {
    /// Coerces the value to a decimal, if it is numeric.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(value) => Some(*value),
            Self::Json(Value::Number(number)) => number
                .as_i64()
                .map(Decimal::from)
                .or_else(|| number.as_u64().map(Decimal::from))
                .or_else(|| number.as_f64().and_then(Decimal::from_f64)),
            Self::Json(Value::String(text)) => parse_decimal_text(text),
            Self::Json(_) => None,
        }
    }
}

fn parse_decimal_text(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

impl From<Decimal> for RawNumber {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<i64> for RawNumber {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<Value> for RawNumber {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl<'de> Deserialize<'de> for RawNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::Json)
    }
}

impl Serialize for RawNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Decimal(value) => rust_decimal::serde::float::serialize(value, serializer),
            Self::Json(value) => value.serialize(serializer),
        }
    }
}

pub(crate) fn amount(field: Option<&RawNumber>) -> Option<Decimal> {
    field.and_then(RawNumber::to_decimal)
}

/// One stored allocation entry, in either schema generation.
///
/// Legacy entries carry `monthKey`; current ones carry `month`/`year`,
/// where `month` may be 0- or 1-indexed depending on the record's age.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAllocationEntry {
    /// Month number, indexing unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<RawNumber>,
    /// Calendar year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<RawNumber>,
    /// Legacy `YYYY-M` / `YYYY-MM` key. Non-string values read as absent.
    #[serde(
        default,
        deserialize_with = "lenient_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub month_key: Option<String>,
    /// Share of the order, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<RawNumber>,
    /// Stored revenue slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<RawNumber>,
    /// Stored cost slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<RawNumber>,
    /// Stored profit slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profit: Option<RawNumber>,
    /// Service days falling in the month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<RawNumber>,
    /// Superseded fields (`dateRange`, `method`, `originalRevenue`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAllocationEntry {
    /// Current-schema entry with explicit month and year.
    #[must_use]
    pub fn dated(year: i64, month: i64, percentage: Decimal) -> Self {
        Self {
            month: Some(month.into()),
            year: Some(year.into()),
            percentage: Some(percentage.into()),
            ..Self::default()
        }
    }

    /// Legacy entry keyed by `monthKey`.
    #[must_use]
    pub fn keyed(month_key: &str, percentage: Decimal) -> Self {
        Self {
            month_key: Some(month_key.to_string()),
            percentage: Some(percentage.into()),
            ..Self::default()
        }
    }

    /// Percentage, 0 when absent or not numeric.
    #[must_use]
    pub fn percentage_value(&self) -> Decimal {
        amount(self.percentage.as_ref()).unwrap_or(Decimal::ZERO)
    }
}

fn lenient_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(key)) => Ok(Some(key)),
        Some(other) => {
            warn!(kind = %json_kind(&other), "Ignoring non-string monthKey");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// The `allocation` field of a stored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAllocation {
    /// Stored entries. `None` when the field is missing or not an array.
    #[serde(
        default,
        deserialize_with = "lenient_entries",
        skip_serializing_if = "Option::is_none"
    )]
    pub allocations: Option<Vec<RawAllocationEntry>>,
    /// When the allocation was committed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<RawTimestamp>,
    /// Superseded fields (`method`, `recalculatedAt`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAllocation {
    /// Parses a stored allocation document.
    pub fn from_json(json: &str) -> Result<Self, AllocationError> {
        serde_json::from_str(json).map_err(|e| AllocationError::Malformed(e.to_string()))
    }
}

/// Deserializes the entry array one element at a time so a single bad
/// element cannot take the whole allocation down with it.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Option<Vec<RawAllocationEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(kind = %json_kind(&other), "Ignoring non-array allocations field");
            return Ok(None);
        }
        None => return Ok(None),
    };

    let entries = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            serde_json::from_value::<RawAllocationEntry>(item)
                .map_err(|error| {
                    warn!(index, %error, "Dropping malformed allocation entry");
                })
                .ok()
        })
        .collect();

    Ok(Some(entries))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A normalized allocation entry. Month and year are always valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalMonthEntry {
    /// The month this entry covers.
    #[serde(flatten)]
    pub period: YearMonth,
    /// Share of the order, 0-100.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    /// Revenue attributed to the month.
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    /// Cost attributed to the month.
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    /// Profit attributed to the month.
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
    /// Service days in the month, when known.
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub days: Option<Decimal>,
    /// Carried-over fields from merged legacy entries.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CanonicalMonthEntry {
    /// Month number, 1 = January.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.period.month()
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.period.year()
    }
}

impl From<&CanonicalMonthEntry> for RawAllocationEntry {
    fn from(entry: &CanonicalMonthEntry) -> Self {
        Self {
            month: Some(i64::from(entry.month()).into()),
            year: Some(i64::from(entry.year()).into()),
            month_key: None,
            percentage: Some(entry.percentage.into()),
            revenue: Some(entry.revenue.into()),
            cost: Some(entry.cost.into()),
            profit: Some(entry.profit.into()),
            days: entry.days.map(RawNumber::from),
            extra: entry.extra.clone(),
        }
    }
}

/// A normalized allocation, ready to persist or report on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAllocation {
    /// Month entries.
    pub allocations: Vec<CanonicalMonthEntry>,
    /// ISO-8601 commit instant.
    pub applied_at: String,
}

impl From<&CanonicalAllocation> for RawAllocation {
    fn from(allocation: &CanonicalAllocation) -> Self {
        Self {
            allocations: Some(
                allocation
                    .allocations
                    .iter()
                    .map(RawAllocationEntry::from)
                    .collect(),
            ),
            applied_at: Some(RawTimestamp::Text(allocation.applied_at.clone())),
            extra: Map::new(),
        }
    }
}

/// One month of a plan the user is about to commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Target month.
    #[serde(flatten)]
    pub period: YearMonth,
    /// Share of the order, 0-100.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    /// Service days in the month, for prorated plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl PlanEntry {
    /// Creates a plan entry for a validated month.
    #[must_use]
    pub const fn new(period: YearMonth, percentage: Decimal) -> Self {
        Self {
            period,
            percentage,
            days: None,
        }
    }

    /// Creates a plan entry from raw month and year numbers.
    pub fn from_parts(year: i32, month: u32, percentage: Decimal) -> Result<Self, AllocationError> {
        Ok(Self::new(YearMonth::new(year, month)?, percentage))
    }
}

/// The parts of an order document the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Document id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Service period start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<RawTimestamp>,
    /// Service period end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<RawTimestamp>,
    /// Stored allocation, if the order was ever allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<RawAllocation>,
    /// Every other order field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderRecord {
    /// An order carrying only an allocation.
    #[must_use]
    pub fn with_allocation(allocation: RawAllocation) -> Self {
        Self {
            allocation: Some(allocation),
            ..Self::default()
        }
    }
}

/// The slice of an order's figures attributed to one reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAmounts {
    /// Revenue in the period.
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
    /// Cost in the period.
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    /// Profit in the period.
    #[serde(with = "rust_decimal::serde::float")]
    pub profit: Decimal,
    /// Payments attributed to the period.
    #[serde(with = "rust_decimal::serde::float")]
    pub paid_amount: Decimal,
    /// Outstanding balance attributed to the period.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl PartialAmounts {
    /// All-zero slice.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            revenue: Decimal::ZERO,
            cost: Decimal::ZERO,
            profit: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }
}

/// Everything needed to slice one order for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    /// The stored order.
    pub order: OrderRecord,
    /// Its totals.
    pub totals: OrderFinancials,
    /// Its payment state.
    #[serde(default)]
    pub payment: PaymentInfo,
}
