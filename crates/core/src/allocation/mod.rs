//! Accrual allocation of order totals across calendar months.
//!
//! Stored allocations always pass back through [`normalize_allocation`] or
//! [`deduplicate_allocations`] before use; nothing here assumes persisted
//! data is already canonical.

pub mod builder;
pub mod cache;
pub mod dedup;
pub mod error;
pub mod normalize;
pub mod partial;
pub mod proration;
pub mod span;
pub mod time;
pub mod types;
pub mod validation;


pub use builder::{create_allocation, create_allocation_at, create_checked_allocation};
pub use cache::{CachedAllocation, NormalizationCache};
pub use dedup::{NEGLIGIBLE_PERCENTAGE, deduplicate_allocations};
pub use error::AllocationError;
pub use normalize::{extract_month_year, normalize_allocation, normalize_allocation_item};
pub use partial::{calculate_partial_amounts, slice_orders};
pub use proration::{prorate_by_days, split_evenly};
pub use span::{generate_months_between_dates, months_between};
pub use time::{RawTimestamp, normalize_applied_at, to_iso_string};
pub use types::{
    CanonicalAllocation, CanonicalMonthEntry, OrderFinancials, OrderRecord, OrderSnapshot,
    PartialAmounts, PaymentInfo, PlanEntry, RawAllocation, RawAllocationEntry, RawNumber,
};
pub use validation::{
    AllocationStatus, COMPLETE_TOLERANCE, StatusKind, Weighted, get_allocation_status,
};
