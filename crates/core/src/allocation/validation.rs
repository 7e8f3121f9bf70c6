//! Allocation completeness check.

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::types::{CanonicalMonthEntry, PlanEntry, RawAllocationEntry};

/// Distance from 100 still treated as complete.
pub const COMPLETE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Anything carrying an allocation percentage.
pub trait Weighted {
    /// Percentage of the order, 0-100.
    fn percentage(&self) -> Decimal;
}

impl Weighted for Decimal {
    fn percentage(&self) -> Decimal {
        *self
    }
}

impl Weighted for PlanEntry {
    fn percentage(&self) -> Decimal {
        self.percentage
    }
}

impl Weighted for CanonicalMonthEntry {
    fn percentage(&self) -> Decimal {
        self.percentage
    }
}

impl Weighted for RawAllocationEntry {
    fn percentage(&self) -> Decimal {
        self.percentage_value()
    }
}

/// Classification of a percentage total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Sums to 100 within tolerance.
    Valid,
    /// More than 100.
    Over,
    /// Less than 100.
    Under,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Over => write!(f, "over-allocated"),
            Self::Under => write!(f, "under-allocated"),
        }
    }
}

/// Advisory result for UI feedback; never blocks a commit by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStatus {
    /// Classification.
    pub status: StatusKind,
    /// Human-readable detail.
    pub message: String,
    /// Sum of percentages.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl AllocationStatus {
    /// True when the total is 100 within tolerance.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status == StatusKind::Valid
    }
}

/// Classifies the percentage total of `entries`.
#[must_use]
pub fn get_allocation_status<W: Weighted>(entries: &[W]) -> AllocationStatus {
    let total: Decimal = entries.iter().map(Weighted::percentage).sum();
    let hundred = Decimal::ONE_HUNDRED;

    let (status, message) = if (total - hundred).abs() <= COMPLETE_TOLERANCE {
        (StatusKind::Valid, "Allocation is complete".to_string())
    } else if total > hundred {
        (
            StatusKind::Over,
            format!("Over-allocated by {}%", one_decimal(total - hundred)),
        )
    } else {
        (
            StatusKind::Under,
            format!(
                "Under-allocated by {}%, assign the remaining share",
                one_decimal(hundred - total)
            ),
        )
    };

    AllocationStatus {
        status,
        message,
        total,
    }
}

/// Half-way values round away from zero: a 0.25 gap reads as 0.3.
fn one_decimal(value: Decimal) -> String {
    format!(
        "{:.1}",
        value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    )
}
