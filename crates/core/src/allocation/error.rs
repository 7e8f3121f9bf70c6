//! Allocation error types.

use seamline_shared::{AppError, PeriodError};
use thiserror::Error;

use super::validation::StatusKind;

/// Allocation-related errors.
///
/// Entry-level problems in stored data are never errors; they are dropped
/// with a warning. These cover caller input only.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// Plan percentages do not sum to 100.
    #[error("Allocation plan is {status}: {message}")]
    Unbalanced {
        /// Over or under.
        status: StatusKind,
        /// Human-readable detail.
        message: String,
    },

    /// Month or year out of range.
    #[error("Invalid period: {0}")]
    InvalidPeriod(#[from] PeriodError),

    /// Date value could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Allocation document is not valid JSON or has the wrong shape.
    #[error("Malformed allocation document: {0}")]
    Malformed(String),
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Unbalanced { .. } => Self::BusinessRule(err.to_string()),
            AllocationError::InvalidPeriod(_)
            | AllocationError::InvalidDate(_)
            | AllocationError::Malformed(_) => Self::Validation(err.to_string()),
        }
    }
}
