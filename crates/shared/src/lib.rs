//! Shared types, errors, and configuration for Seamline.
//!
//! This crate provides common types used across all other crates:
//! - `YearMonth`, the validated calendar month every allocation is keyed by
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, OutputFormat};
pub use error::{AppError, AppResult};
pub use types::{PeriodError, YearMonth};
