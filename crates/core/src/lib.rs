//! Core business logic for Seamline.
//!
//! This crate contains pure business logic with ZERO I/O.
//! Every operation takes its full input and returns a new value, so it is
//! safe to call from any number of threads at once.
//!
//! # Modules
//!
//! - `allocation` - Accrual allocation of order totals across calendar months

pub mod allocation;

pub use seamline_shared::YearMonth;
