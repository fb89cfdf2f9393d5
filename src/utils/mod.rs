//! Utility modules
//!
//! - Columns: required-column validation and dtype-agnostic extraction
//! - Stats: median, mean, sample standard deviation, shares

pub mod columns;
pub mod stats;

pub use columns::{require_columns, ColumnSpec};
pub use stats::{mean, median, percentage, sample_std_dev};
