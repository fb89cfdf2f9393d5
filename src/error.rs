//! Error types for loading, filtering and querying
//!
//! Loading errors are fatal (the binaries abort startup with them), filter
//! errors are recoverable warnings returned next to a usable filter, and
//! query errors are isolated to the single aggregation that raised them.

use crate::aggregations::AggregationKind;
use crate::domain::Dimension;
use polars::prelude::PolarsError;
use std::fmt;
use thiserror::Error;

/// Failure to turn a source file or byte stream into a [`crate::DataStore`]
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset: {0}")]
    Read(#[from] PolarsError),

    #[error("unsupported dataset format '{0}' (expected .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("dataset is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("dataset has zero rows")]
    Empty,

    #[error("dataset has no valid rows ({dropped} rows dropped during validation)")]
    NoValidRows { dropped: usize },

    #[error("column {column} has {count} distinct values, more than compact encoding allows")]
    CardinalityOverflow { column: &'static str, count: usize },
}

/// Which end of the similarity interval a bound error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundSide {
    Lower,
    Upper,
}

impl fmt::Display for BoundSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundSide::Lower => f.write_str("lower"),
            BoundSide::Upper => f.write_str("upper"),
        }
    }
}

/// Malformed filter input. Each variant describes the recovery applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidFilterError {
    #[error("{side} similarity bound {value:?} is not numeric, using {fallback}")]
    NonNumericBound {
        side: BoundSide,
        value: String,
        fallback: f32,
    },

    #[error("{side} similarity bound is not finite, using {fallback}")]
    NonFiniteBound { side: BoundSide, fallback: f32 },

    #[error("{side} similarity bound {value} is outside [0, 1], clamped to {clamped}")]
    OutOfDomain {
        side: BoundSide,
        value: f64,
        clamped: f32,
    },

    #[error("unknown {dimension} value {value:?} ignored")]
    UnknownValue { dimension: Dimension, value: String },

    #[error("no valid {dimension} values given, dimension left unrestricted")]
    DimensionRejected { dimension: Dimension },
}

/// Failure inside a single aggregation. Never cached.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{kind} produced an inconsistent result: {detail}")]
    InvariantViolated {
        kind: AggregationKind,
        detail: String,
    },
}
