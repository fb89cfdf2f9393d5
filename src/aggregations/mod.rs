//! Aggregation library
//!
//! Each aggregation kind lives in its own module and is a pure function of
//! the table and a row selection. Every kind tolerates an empty selection and
//! returns a zeroed or empty table for it.
//!
//! Kinds:
//! - `distribution`: similarity histogram over fixed bands
//! - `rollup`: count and median similarity per group, top-N with "Other"
//! - `temporal`: per-year evolution, overall and per group
//! - `risk_matrix`: ownership × spatial agreement quadrants
//! - `summary`: descriptive statistics of similarity and area discrepancy
//! - `breakdown`: similarity-band and ownership shares per group
//! - `maturity`: per-state maturity indicators
//! - `discrepancy`: relative area discrepancy zones

pub mod breakdown;
pub mod discrepancy;
pub mod distribution;
mod grouping;
pub mod maturity;
pub mod risk_matrix;
pub mod rollup;
pub mod summary;
pub mod temporal;

pub use breakdown::{BandCount, BandBreakdownRow, OwnershipBreakdownRow};
pub use discrepancy::{AreaDiscrepancy, DiscrepancyZone, ZoneRow};
pub use distribution::{DistributionRow, SimilarityBand};
pub use maturity::StateMaturityRow;
pub use risk_matrix::RiskCell;
pub use rollup::RollupRow;
pub use summary::{NumericSummary, SummaryStats};
pub use temporal::{TemporalGroupRow, TemporalRow};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Dimension;
use crate::error::QueryError;
use crate::predicate::RowSelection;
use crate::table::Table;

/// Which analytical computation is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "dimension", rename_all = "snake_case")]
pub enum AggregationKind {
    Distribution,
    CategoricalRollup(Dimension),
    TemporalEvolution,
    RiskMatrix,
    SummaryStats,
    SimilarityBreakdown(Dimension),
    OwnershipBreakdown(Dimension),
    TemporalByGroup(Dimension),
    StateMaturity,
    AreaDiscrepancy,
}

impl AggregationKind {
    pub fn name(self) -> &'static str {
        match self {
            AggregationKind::Distribution => "distribution",
            AggregationKind::CategoricalRollup(_) => "categorical_rollup",
            AggregationKind::TemporalEvolution => "temporal_evolution",
            AggregationKind::RiskMatrix => "risk_matrix",
            AggregationKind::SummaryStats => "summary_stats",
            AggregationKind::SimilarityBreakdown(_) => "similarity_breakdown",
            AggregationKind::OwnershipBreakdown(_) => "ownership_breakdown",
            AggregationKind::TemporalByGroup(_) => "temporal_by_group",
            AggregationKind::StateMaturity => "state_maturity",
            AggregationKind::AreaDiscrepancy => "area_discrepancy",
        }
    }

    /// Grouping dimension, for parametrized kinds
    pub fn dimension(self) -> Option<Dimension> {
        match self {
            AggregationKind::CategoricalRollup(d)
            | AggregationKind::SimilarityBreakdown(d)
            | AggregationKind::OwnershipBreakdown(d)
            | AggregationKind::TemporalByGroup(d) => Some(d),
            _ => None,
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dimension() {
            Some(d) => write!(f, "{}({})", self.name(), d),
            None => f.write_str(self.name()),
        }
    }
}

/// Typed rows of one aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AggregateTable {
    Distribution(Vec<DistributionRow>),
    CategoricalRollup(Vec<RollupRow>),
    TemporalEvolution(Vec<TemporalRow>),
    RiskMatrix(Vec<RiskCell>),
    SummaryStats(SummaryStats),
    SimilarityBreakdown(Vec<BandBreakdownRow>),
    OwnershipBreakdown(Vec<OwnershipBreakdownRow>),
    TemporalByGroup(Vec<TemporalGroupRow>),
    StateMaturity(Vec<StateMaturityRow>),
    AreaDiscrepancy(AreaDiscrepancy),
}

/// One aggregation evaluated under one filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub kind: AggregationKind,
    /// Rows in the filtered set the table was computed from
    pub filtered_rows: usize,
    pub computed_at: DateTime<Utc>,
    pub table: AggregateTable,
}

impl AggregateResult {
    pub fn compute(kind: AggregationKind, table: &Table, rows: &RowSelection) -> Result<Self, QueryError> {
        Ok(Self {
            kind,
            filtered_rows: rows.len(),
            computed_at: Utc::now(),
            table: compute(kind, table, rows)?,
        })
    }

    /// The filter matched no rows (a valid result, not an error)
    pub fn is_empty(&self) -> bool {
        self.filtered_rows == 0
    }
}

/// Dispatch to the aggregation implementing `kind`
pub fn compute(kind: AggregationKind, table: &Table, rows: &RowSelection) -> Result<AggregateTable, QueryError> {
    let result = match kind {
        AggregationKind::Distribution => AggregateTable::Distribution(distribution::compute(table, rows)),
        AggregationKind::CategoricalRollup(dimension) => {
            AggregateTable::CategoricalRollup(rollup::compute(table, rows, dimension)?)
        }
        AggregationKind::TemporalEvolution => AggregateTable::TemporalEvolution(temporal::compute(table, rows)),
        AggregationKind::RiskMatrix => AggregateTable::RiskMatrix(risk_matrix::compute(table, rows)?),
        AggregationKind::SummaryStats => AggregateTable::SummaryStats(summary::compute(table, rows)),
        AggregationKind::SimilarityBreakdown(dimension) => {
            AggregateTable::SimilarityBreakdown(breakdown::similarity_bands(table, rows, dimension))
        }
        AggregationKind::OwnershipBreakdown(dimension) => {
            AggregateTable::OwnershipBreakdown(breakdown::ownership(table, rows, dimension))
        }
        AggregationKind::TemporalByGroup(dimension) => {
            AggregateTable::TemporalByGroup(temporal::compute_by_group(table, rows, dimension))
        }
        AggregationKind::StateMaturity => AggregateTable::StateMaturity(maturity::compute(table, rows)),
        AggregationKind::AreaDiscrepancy => AggregateTable::AreaDiscrepancy(discrepancy::compute(table, rows)),
    };
    Ok(result)
}
