//! Per-group composition: similarity bands and ownership agreement
//!
//! Both breakdowns use the same grouping as the categorical rollup, so their
//! group totals also sum to the filtered row count.

use rayon::prelude::*;
use serde::Serialize;

use super::distribution::{band_counts, SimilarityBand};
use super::grouping::group_rows;
use crate::domain::Dimension;
use crate::predicate::RowSelection;
use crate::table::Table;
use crate::utils::stats::percentage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCount {
    pub band: SimilarityBand,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandBreakdownRow {
    pub group: String,
    pub total: usize,
    pub bands: Vec<BandCount>,
    pub is_other: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnershipBreakdownRow {
    pub group: String,
    pub total: usize,
    pub same_owner: usize,
    pub different_owner: usize,
    pub same_owner_pct: f64,
    pub different_owner_pct: f64,
    pub is_other: bool,
}

/// Similarity-band counts and shares within each group
pub fn similarity_bands(table: &Table, rows: &RowSelection, dimension: Dimension) -> Vec<BandBreakdownRow> {
    group_rows(table, rows, dimension)
        .into_par_iter()
        .map(|group| {
            let counts = band_counts(table, &group.rows);
            let total = group.rows.len();
            BandBreakdownRow {
                bands: SimilarityBand::ALL
                    .iter()
                    .map(|&band| BandCount {
                        band,
                        count: counts[band.index()],
                        percentage: percentage(counts[band.index()], total),
                    })
                    .collect(),
                total,
                group: group.label,
                is_other: group.is_other,
            }
        })
        .collect()
}

/// Same-owner vs different-owner counts within each group
pub fn ownership(table: &Table, rows: &RowSelection, dimension: Dimension) -> Vec<OwnershipBreakdownRow> {
    group_rows(table, rows, dimension)
        .into_par_iter()
        .map(|group| {
            let total = group.rows.len();
            let same = group.rows.iter().filter(|&&r| table.ownership_match(r)).count();
            OwnershipBreakdownRow {
                total,
                same_owner: same,
                different_owner: total - same,
                same_owner_pct: percentage(same, total),
                different_owner_pct: percentage(total - same, total),
                group: group.label,
                is_other: group.is_other,
            }
        })
        .collect()
}
