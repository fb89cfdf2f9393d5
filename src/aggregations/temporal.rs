//! Temporal evolution by registration year
//!
//! Rows with a null year are excluded. Years are reported in ascending order.
//! When the dataset carries per-municipality registration totals, each year
//! also reports the total CARs registered in the municipalities present in
//! the selection (each municipality counted once per year).

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;

use super::grouping::group_rows;
use crate::domain::Dimension;
use crate::predicate::RowSelection;
use crate::table::{RowId, Table};
use crate::utils::stats::median;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalRow {
    pub year: u16,
    pub records: usize,
    pub distinct_properties: usize,
    pub median_similarity: Option<f64>,
    pub registered_total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalGroupRow {
    pub year: u16,
    pub group: String,
    pub records: usize,
    pub median_similarity: Option<f64>,
    pub is_other: bool,
}

fn rows_by_year(table: &Table, rows: impl Iterator<Item = RowId>) -> BTreeMap<u16, Vec<RowId>> {
    let mut years: BTreeMap<u16, Vec<RowId>> = BTreeMap::new();
    for row in rows {
        if let Some(year) = table.year(row) {
            years.entry(year).or_default().push(row);
        }
    }
    years
}

fn median_similarity(table: &Table, rows: &[RowId]) -> Option<f64> {
    let mut values: Vec<f32> = rows.iter().map(|&r| table.jaccard(r)).collect();
    median(&mut values)
}

fn registered_total(table: &Table, rows: &[RowId]) -> Option<u64> {
    if !table.has_registered_totals() {
        return None;
    }
    let mut per_municipality: FxHashMap<Option<u16>, u32> = FxHashMap::default();
    for &row in rows {
        if let Some(total) = table.registered_total(row) {
            per_municipality.entry(table.municipality_code(row)).or_insert(total);
        }
    }
    Some(per_municipality.values().map(|&v| v as u64).sum())
}

pub fn compute(table: &Table, rows: &RowSelection) -> Vec<TemporalRow> {
    let years: Vec<(u16, Vec<RowId>)> = rows_by_year(table, rows.iter()).into_iter().collect();

    years
        .into_par_iter()
        .map(|(year, rows)| {
            let distinct: FxHashSet<u32> = rows.iter().filter_map(|&r| table.property_id(r)).collect();
            TemporalRow {
                year,
                records: rows.len(),
                distinct_properties: distinct.len(),
                median_similarity: median_similarity(table, &rows),
                registered_total: registered_total(table, &rows),
            }
        })
        .collect()
}

/// Per (year, group) median similarity
///
/// Groups follow the dimension's top-N policy, so high-cardinality
/// dimensions report at most N named series plus "Other".
pub fn compute_by_group(table: &Table, rows: &RowSelection, dimension: Dimension) -> Vec<TemporalGroupRow> {
    let groups = group_rows(table, rows, dimension);

    let mut result: Vec<(usize, TemporalGroupRow)> = groups
        .par_iter()
        .enumerate()
        .flat_map_iter(|(rank, group)| {
            rows_by_year(table, group.rows.iter().copied())
                .into_iter()
                .map(move |(year, year_rows)| {
                    (
                        rank,
                        TemporalGroupRow {
                            year,
                            group: group.label.clone(),
                            records: year_rows.len(),
                            median_similarity: median_similarity(table, &year_rows),
                            is_other: group.is_other,
                        },
                    )
                })
        })
        .collect();

    result.sort_by_key(|(rank, row)| (row.year, *rank));
    result.into_iter().map(|(_, row)| row).collect()
}
