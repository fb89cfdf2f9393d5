//! Categorical rollup: count and median similarity per group

use rayon::prelude::*;
use serde::Serialize;

use super::grouping::group_rows;
use super::AggregationKind;
use crate::domain::Dimension;
use crate::error::QueryError;
use crate::predicate::RowSelection;
use crate::table::Table;
use crate::utils::stats::{median, percentage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupRow {
    pub group: String,
    pub count: usize,
    pub percentage: f64,
    pub median_similarity: Option<f64>,
    /// Synthetic tail group of a top-N rollup
    pub is_other: bool,
}

pub fn compute(table: &Table, rows: &RowSelection, dimension: Dimension) -> Result<Vec<RollupRow>, QueryError> {
    let total = rows.len();
    let groups = group_rows(table, rows, dimension);

    let result: Vec<RollupRow> = groups
        .into_par_iter()
        .map(|group| {
            let mut values: Vec<f32> = group.rows.iter().map(|&r| table.jaccard(r)).collect();
            RollupRow {
                count: group.rows.len(),
                percentage: percentage(group.rows.len(), total),
                median_similarity: median(&mut values),
                group: group.label,
                is_other: group.is_other,
            }
        })
        .collect();

    let reported: usize = result.iter().map(|r| r.count).sum();
    if reported != total {
        return Err(QueryError::InvariantViolated {
            kind: AggregationKind::CategoricalRollup(dimension),
            detail: format!("groups cover {} rows, selection has {}", reported, total),
        });
    }

    Ok(result)
}
