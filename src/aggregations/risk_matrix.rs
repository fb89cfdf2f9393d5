//! Risk matrix: ownership agreement × spatial agreement
//!
//! Always four cells, in [`RiskQuadrant::ALL`] order, whose counts sum to the
//! filtered row count.

use rayon::prelude::*;
use serde::Serialize;

use super::AggregationKind;
use crate::error::QueryError;
use crate::predicate::RowSelection;
use crate::risk::{RecommendedAction, RiskQuadrant};
use crate::table::Table;
use crate::utils::stats::percentage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskCell {
    pub quadrant: RiskQuadrant,
    pub label: &'static str,
    pub ownership_match: bool,
    pub spatial_ok: bool,
    pub action: RecommendedAction,
    pub count: usize,
    pub percentage: f64,
}

pub fn compute(table: &Table, rows: &RowSelection) -> Result<Vec<RiskCell>, QueryError> {
    let counts = rows
        .as_slice()
        .par_iter()
        .fold(
            || [0usize; 4],
            |mut acc, &row| {
                let quadrant = RiskQuadrant::classify(table.ownership_match(row), table.jaccard(row));
                acc[quadrant.index()] += 1;
                acc
            },
        )
        .reduce(
            || [0usize; 4],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        );

    let total = rows.len();
    let sum: usize = counts.iter().sum();
    if sum != total {
        return Err(QueryError::InvariantViolated {
            kind: AggregationKind::RiskMatrix,
            detail: format!("cells sum to {}, selection has {} rows", sum, total),
        });
    }

    Ok(RiskQuadrant::ALL
        .iter()
        .map(|&quadrant| RiskCell {
            quadrant,
            label: quadrant.label(),
            ownership_match: matches!(quadrant, RiskQuadrant::HighMaturity | RiskQuadrant::TechnicalError),
            spatial_ok: matches!(quadrant, RiskQuadrant::HighMaturity | RiskQuadrant::LegalRisk),
            action: quadrant.recommended_action(),
            count: counts[quadrant.index()],
            percentage: percentage(counts[quadrant.index()], total),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::State;
    use crate::table::{Record, TableBuilder};

    #[test]
    fn test_cells_follow_classification() {
        let table = TableBuilder::from_iter([
            Record::new(State::GO, 0.95, true),
            Record::new(State::GO, 0.10, true),
            Record::new(State::GO, 0.85, false),
        ])
        .build()
        .unwrap();

        let cells = compute(&table, &RowSelection::all(&table)).unwrap();
        let counts: Vec<(&str, usize)> = cells.iter().map(|c| (c.label, c.count)).collect();
        assert_eq!(
            counts,
            vec![("High Maturity", 1), ("Technical Error", 1), ("Legal Risk", 1), ("Critical", 0)]
        );
        assert_eq!(cells[2].action, RecommendedAction::Audit);
        assert!(cells[0].ownership_match && cells[0].spatial_ok);
        assert!(!cells[3].ownership_match && !cells[3].spatial_ok);
    }

    #[test]
    fn test_empty_selection_has_four_zero_cells() {
        let table = TableBuilder::new().build().unwrap();
        let cells = compute(&table, &RowSelection::default()).unwrap();
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|c| c.count == 0 && c.percentage == 0.0));
    }
}
