//! Similarity distribution over fixed bands
//!
//! Bands are inclusive-low / exclusive-high except the last, which is closed
//! at 1.0. The third edge is [`HIGH_SIMILARITY_THRESHOLD`], so the top band
//! holds exactly the rows the risk matrix treats as spatially consistent.

use rayon::prelude::*;
use serde::Serialize;

use crate::predicate::RowSelection;
use crate::risk::HIGH_SIMILARITY_THRESHOLD;
use crate::table::Table;
use crate::utils::stats::percentage;

/// Band edges: `[0, 0.25)`, `[0.25, 0.5)`, `[0.5, threshold)`, `[threshold, 1.0]`
pub const BAND_EDGES: [f32; 5] = [0.0, 0.25, 0.5, HIGH_SIMILARITY_THRESHOLD, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBand {
    Low,
    Moderate,
    Substantial,
    High,
}

impl SimilarityBand {
    pub const ALL: [SimilarityBand; 4] = [
        SimilarityBand::Low,
        SimilarityBand::Moderate,
        SimilarityBand::Substantial,
        SimilarityBand::High,
    ];

    #[inline]
    pub fn of(similarity: f32) -> Self {
        if similarity >= BAND_EDGES[3] {
            SimilarityBand::High
        } else if similarity >= BAND_EDGES[2] {
            SimilarityBand::Substantial
        } else if similarity >= BAND_EDGES[1] {
            SimilarityBand::Moderate
        } else {
            SimilarityBand::Low
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bounds(self) -> (f32, f32) {
        (BAND_EDGES[self.index()], BAND_EDGES[self.index() + 1])
    }

    /// Percent label, e.g. `"50-85%"`
    pub fn label(self) -> String {
        let (lo, hi) = self.bounds();
        format!("{:.0}-{:.0}%", lo * 100.0, hi * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub band: SimilarityBand,
    pub label: String,
    pub lower: f32,
    pub upper: f32,
    pub count: usize,
    pub percentage: f64,
}

/// Count rows per band
pub(crate) fn band_counts(table: &Table, rows: &[u32]) -> [usize; 4] {
    rows.par_iter()
        .fold(
            || [0usize; 4],
            |mut acc, &row| {
                acc[SimilarityBand::of(table.jaccard(row)).index()] += 1;
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
        )
}

pub fn compute(table: &Table, rows: &RowSelection) -> Vec<DistributionRow> {
    let counts = band_counts(table, rows.as_slice());
    let total = rows.len();

    SimilarityBand::ALL
        .iter()
        .map(|&band| {
            let (lower, upper) = band.bounds();
            DistributionRow {
                band,
                label: band.label(),
                lower,
                upper,
                count: counts[band.index()],
                percentage: percentage(counts[band.index()], total),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::State;
    use crate::table::{Record, TableBuilder};
    use approx::assert_relative_eq;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(SimilarityBand::of(0.0), SimilarityBand::Low);
        assert_eq!(SimilarityBand::of(0.249), SimilarityBand::Low);
        assert_eq!(SimilarityBand::of(0.25), SimilarityBand::Moderate);
        assert_eq!(SimilarityBand::of(0.5), SimilarityBand::Substantial);
        assert_eq!(SimilarityBand::of(0.85), SimilarityBand::High);
        assert_eq!(SimilarityBand::of(1.0), SimilarityBand::High);
    }

    #[test]
    fn test_labels() {
        let labels: Vec<String> = SimilarityBand::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(labels, vec!["0-25%", "25-50%", "50-85%", "85-100%"]);
    }

    #[test]
    fn test_distribution_counts_and_percentages() {
        let table = TableBuilder::from_iter(
            [0.1, 0.3, 0.6, 0.85, 1.0].map(|j| Record::new(State::BA, j, true)),
        )
        .build()
        .unwrap();

        let rows = compute(&table, &RowSelection::all(&table));
        let counts: Vec<usize> = rows.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_relative_eq!(rows[3].percentage, 40.0);
        assert_relative_eq!(rows.iter().map(|r| r.percentage).sum::<f64>(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_selection_is_zeroed() {
        let table = TableBuilder::new().build().unwrap();
        let rows = compute(&table, &RowSelection::default());
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.count == 0 && r.percentage == 0.0));
    }
}
