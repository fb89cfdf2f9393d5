//! Descriptive statistics for the filtered set
//!
//! Area discrepancy here is the absolute difference `|declared − aggregated|`
//! in hectares, over rows that carry both areas.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::predicate::RowSelection;
use crate::risk::is_high_similarity;
use crate::table::Table;
use crate::utils::stats::{mean, median, percentage, sample_std_dev};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation; `None` below two values
    pub std_dev: Option<f64>,
}

impl NumericSummary {
    pub fn from_values(mut values: Vec<f32>) -> Self {
        Self {
            count: values.len(),
            mean: mean(&values),
            std_dev: sample_std_dev(&values),
            median: median(&mut values),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub records: usize,
    pub similarity: NumericSummary,
    pub area_discrepancy: NumericSummary,
    pub distinct_states: usize,
    /// Share of rows at or above the high-similarity threshold (0-100)
    pub high_similarity_pct: f64,
}

pub fn compute(table: &Table, rows: &RowSelection) -> SummaryStats {
    let similarity: Vec<f32> = rows.iter().map(|r| table.jaccard(r)).collect();
    let high = similarity.iter().filter(|&&v| is_high_similarity(v)).count();

    let discrepancy: Vec<f32> = rows
        .iter()
        .filter_map(|r| match table.areas(r) {
            (Some(declared), Some(aggregated)) => Some((declared - aggregated).abs()),
            _ => None,
        })
        .collect();

    let states: FxHashSet<_> = rows.iter().map(|r| table.state(r)).collect();

    SummaryStats {
        records: rows.len(),
        high_similarity_pct: percentage(high, rows.len()),
        similarity: NumericSummary::from_values(similarity),
        area_discrepancy: NumericSummary::from_values(discrepancy),
        distinct_states: states.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::State;
    use crate::table::{Record, TableBuilder};
    use approx::assert_relative_eq;

    #[test]
    fn test_summary_values() {
        let table = TableBuilder::from_iter([
            Record::new(State::SP, 0.2, true).with_areas(100.0, 90.0),
            Record::new(State::SP, 0.4, true).with_areas(50.0, 80.0),
            Record::new(State::RJ, 0.9, false),
        ])
        .build()
        .unwrap();

        let stats = compute(&table, &RowSelection::all(&table));
        assert_eq!(stats.records, 3);
        assert_eq!(stats.distinct_states, 2);
        assert_relative_eq!(stats.similarity.mean.unwrap(), 0.5, epsilon = 1e-6);
        assert_relative_eq!(stats.similarity.median.unwrap(), 0.4, epsilon = 1e-6);
        assert_relative_eq!(stats.similarity.std_dev.unwrap(), (0.13f64).sqrt(), epsilon = 1e-6);
        assert_relative_eq!(stats.high_similarity_pct, 100.0 / 3.0, epsilon = 1e-9);

        assert_eq!(stats.area_discrepancy.count, 2);
        assert_relative_eq!(stats.area_discrepancy.mean.unwrap(), 20.0, epsilon = 1e-6);
        assert_relative_eq!(stats.area_discrepancy.median.unwrap(), 20.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_summary() {
        let table = TableBuilder::new().build().unwrap();
        let stats = compute(&table, &RowSelection::default());
        assert_eq!(stats, SummaryStats::default());
    }
}
