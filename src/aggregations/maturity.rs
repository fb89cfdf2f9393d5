//! Per-state maturity: spatial and ownership agreement rates
//!
//! One row per state present in the selection, ordered by state code.

use serde::Serialize;

use crate::domain::{Category, Region, State};
use crate::predicate::RowSelection;
use crate::risk::is_high_similarity;
use crate::table::Table;
use crate::utils::stats::percentage;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateMaturityRow {
    pub state: State,
    pub region: Region,
    pub records: usize,
    /// Share of rows at or above the high-similarity threshold (0-100)
    pub high_similarity_pct: f64,
    /// Share of rows whose owners agree (0-100)
    pub ownership_match_pct: f64,
}

#[derive(Clone, Copy, Default)]
struct Tally {
    records: usize,
    high: usize,
    same_owner: usize,
}

pub fn compute(table: &Table, rows: &RowSelection) -> Vec<StateMaturityRow> {
    let mut tallies = vec![Tally::default(); State::ALL.len()];
    for row in rows.iter() {
        let t = &mut tallies[table.state(row).index()];
        t.records += 1;
        t.high += usize::from(is_high_similarity(table.jaccard(row)));
        t.same_owner += usize::from(table.ownership_match(row));
    }

    let mut result: Vec<StateMaturityRow> = State::ALL
        .iter()
        .zip(tallies)
        .filter(|(_, t)| t.records > 0)
        .map(|(&state, t)| StateMaturityRow {
            state,
            region: state.region(),
            records: t.records,
            high_similarity_pct: percentage(t.high, t.records),
            ownership_match_pct: percentage(t.same_owner, t.records),
        })
        .collect();

    result.sort_by_key(|r| r.state.code());
    result
}
