//! Shared group-by with top-N tail collapsing

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::domain::{Dimension, OTHER_LABEL};
use crate::predicate::RowSelection;
use crate::table::{RowId, Table};

/// One reported group and the rows it covers
#[derive(Debug, Clone)]
pub(crate) struct RankedGroup {
    pub label: String,
    pub rows: Vec<RowId>,
    pub is_other: bool,
}

/// Group the selection by `dimension`
///
/// Groups are ordered by row count (descending) then label. When the
/// dimension has a top-N policy and more groups exist, the tail is merged
/// into a single "Other" group, so group sizes always sum to the selection
/// size. Null values form their own "Unknown" group.
pub(crate) fn group_rows(table: &Table, rows: &RowSelection, dimension: Dimension) -> Vec<RankedGroup> {
    let buckets = rows
        .as_slice()
        .par_iter()
        .fold(FxHashMap::<Option<u32>, Vec<RowId>>::default, |mut acc, &row| {
            acc.entry(table.group_key(dimension, row)).or_default().push(row);
            acc
        })
        .reduce(FxHashMap::default, |mut left, right| {
            for (key, mut ids) in right {
                left.entry(key).or_default().append(&mut ids);
            }
            left
        });

    let mut groups: Vec<RankedGroup> = buckets
        .into_iter()
        .map(|(key, rows)| RankedGroup {
            label: table.group_label(dimension, key),
            rows,
            is_other: false,
        })
        .collect();

    groups.sort_by(|a, b| {
        b.rows
            .len()
            .cmp(&a.rows.len())
            .then_with(|| a.label.cmp(&b.label))
    });

    if let Some(limit) = dimension.top_n() {
        if groups.len() > limit {
            let tail = groups.split_off(limit);
            let rows: Vec<RowId> = tail.into_iter().flat_map(|g| g.rows).collect();
            groups.push(RankedGroup {
                label: OTHER_LABEL.to_string(),
                rows,
                is_other: true,
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{State, TOP_N_GROUPS};
    use crate::table::{Record, TableBuilder};

    #[test]
    fn test_order_by_count_then_label() {
        let table = TableBuilder::from_iter([
            Record::new(State::RJ, 0.5, true),
            Record::new(State::AC, 0.5, true),
            Record::new(State::SP, 0.5, true),
            Record::new(State::SP, 0.5, true),
        ])
        .build()
        .unwrap();

        let groups = group_rows(&table, &RowSelection::all(&table), Dimension::State);
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["SP", "AC", "RJ"]);
        assert!(groups.iter().all(|g| !g.is_other));
    }

    #[test]
    fn test_tail_collapses_into_other() {
        let mut builder = TableBuilder::new();
        for i in 0..(TOP_N_GROUPS + 3) {
            builder.push(Record::new(State::GO, 0.5, true).with_municipality(format!("M{:02}", i)));
        }
        // Two extra rows make M00 the largest group
        builder.push(Record::new(State::GO, 0.5, true).with_municipality("M00"));
        builder.push(Record::new(State::GO, 0.5, true).with_municipality("M00"));
        let table = builder.build().unwrap();

        let groups = group_rows(&table, &RowSelection::all(&table), Dimension::Municipality);
        assert_eq!(groups.len(), TOP_N_GROUPS + 1);
        assert_eq!(groups[0].label, "M00");
        assert_eq!(groups[0].rows.len(), 3);

        let other = groups.last().unwrap();
        assert!(other.is_other);
        assert_eq!(other.rows.len(), 3);
        assert_eq!(groups.iter().map(|g| g.rows.len()).sum::<usize>(), table.len());
    }
}
