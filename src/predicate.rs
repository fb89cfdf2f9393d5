//! Filter compilation and row selection
//!
//! [`FilterEngine::compile`] turns a [`FilterState`] into a [`Predicate`]: a
//! conjunction of per-column membership tests. Enum dimensions become bit
//! masks; municipality labels and the code search are resolved against the
//! table's dictionaries once per selection, so the per-row test is a handful
//! of array lookups. Rows are scanned in parallel with Rayon and returned in
//! ascending order.

use rayon::prelude::*;
use std::collections::BTreeSet;

use crate::domain::Category;
use crate::filter::{DimensionFilter, FilterState, SimilarityRange};
use crate::table::{RowId, Table};

/// Bit set over the indices of a [`Category`] (at most 32 values)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CategoryMask(u32);

impl CategoryMask {
    fn from_filter<T: Category>(filter: &DimensionFilter<T>) -> Option<Self> {
        filter
            .values()
            .map(|set| CategoryMask(set.iter().fold(0, |bits, v| bits | (1 << v.index()))))
    }

    #[inline]
    fn contains(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }
}

/// Compiled form of a [`FilterState`]
///
/// A pure function of the filter it was compiled from.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    regions: Option<CategoryMask>,
    states: Option<CategoryMask>,
    sizes: Option<CategoryMask>,
    statuses: Option<CategoryMask>,
    municipalities: Option<BTreeSet<String>>,
    similarity: SimilarityRange,
    code_search: Option<String>,
}

pub struct FilterEngine;

impl FilterEngine {
    pub fn compile(filter: &FilterState) -> Predicate {
        Predicate {
            regions: CategoryMask::from_filter(filter.regions()),
            states: CategoryMask::from_filter(filter.states()),
            sizes: CategoryMask::from_filter(filter.sizes()),
            statuses: CategoryMask::from_filter(filter.statuses()),
            municipalities: filter.municipalities().values().cloned(),
            similarity: filter.similarity(),
            code_search: filter.code_search().map(str::to_owned),
        }
    }
}

/// Dictionary lookups resolved for one table
struct Resolved {
    municipalities: Option<Vec<bool>>,
    codes: Option<Vec<bool>>,
}

impl Predicate {
    /// Ascending ids of the rows the predicate accepts
    pub fn select(&self, table: &Table) -> RowSelection {
        if self.similarity.is_empty() {
            return RowSelection::default();
        }

        let Some(resolved) = self.resolve(table) else {
            return RowSelection::default();
        };

        let rows = (0..table.len() as RowId)
            .into_par_iter()
            .filter(|&row| self.matches(table, &resolved, row))
            .collect();

        RowSelection { rows }
    }

    /// Resolve dictionary-backed constraints; `None` when nothing can match
    fn resolve(&self, table: &Table) -> Option<Resolved> {
        let municipalities = match &self.municipalities {
            None => None,
            Some(labels) => {
                let mask: Vec<bool> = table
                    .municipality_labels()
                    .iter()
                    .map(|label| labels.contains(label))
                    .collect();
                if !mask.contains(&true) {
                    return None;
                }
                Some(mask)
            }
        };

        // A search that matches no code selects zero rows, never all rows
        let codes = match &self.code_search {
            None => None,
            Some(needle) => {
                let mask: Vec<bool> = table
                    .property_keys()
                    .par_iter()
                    .map(|key| key.contains(needle.as_str()))
                    .collect();
                if !mask.contains(&true) {
                    return None;
                }
                Some(mask)
            }
        };

        Some(Resolved { municipalities, codes })
    }

    #[inline]
    fn matches(&self, table: &Table, resolved: &Resolved, row: RowId) -> bool {
        if !self.similarity.contains(table.jaccard(row)) {
            return false;
        }
        if let Some(mask) = self.regions {
            if !mask.contains(table.region(row).index()) {
                return false;
            }
        }
        if let Some(mask) = self.states {
            if !mask.contains(table.state(row).index()) {
                return false;
            }
        }
        if let Some(mask) = self.sizes {
            match table.size(row) {
                Some(size) if mask.contains(size.index()) => {}
                _ => return false,
            }
        }
        if let Some(mask) = self.statuses {
            match table.status(row) {
                Some(status) if mask.contains(status.index()) => {}
                _ => return false,
            }
        }
        if let Some(mask) = &resolved.municipalities {
            match table.municipality_code(row) {
                Some(code) if mask[code as usize] => {}
                _ => return false,
            }
        }
        if let Some(mask) = &resolved.codes {
            match table.property_id(row) {
                Some(id) if mask[id as usize] => {}
                _ => return false,
            }
        }
        true
    }
}

/// Row ids accepted by a predicate, ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSelection {
    rows: Vec<RowId>,
}

impl RowSelection {
    /// Every row of `table`
    pub fn all(table: &Table) -> Self {
        Self {
            rows: table.row_ids().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_slice(&self) -> &[RowId] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.rows.iter().copied()
    }
}
