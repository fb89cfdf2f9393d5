//! Typed columnar storage for registry records
//!
//! The loaded dataset is held as one vector per column at the narrowest width
//! that represents it: one-byte enums for region/state/size/status, `u16`
//! dictionary codes for municipalities, `u32` dictionary ids for property
//! codes, `f32` for similarity and areas. A 1.3M-row dataset fits in roughly
//! 40 MB and every column scan is a tight loop over a slice.
//!
//! Rows are addressed by [`RowId`] and never change after [`TableBuilder::build`].

use rustc_hash::FxHashMap;

use crate::domain::{Category, Dimension, Region, SizeClass, State, Status, UNKNOWN_LABEL};
use crate::error::DataLoadError;

/// Row index into a [`Table`]
pub type RowId = u32;

/// One registry pairing, as accepted by [`TableBuilder::push`]
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub property_code: Option<String>,
    pub region: Region,
    pub state: State,
    pub municipality: Option<String>,
    pub size: Option<SizeClass>,
    pub status: Option<Status>,
    pub year: Option<u16>,
    pub area_declared: Option<f32>,
    pub area_aggregated: Option<f32>,
    pub jaccard: f32,
    pub ownership_match: bool,
    /// Total CARs registered in the municipality for the record's year
    pub registered_total: Option<u32>,
}

impl Record {
    /// Minimal record; region is derived from the state
    pub fn new(state: State, jaccard: f32, ownership_match: bool) -> Self {
        Self {
            property_code: None,
            region: state.region(),
            state,
            municipality: None,
            size: None,
            status: None,
            year: None,
            area_declared: None,
            area_aggregated: None,
            jaccard,
            ownership_match,
            registered_total: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.property_code = Some(code.into());
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_municipality(mut self, name: impl Into<String>) -> Self {
        self.municipality = Some(name.into());
        self
    }

    pub fn with_size(mut self, size: SizeClass) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_areas(mut self, declared: f32, aggregated: f32) -> Self {
        self.area_declared = Some(declared);
        self.area_aggregated = Some(aggregated);
        self
    }

    pub fn with_registered_total(mut self, total: u32) -> Self {
        self.registered_total = Some(total);
        self
    }
}

// ============================================================================
// Table
// ============================================================================

/// Immutable column store shared by every query
#[derive(Debug, Clone, Default)]
pub struct Table {
    regions: Vec<Region>,
    states: Vec<State>,
    municipalities: Vec<Option<u16>>,
    municipality_labels: Vec<String>,
    sizes: Vec<Option<SizeClass>>,
    statuses: Vec<Option<Status>>,
    years: Vec<Option<u16>>,
    property_ids: Vec<Option<u32>>,
    /// Lowercased property codes, indexed by property id
    property_keys: Vec<String>,
    area_declared: Vec<Option<f32>>,
    area_aggregated: Vec<Option<f32>>,
    jaccard: Vec<f32>,
    ownership_match: Vec<bool>,
    registered_totals: Option<Vec<Option<u32>>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.jaccard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jaccard.is_empty()
    }

    /// Iterator over every row id
    pub fn row_ids(&self) -> impl Iterator<Item = RowId> {
        0..self.len() as RowId
    }

    #[inline]
    pub fn region(&self, row: RowId) -> Region {
        self.regions[row as usize]
    }

    #[inline]
    pub fn state(&self, row: RowId) -> State {
        self.states[row as usize]
    }

    #[inline]
    pub fn municipality_code(&self, row: RowId) -> Option<u16> {
        self.municipalities[row as usize]
    }

    #[inline]
    pub fn size(&self, row: RowId) -> Option<SizeClass> {
        self.sizes[row as usize]
    }

    #[inline]
    pub fn status(&self, row: RowId) -> Option<Status> {
        self.statuses[row as usize]
    }

    #[inline]
    pub fn year(&self, row: RowId) -> Option<u16> {
        self.years[row as usize]
    }

    #[inline]
    pub fn property_id(&self, row: RowId) -> Option<u32> {
        self.property_ids[row as usize]
    }

    #[inline]
    pub fn jaccard(&self, row: RowId) -> f32 {
        self.jaccard[row as usize]
    }

    #[inline]
    pub fn ownership_match(&self, row: RowId) -> bool {
        self.ownership_match[row as usize]
    }

    #[inline]
    pub fn areas(&self, row: RowId) -> (Option<f32>, Option<f32>) {
        (self.area_declared[row as usize], self.area_aggregated[row as usize])
    }

    pub fn registered_total(&self, row: RowId) -> Option<u32> {
        self.registered_totals
            .as_ref()
            .and_then(|totals| totals[row as usize])
    }

    pub fn has_registered_totals(&self) -> bool {
        self.registered_totals.is_some()
    }

    /// Display labels of the municipality dictionary, indexed by code
    pub fn municipality_labels(&self) -> &[String] {
        &self.municipality_labels
    }

    /// Dictionary code of a municipality display label
    pub fn municipality_code_of(&self, label: &str) -> Option<u16> {
        self.municipality_labels
            .iter()
            .position(|l| l == label)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Lowercased property codes, indexed by property id
    pub fn property_keys(&self) -> &[String] {
        &self.property_keys
    }

    /// Group key of a row under `dimension` (`None` when the value is null)
    #[inline]
    pub fn group_key(&self, dimension: Dimension, row: RowId) -> Option<u32> {
        match dimension {
            Dimension::Region => Some(self.region(row).index() as u32),
            Dimension::State => Some(self.state(row).index() as u32),
            Dimension::Municipality => self.municipality_code(row).map(u32::from),
            Dimension::SizeClass => self.size(row).map(|s| s.index() as u32),
            Dimension::Status => self.status(row).map(|s| s.index() as u32),
        }
    }

    /// Display label of a group key produced by [`Table::group_key`]
    pub fn group_label(&self, dimension: Dimension, key: Option<u32>) -> String {
        let Some(key) = key else {
            return UNKNOWN_LABEL.to_string();
        };
        let index = key as usize;
        let label = match dimension {
            Dimension::Region => Region::from_index(index).map(|v| v.code().to_string()),
            Dimension::State => State::from_index(index).map(|v| v.code().to_string()),
            Dimension::Municipality => self.municipality_labels.get(index).cloned(),
            Dimension::SizeClass => SizeClass::from_index(index).map(|v| v.code().to_string()),
            Dimension::Status => Status::from_index(index).map(|v| v.code().to_string()),
        };
        label.unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }

    /// Sorted distinct non-null values of `dimension` present in the table
    pub fn distinct_values(&self, dimension: Dimension) -> Vec<String> {
        fn present<T: Category>(values: impl Iterator<Item = T>) -> Vec<String> {
            let mut seen = vec![false; T::ALL.len()];
            for v in values {
                seen[v.index()] = true;
            }
            let mut codes: Vec<String> = T::ALL
                .iter()
                .filter(|v| seen[v.index()])
                .map(|v| v.code().to_string())
                .collect();
            codes.sort();
            codes
        }

        match dimension {
            Dimension::Region => present(self.regions.iter().copied()),
            Dimension::State => present(self.states.iter().copied()),
            Dimension::SizeClass => present(self.sizes.iter().flatten().copied()),
            Dimension::Status => present(self.statuses.iter().flatten().copied()),
            Dimension::Municipality => {
                let mut labels = self.municipality_labels.clone();
                labels.sort();
                labels
            }
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates records and interns strings into dictionaries
#[derive(Debug, Default)]
pub struct TableBuilder {
    table: Table,
    municipality_index: FxHashMap<(String, State), u32>,
    municipality_keys: Vec<(String, State)>,
    raw_municipalities: Vec<Option<u32>>,
    property_index: FxHashMap<String, u32>,
    registered_totals: Vec<Option<u32>>,
    any_registered_total: bool,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(rows: usize) -> Self {
        let mut builder = Self::default();
        let t = &mut builder.table;
        t.regions.reserve(rows);
        t.states.reserve(rows);
        t.sizes.reserve(rows);
        t.statuses.reserve(rows);
        t.years.reserve(rows);
        t.property_ids.reserve(rows);
        t.area_declared.reserve(rows);
        t.area_aggregated.reserve(rows);
        t.jaccard.reserve(rows);
        t.ownership_match.reserve(rows);
        builder.raw_municipalities.reserve(rows);
        builder.registered_totals.reserve(rows);
        builder
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn push(&mut self, record: Record) {
        let Record {
            property_code,
            region,
            state,
            municipality,
            size,
            status,
            year,
            area_declared,
            area_aggregated,
            jaccard,
            ownership_match,
            registered_total,
        } = record;

        let municipality = municipality.map(|name| {
            let next = self.municipality_keys.len() as u32;
            *self
                .municipality_index
                .entry((name.clone(), state))
                .or_insert_with(|| {
                    self.municipality_keys.push((name, state));
                    next
                })
        });

        let property = property_code.map(|code| {
            let next = self.table.property_keys.len() as u32;
            *self.property_index.entry(code).or_insert_with_key(|code| {
                self.table.property_keys.push(code.to_lowercase());
                next
            })
        });

        let t = &mut self.table;
        t.regions.push(region);
        t.states.push(state);
        t.sizes.push(size);
        t.statuses.push(status);
        t.years.push(year);
        t.property_ids.push(property);
        t.area_declared.push(area_declared);
        t.area_aggregated.push(area_aggregated);
        t.jaccard.push(jaccard);
        t.ownership_match.push(ownership_match);
        self.raw_municipalities.push(municipality);
        self.any_registered_total |= registered_total.is_some();
        self.registered_totals.push(registered_total);
    }

    /// Finish the table, assigning municipality display labels
    ///
    /// A municipality name shared by more than one state is labelled
    /// `"Name (UF)"` so every label identifies exactly one municipality.
    pub fn build(self) -> Result<Table, DataLoadError> {
        let TableBuilder {
            mut table,
            municipality_keys,
            raw_municipalities,
            registered_totals,
            any_registered_total,
            ..
        } = self;

        if municipality_keys.len() > usize::from(u16::MAX) + 1 {
            return Err(DataLoadError::CardinalityOverflow {
                column: Dimension::Municipality.column(),
                count: municipality_keys.len(),
            });
        }

        let mut states_per_name: FxHashMap<&str, usize> = FxHashMap::default();
        for (name, _) in &municipality_keys {
            *states_per_name.entry(name.as_str()).or_default() += 1;
        }

        table.municipality_labels = municipality_keys
            .iter()
            .map(|(name, state)| {
                if states_per_name.get(name.as_str()).copied().unwrap_or(0) > 1 {
                    format!("{} ({})", name, state.code())
                } else {
                    name.clone()
                }
            })
            .collect();

        table.municipalities = raw_municipalities
            .into_iter()
            .map(|code| code.map(|c| c as u16))
            .collect();

        table.registered_totals = any_registered_total.then_some(registered_totals);

        Ok(table)
    }
}

impl FromIterator<Record> for TableBuilder {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut builder = TableBuilder::new();
        for record in iter {
            builder.push(record);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        TableBuilder::from_iter([
            Record::new(State::SP, 0.9, true)
                .with_code("SP-123-ABC")
                .with_municipality("Bom Jesus")
                .with_size(SizeClass::Small),
            Record::new(State::PI, 0.4, false)
                .with_code("PI-9")
                .with_municipality("Bom Jesus"),
            Record::new(State::PI, 0.5, false)
                .with_code("PI-9")
                .with_municipality("Teresina")
                .with_status(Status::Active),
        ])
        .build()
        .unwrap()
    }

    #[test]
    fn test_duplicate_municipality_names_are_disambiguated() {
        let table = sample();
        let mut labels = table.municipality_labels().to_vec();
        labels.sort();
        assert_eq!(labels, vec!["Bom Jesus (PI)", "Bom Jesus (SP)", "Teresina"]);
        assert_eq!(
            table.group_label(Dimension::Municipality, table.group_key(Dimension::Municipality, 0)),
            "Bom Jesus (SP)"
        );
    }

    #[test]
    fn test_property_codes_are_interned_lowercase() {
        let table = sample();
        assert_eq!(table.property_keys(), &["sp-123-abc".to_string(), "pi-9".to_string()]);
        assert_eq!(table.property_id(1), table.property_id(2));
    }

    #[test]
    fn test_distinct_values_sorted_and_non_null() {
        let table = sample();
        assert_eq!(table.distinct_values(Dimension::State), vec!["PI", "SP"]);
        assert_eq!(table.distinct_values(Dimension::Region), vec!["nordeste", "sudeste"]);
        assert_eq!(table.distinct_values(Dimension::SizeClass), vec!["Pequeno"]);
        assert_eq!(table.distinct_values(Dimension::Status), vec!["AT"]);
    }

    #[test]
    fn test_null_groups_have_unknown_label() {
        let table = sample();
        assert_eq!(table.group_key(Dimension::SizeClass, 1), None);
        assert_eq!(table.group_label(Dimension::SizeClass, None), UNKNOWN_LABEL);
    }

    #[test]
    fn test_registered_totals_only_when_present() {
        assert!(!sample().has_registered_totals());

        let table = TableBuilder::from_iter([
            Record::new(State::MT, 0.7, true).with_registered_total(120),
            Record::new(State::MT, 0.7, true),
        ])
        .build()
        .unwrap();
        assert!(table.has_registered_totals());
        assert_eq!(table.registered_total(0), Some(120));
        assert_eq!(table.registered_total(1), None);
    }
}
