//! Filter selection
//!
//! [`FilterState`] is the immutable snapshot of everything a user selected.
//! Each categorical dimension is explicitly [`DimensionFilter::Unrestricted`]
//! or [`DimensionFilter::RestrictedTo`] a non-empty set, so "nothing selected"
//! can never be confused with "match nothing". Sets are ordered, which makes
//! the serialized form canonical and usable as a cache key.
//!
//! [`FilterRequest`] is the loosely typed wire form (raw strings and numbers)
//! that is parsed into a `FilterState` with recoverable warnings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use tracing::warn;

use crate::domain::{Category, Dimension, Region, SizeClass, State, Status};
use crate::error::{BoundSide, InvalidFilterError};

// ============================================================================
// Per-dimension selection
// ============================================================================

/// Selection on one categorical dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", content = "values", rename_all = "snake_case")]
pub enum DimensionFilter<T: Ord> {
    Unrestricted,
    RestrictedTo(BTreeSet<T>),
}

impl<T: Ord> Default for DimensionFilter<T> {
    fn default() -> Self {
        DimensionFilter::Unrestricted
    }
}

impl<T: Ord> DimensionFilter<T> {
    /// Build from selected values; an empty selection is unrestricted
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        let set: BTreeSet<T> = values.into_iter().collect();
        if set.is_empty() {
            DimensionFilter::Unrestricted
        } else {
            DimensionFilter::RestrictedTo(set)
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, DimensionFilter::Unrestricted)
    }

    /// Selected values, `None` when unrestricted
    pub fn values(&self) -> Option<&BTreeSet<T>> {
        match self {
            DimensionFilter::Unrestricted => None,
            DimensionFilter::RestrictedTo(set) => Some(set),
        }
    }

    pub fn allows(&self, value: &T) -> bool {
        match self {
            DimensionFilter::Unrestricted => true,
            DimensionFilter::RestrictedTo(set) => set.contains(value),
        }
    }
}

// ============================================================================
// Similarity range
// ============================================================================

/// Closed similarity interval `[lo, hi]` within `[0, 1]`
///
/// Bounds are held as `f32`, the width the similarity column is stored in,
/// so a bound compares equal to a stored value parsed from the same text.
/// `lo > hi` is a valid, empty range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRange {
    lo: f32,
    hi: f32,
}

impl Default for SimilarityRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl SimilarityRange {
    pub const FULL: SimilarityRange = SimilarityRange { lo: 0.0, hi: 1.0 };

    /// Range clamped to `[0, 1]`; recoveries are logged
    pub fn new(lo: f64, hi: f64) -> Self {
        let (range, warnings) = Self::checked(lo, hi);
        for w in &warnings {
            warn!("{}", w);
        }
        range
    }

    /// Range clamped to `[0, 1]`, with one warning per recovered bound
    ///
    /// A non-finite bound falls back to the matching end of the domain.
    pub fn checked(lo: f64, hi: f64) -> (Self, Vec<InvalidFilterError>) {
        let mut warnings = Vec::new();
        let lo = clamp_bound(lo, BoundSide::Lower, &mut warnings);
        let hi = clamp_bound(hi, BoundSide::Upper, &mut warnings);
        (Self { lo, hi }, warnings)
    }

    pub fn lo(&self) -> f32 {
        self.lo
    }

    pub fn hi(&self) -> f32 {
        self.hi
    }

    /// True when no value can match
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn is_full(&self) -> bool {
        self.lo <= 0.0 && self.hi >= 1.0
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        self.lo <= value && value <= self.hi
    }
}

// f32 bounds are always finite after clamping, so bitwise equality is total
impl Eq for SimilarityRange {}

impl Hash for SimilarityRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // +0.0 and -0.0 compare equal and must hash equal
        (self.lo + 0.0).to_bits().hash(state);
        (self.hi + 0.0).to_bits().hash(state);
    }
}

fn side_default(side: BoundSide) -> f32 {
    match side {
        BoundSide::Lower => 0.0,
        BoundSide::Upper => 1.0,
    }
}

fn clamp_bound(value: f64, side: BoundSide, warnings: &mut Vec<InvalidFilterError>) -> f32 {
    if !value.is_finite() {
        let fallback = side_default(side);
        warnings.push(InvalidFilterError::NonFiniteBound { side, fallback });
        return fallback;
    }
    let clamped = value.clamp(0.0, 1.0) as f32;
    if !(0.0..=1.0).contains(&value) {
        warnings.push(InvalidFilterError::OutOfDomain { side, value, clamped });
    }
    // Normalize -0.0
    clamped + 0.0
}

// ============================================================================
// FilterState
// ============================================================================

/// Immutable, hashable snapshot of the current selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    regions: DimensionFilter<Region>,
    states: DimensionFilter<State>,
    municipalities: DimensionFilter<String>,
    sizes: DimensionFilter<SizeClass>,
    statuses: DimensionFilter<Status>,
    similarity: SimilarityRange,
    code_search: Option<String>,
}

impl FilterState {
    /// Selection with no restriction on any dimension
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.regions = DimensionFilter::from_values(regions);
        self
    }

    pub fn with_states(mut self, states: impl IntoIterator<Item = State>) -> Self {
        self.states = DimensionFilter::from_values(states);
        self
    }

    pub fn with_municipalities<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.municipalities = DimensionFilter::from_values(labels.into_iter().map(Into::into));
        self
    }

    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = SizeClass>) -> Self {
        self.sizes = DimensionFilter::from_values(sizes);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = Status>) -> Self {
        self.statuses = DimensionFilter::from_values(statuses);
        self
    }

    pub fn with_similarity(mut self, range: SimilarityRange) -> Self {
        self.similarity = range;
        self
    }

    /// Case-insensitive property-code substring; blank input clears the search
    pub fn with_code_search(mut self, needle: impl AsRef<str>) -> Self {
        let needle = needle.as_ref().trim().to_lowercase();
        self.code_search = (!needle.is_empty()).then_some(needle);
        self
    }

    pub fn regions(&self) -> &DimensionFilter<Region> {
        &self.regions
    }

    pub fn states(&self) -> &DimensionFilter<State> {
        &self.states
    }

    pub fn municipalities(&self) -> &DimensionFilter<String> {
        &self.municipalities
    }

    pub fn sizes(&self) -> &DimensionFilter<SizeClass> {
        &self.sizes
    }

    pub fn statuses(&self) -> &DimensionFilter<Status> {
        &self.statuses
    }

    pub fn similarity(&self) -> SimilarityRange {
        self.similarity
    }

    pub fn code_search(&self) -> Option<&str> {
        self.code_search.as_deref()
    }

    /// True when the selection places no constraint at all
    pub fn is_unrestricted(&self) -> bool {
        self.regions.is_unrestricted()
            && self.states.is_unrestricted()
            && self.municipalities.is_unrestricted()
            && self.sizes.is_unrestricted()
            && self.statuses.is_unrestricted()
            && self.similarity.is_full()
            && self.code_search.is_none()
    }

    /// Canonical serialization, identical for equal selections
    pub fn signature(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

// ============================================================================
// Wire form
// ============================================================================

/// Similarity bound as received: a number or free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundInput {
    Number(f64),
    Text(String),
}

/// Loosely typed filter request (e.g. a JSON body)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub regions: Vec<String>,
    pub states: Vec<String>,
    pub municipalities: Vec<String>,
    pub sizes: Vec<String>,
    pub statuses: Vec<String>,
    pub similarity_min: Option<BoundInput>,
    pub similarity_max: Option<BoundInput>,
    pub code_search: Option<String>,
}

impl FilterRequest {
    /// Parse into a usable [`FilterState`] accepting any municipality label
    pub fn into_filter_state(&self) -> (FilterState, Vec<InvalidFilterError>) {
        self.resolve(|_| true)
    }

    /// Parse into a usable [`FilterState`]
    ///
    /// Unknown values are dropped with a warning. A dimension whose values
    /// were all invalid is rejected (left unrestricted) while the rest of
    /// the selection still applies. Bounds are clamped to `[0, 1]`.
    pub fn resolve(&self, is_known_municipality: impl Fn(&str) -> bool) -> (FilterState, Vec<InvalidFilterError>) {
        let mut warnings = Vec::new();

        let regions = parse_dimension::<Region>(&self.regions, Dimension::Region, &mut warnings);
        let states = parse_dimension::<State>(&self.states, Dimension::State, &mut warnings);
        let sizes = parse_dimension::<SizeClass>(&self.sizes, Dimension::SizeClass, &mut warnings);
        let statuses = parse_dimension::<Status>(&self.statuses, Dimension::Status, &mut warnings);
        let municipalities = parse_values(
            &self.municipalities,
            Dimension::Municipality,
            |raw| {
                let label = raw.trim();
                is_known_municipality(label).then(|| label.to_string())
            },
            &mut warnings,
        );

        let lo = parse_bound(self.similarity_min.as_ref(), BoundSide::Lower, &mut warnings);
        let hi = parse_bound(self.similarity_max.as_ref(), BoundSide::Upper, &mut warnings);
        let (similarity, bound_warnings) = SimilarityRange::checked(lo, hi);
        warnings.extend(bound_warnings);

        let mut filter = FilterState::new()
            .with_regions(regions)
            .with_states(states)
            .with_municipalities(municipalities)
            .with_sizes(sizes)
            .with_statuses(statuses)
            .with_similarity(similarity);
        if let Some(needle) = &self.code_search {
            filter = filter.with_code_search(needle);
        }

        (filter, warnings)
    }
}

fn parse_dimension<T: Category>(
    raw: &[String],
    dimension: Dimension,
    warnings: &mut Vec<InvalidFilterError>,
) -> Vec<T> {
    parse_values(raw, dimension, |v| T::parse(v), warnings)
}

fn parse_values<T>(
    raw: &[String],
    dimension: Dimension,
    parse: impl Fn(&str) -> Option<T>,
    warnings: &mut Vec<InvalidFilterError>,
) -> Vec<T> {
    let mut parsed = Vec::with_capacity(raw.len());
    for value in raw.iter().filter(|v| !v.trim().is_empty()) {
        match parse(value) {
            Some(v) => parsed.push(v),
            None => warnings.push(InvalidFilterError::UnknownValue {
                dimension,
                value: value.clone(),
            }),
        }
    }
    if parsed.is_empty() && raw.iter().any(|v| !v.trim().is_empty()) {
        warnings.push(InvalidFilterError::DimensionRejected { dimension });
    }
    parsed
}

fn parse_bound(input: Option<&BoundInput>, side: BoundSide, warnings: &mut Vec<InvalidFilterError>) -> f64 {
    let fallback = side_default(side);
    match input {
        None => fallback as f64,
        Some(BoundInput::Number(v)) => *v,
        Some(BoundInput::Text(text)) => match crate::utils::columns::parse_float(text) {
            Some(v) => v,
            None => {
                warnings.push(InvalidFilterError::NonNumericBound {
                    side,
                    value: text.clone(),
                    fallback,
                });
                fallback as f64
            }
        },
    }
}
