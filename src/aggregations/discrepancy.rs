//! Relative area discrepancy between the declared (CAR) and aggregated
//! (SIGEF) areas: `(declared − aggregated) / aggregated × 100`.
//!
//! Rows missing either area, or with a non-positive aggregated area, are
//! excluded. The median is taken over the `[-100, 100]` window so a few
//! extreme parcels do not dominate it.

use serde::Serialize;

use crate::predicate::RowSelection;
use crate::table::Table;
use crate::utils::stats::{median, percentage};

/// Discrepancies within ± this many percent count as precise
pub const PRECISION_BAND_PCT: f32 = 10.0;

/// Window for the reported median
pub const DISCREPANCY_WINDOW_PCT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyZone {
    /// Declared area smaller than aggregated
    Under,
    Precise,
    /// Declared area larger than aggregated
    Over,
}

impl DiscrepancyZone {
    pub const ALL: [DiscrepancyZone; 3] = [DiscrepancyZone::Under, DiscrepancyZone::Precise, DiscrepancyZone::Over];

    pub fn of(discrepancy_pct: f32) -> Self {
        if discrepancy_pct < -PRECISION_BAND_PCT {
            DiscrepancyZone::Under
        } else if discrepancy_pct > PRECISION_BAND_PCT {
            DiscrepancyZone::Over
        } else {
            DiscrepancyZone::Precise
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRow {
    pub zone: DiscrepancyZone,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaDiscrepancy {
    /// Rows with both areas and a positive aggregated area
    pub considered: usize,
    pub excluded: usize,
    pub zones: Vec<ZoneRow>,
    pub within_window: usize,
    pub median_pct: Option<f64>,
}

/// Relative discrepancy of one row, if computable
///
/// Only a zero aggregated area makes the row uncomputable.
pub fn relative_discrepancy(declared: Option<f32>, aggregated: Option<f32>) -> Option<f32> {
    match (declared, aggregated) {
        (Some(a), Some(b)) if b != 0.0 => Some((a - b) / b * 100.0),
        _ => None,
    }
}

pub fn compute(table: &Table, rows: &RowSelection) -> AreaDiscrepancy {
    let values: Vec<f32> = rows
        .iter()
        .filter_map(|r| {
            let (declared, aggregated) = table.areas(r);
            relative_discrepancy(declared, aggregated)
        })
        .collect();

    let mut counts = [0usize; 3];
    for &v in &values {
        counts[DiscrepancyZone::of(v) as usize] += 1;
    }

    let mut windowed: Vec<f32> = values
        .iter()
        .copied()
        .filter(|v| v.abs() <= DISCREPANCY_WINDOW_PCT)
        .collect();

    AreaDiscrepancy {
        considered: values.len(),
        excluded: rows.len() - values.len(),
        zones: DiscrepancyZone::ALL
            .iter()
            .map(|&zone| ZoneRow {
                zone,
                count: counts[zone as usize],
                percentage: percentage(counts[zone as usize], values.len()),
            })
            .collect(),
        within_window: windowed.len(),
        median_pct: median(&mut windowed),
    }
}
