//! Data Loading and Normalization
//!
//! Loads the CAR × SIGEF similarity dataset with Polars (CSV or Parquet, from
//! a path or an in-memory byte stream), validates it, and normalizes it into
//! the compact [`Table`] the query layer scans.
//!
//! Validation rules:
//! - required columns: region, state, jaccard index, ownership flag, status, size class
//! - rows with an unknown state or an invalid similarity index are dropped
//! - an unrecognised region is derived from the state
//! - unrecognised size/status values become null

use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{Category, Dimension, Region, SizeClass, State, Status};
use crate::error::DataLoadError;
use crate::table::{Record, Table, TableBuilder};
use crate::utils::columns::{self, float_values, is_truthy, require_columns, text_values, ColumnSpec};

// ============================================================================
// Column layout
// ============================================================================

pub const REGION: ColumnSpec = ColumnSpec::new("region", &["regiao", "region"]);
pub const STATE: ColumnSpec = ColumnSpec::new("state", &["estado", "uf", "state"]);
pub const JACCARD: ColumnSpec = ColumnSpec::new("jaccard", &["indice_jaccard", "jaccard"]);
pub const OWNERSHIP: ColumnSpec = ColumnSpec::new("ownership", &["igualdade_cpf", "ownership_match"]);
pub const STATUS: ColumnSpec = ColumnSpec::new("status", &["status_imovel", "status"]);
pub const SIZE: ColumnSpec = ColumnSpec::new("size", &["class_tam_imovel", "size_class"]);

pub const PROPERTY_CODE: ColumnSpec = ColumnSpec::new("property_code", &["cod_imovel", "property_code"]);
pub const MUNICIPALITY: ColumnSpec = ColumnSpec::new("municipality", &["municipio_nome", "municipality"]);
pub const YEAR: ColumnSpec = ColumnSpec::new("year", &["ano_cadastro", "year"]);
pub const REGISTRATION_DATE: ColumnSpec = ColumnSpec::new("registration_date", &["data_cadastro_imovel"]);
pub const AREA_DECLARED: ColumnSpec = ColumnSpec::new("area_declared", &["area_sicar_ha"]);
pub const AREA_AGGREGATED: ColumnSpec = ColumnSpec::new("area_aggregated", &["area_sigef_agregado_ha"]);
pub const REGISTERED_TOTAL: ColumnSpec = ColumnSpec::new("registered_total", &["total_cars_municipio"]);

/// Columns without which the dataset is rejected
pub const REQUIRED_COLUMNS: [ColumnSpec; 6] = [REGION, STATE, JACCARD, OWNERSHIP, STATUS, SIZE];

// ============================================================================
// Sources
// ============================================================================

/// Physical encoding of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Parquet,
}

impl DataFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, DataLoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(DataFormat::Csv),
            "parquet" | "pq" => Ok(DataFormat::Parquet),
            _ => Err(DataLoadError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Where a dataset is read from
///
/// Archives are unpacked by the caller; `Bytes` holds an already
/// decompressed CSV or Parquet payload.
#[derive(Debug, Clone)]
pub enum DataSource {
    Path(PathBuf),
    Bytes { bytes: Vec<u8>, format: DataFormat },
}

impl DataSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        DataSource::Path(path.into())
    }

    pub fn csv_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        DataSource::Bytes {
            bytes: bytes.into(),
            format: DataFormat::Csv,
        }
    }

    pub fn parquet_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        DataSource::Bytes {
            bytes: bytes.into(),
            format: DataFormat::Parquet,
        }
    }

    fn describe(&self) -> String {
        match self {
            DataSource::Path(path) => path.display().to_string(),
            DataSource::Bytes { bytes, format } => format!("<{:?} stream, {} bytes>", format, bytes.len()),
        }
    }
}

/// Read a source into a DataFrame
///
/// CSV is read with every column as text so that mixed or dirty columns never
/// abort the load; values are parsed per column afterwards.
pub fn read_frame(source: &DataSource) -> Result<DataFrame, DataLoadError> {
    match source {
        DataSource::Path(path) => {
            let format = DataFormat::from_path(path)?;
            if !path.exists() {
                return Err(DataLoadError::Io {
                    path: path.display().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
            match format {
                DataFormat::Csv => Ok(text_csv_options()
                    .try_into_reader_with_file_path(Some(path.clone()))?
                    .finish()?),
                DataFormat::Parquet => Ok(LazyFrame::scan_parquet(path, Default::default())?.collect()?),
            }
        }
        DataSource::Bytes { bytes, format } => match format {
            DataFormat::Csv => Ok(text_csv_options()
                .into_reader_with_file_handle(Cursor::new(bytes.as_slice()))
                .finish()?),
            DataFormat::Parquet => Ok(ParquetReader::new(Cursor::new(bytes.as_slice())).finish()?),
        },
    }
}

fn text_csv_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
}

// ============================================================================
// DataStore
// ============================================================================

/// Rows dropped or degraded while normalizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub source_rows: usize,
    pub dropped_unknown_state: usize,
    pub dropped_invalid_jaccard: usize,
    pub derived_region: usize,
    pub unknown_size: usize,
    pub unknown_status: usize,
}

impl LoadReport {
    pub fn dropped(&self) -> usize {
        self.dropped_unknown_state + self.dropped_invalid_jaccard
    }
}

/// The loaded, normalized dataset
///
/// Read-only after construction; cloning shares the underlying table.
#[derive(Debug, Clone)]
pub struct DataStore {
    table: Arc<Table>,
    report: LoadReport,
    source: String,
}

impl DataStore {
    /// Load and normalize a dataset
    pub fn load(source: DataSource) -> Result<Self, DataLoadError> {
        let start = Instant::now();
        let label = source.describe();
        info!("Loading dataset from {}", label);

        let df = read_frame(&source)?;
        debug!("Read {} rows × {} columns in {:?}", df.height(), df.width(), start.elapsed());

        let store = Self::from_dataframe(&df, label)?;
        info!(
            "Dataset ready: {} rows ({} dropped) in {:?}",
            store.row_count(),
            store.report.dropped(),
            start.elapsed()
        );
        Ok(store)
    }

    /// Wrap an already built table
    pub fn from_table(table: Table) -> Self {
        let report = LoadReport {
            source_rows: table.len(),
            ..LoadReport::default()
        };
        Self {
            table: Arc::new(table),
            report,
            source: "<in-memory table>".to_string(),
        }
    }

    /// Normalize a DataFrame into a store
    pub fn from_dataframe(df: &DataFrame, source: String) -> Result<Self, DataLoadError> {
        require_columns(df, &REQUIRED_COLUMNS)?;
        if df.height() == 0 {
            return Err(DataLoadError::Empty);
        }

        let (table, report) = normalize(df)?;

        if report.dropped_unknown_state > 0 {
            warn!("Dropped {} rows with an unknown state", report.dropped_unknown_state);
        }
        if report.dropped_invalid_jaccard > 0 {
            warn!(
                "Dropped {} rows with a missing or out-of-range similarity index",
                report.dropped_invalid_jaccard
            );
        }
        if report.derived_region > 0 {
            warn!("Derived region from state for {} rows", report.derived_region);
        }
        if report.unknown_size + report.unknown_status > 0 {
            debug!(
                "Unrecognised size class on {} rows, status on {} rows",
                report.unknown_size, report.unknown_status
            );
        }

        if table.is_empty() {
            return Err(DataLoadError::NoValidRows {
                dropped: report.dropped(),
            });
        }

        Ok(Self {
            table: Arc::new(table),
            report,
            source,
        })
    }

    pub fn row_count(&self) -> usize {
        self.table.len()
    }

    /// Sorted distinct values of a dimension, for populating filter choices
    pub fn distinct_values(&self, dimension: Dimension) -> Vec<String> {
        self.table.distinct_values(dimension)
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Optional column values, or `None` when the column is absent
fn optional_text(df: &DataFrame, spec: ColumnSpec) -> Result<Option<Vec<Option<String>>>, DataLoadError> {
    spec.find(df).map(text_values).transpose()
}

fn optional_float(df: &DataFrame, spec: ColumnSpec) -> Result<Option<Vec<Option<f64>>>, DataLoadError> {
    spec.find(df).map(float_values).transpose()
}

fn required_text(df: &DataFrame, spec: ColumnSpec) -> Result<Vec<Option<String>>, DataLoadError> {
    optional_text(df, spec)?
        .ok_or_else(|| DataLoadError::MissingColumns(vec![spec.logical.to_string()]))
}

fn required_float(df: &DataFrame, spec: ColumnSpec) -> Result<Vec<Option<f64>>, DataLoadError> {
    optional_float(df, spec)?
        .ok_or_else(|| DataLoadError::MissingColumns(vec![spec.logical.to_string()]))
}

fn cell<T: Clone>(column: &Option<Vec<Option<T>>>, row: usize) -> Option<T> {
    column.as_ref().and_then(|values| values[row].clone())
}

fn normalize(df: &DataFrame) -> Result<(Table, LoadReport), DataLoadError> {
    let n = df.height();

    let regions = required_text(df, REGION)?;
    let states = required_text(df, STATE)?;
    let jaccard = required_float(df, JACCARD)?;
    let ownership = required_text(df, OWNERSHIP)?;
    let statuses = required_text(df, STATUS)?;
    let sizes = required_text(df, SIZE)?;

    let codes = optional_text(df, PROPERTY_CODE)?;
    let municipalities = optional_text(df, MUNICIPALITY)?;
    let years = match optional_float(df, YEAR)? {
        Some(values) => Some(values.into_iter().map(|v| v.and_then(year_from_number)).collect::<Vec<_>>()),
        None => optional_text(df, REGISTRATION_DATE)?
            .map(|values| values.iter().map(|v| v.as_deref().and_then(parse_year)).collect()),
    };
    let area_declared = optional_float(df, AREA_DECLARED)?;
    let area_aggregated = optional_float(df, AREA_AGGREGATED)?;
    let registered_totals = optional_float(df, REGISTERED_TOTAL)?;

    let mut report = LoadReport {
        source_rows: n,
        ..LoadReport::default()
    };
    let mut builder = TableBuilder::with_capacity(n);

    for row in 0..n {
        let Some(state) = states[row].as_deref().and_then(State::parse) else {
            report.dropped_unknown_state += 1;
            continue;
        };

        let Some(similarity) = jaccard[row].filter(|v| v.is_finite() && (0.0..=1.0).contains(v)) else {
            report.dropped_invalid_jaccard += 1;
            continue;
        };

        let region = match regions[row].as_deref().and_then(Region::parse) {
            Some(region) => region,
            None => {
                report.derived_region += 1;
                state.region()
            }
        };

        let size = sizes[row].as_deref().and_then(SizeClass::parse);
        report.unknown_size += usize::from(size.is_none());
        let status = statuses[row].as_deref().and_then(Status::parse);
        report.unknown_status += usize::from(status.is_none());

        builder.push(Record {
            property_code: cell(&codes, row),
            region,
            state,
            municipality: cell(&municipalities, row),
            size,
            status,
            year: years.as_ref().and_then(|values| values[row]),
            area_declared: cell(&area_declared, row).filter(|v| v.is_finite()).map(|v| v as f32),
            area_aggregated: cell(&area_aggregated, row).filter(|v| v.is_finite()).map(|v| v as f32),
            jaccard: similarity as f32,
            ownership_match: is_truthy(ownership[row].as_deref()),
            registered_total: cell(&registered_totals, row)
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v.round() as u32),
        });
    }

    Ok((builder.build()?, report))
}

fn year_from_number(value: f64) -> Option<u16> {
    let year = value.trunc();
    (1900.0..=2100.0).contains(&year).then_some(year as u16)
}

/// Registration year from a date cell
///
/// Accepts ISO dates, ISO date-times and `dd/mm/yyyy`; falls back to a
/// leading four-digit year.
pub fn parse_year(raw: &str) -> Option<u16> {
    use chrono::{Datelike, NaiveDate, NaiveDateTime};

    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .ok();

    let year = match date {
        Some(date) => date.year(),
        None => {
            let prefix = raw.get(..4)?;
            if !prefix.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            prefix.parse::<i32>().ok()?
        }
    };

    (1900..=2100).contains(&year).then_some(year as u16)
}

/// Parse a similarity cell on its own (used by the dataset tools)
pub fn parse_similarity(raw: &str) -> Option<f32> {
    columns::parse_float(raw)
        .filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
        .map(|v| v as f32)
}
