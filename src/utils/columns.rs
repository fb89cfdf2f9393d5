//! Column resolution and typed extraction for loaded DataFrames
//!
//! Datasets arrive either as all-text CSV or as typed Parquet (possibly
//! already optimized with Float32 / Categorical columns). These helpers
//! validate that required columns exist and pull values out in one shape
//! regardless of the physical dtype.

use polars::prelude::*;

use crate::error::DataLoadError;

/// A logical column and the physical names it may appear under
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub logical: &'static str,
    pub names: &'static [&'static str],
}

impl ColumnSpec {
    pub const fn new(logical: &'static str, names: &'static [&'static str]) -> Self {
        Self { logical, names }
    }

    /// First physical name present in `df`
    pub fn find<'a>(&self, df: &'a DataFrame) -> Option<&'a Column> {
        self.names.iter().find_map(|name| df.column(name).ok())
    }
}

/// Validate that every required column is present
///
/// Reports all missing columns at once (by their primary name) rather than
/// failing on the first.
pub fn require_columns(df: &DataFrame, required: &[ColumnSpec]) -> Result<(), DataLoadError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|spec| spec.find(df).is_none())
        .map(|spec| spec.names.first().copied().unwrap_or(spec.logical).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataLoadError::MissingColumns(missing))
    }
}

/// Column as optional trimmed text, whatever its dtype
pub fn text_values(column: &Column) -> Result<Vec<Option<String>>, DataLoadError> {
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        })
        .collect();
    Ok(values)
}

/// Column as optional f64; unparseable text becomes null
pub fn float_values(column: &Column) -> Result<Vec<Option<f64>>, DataLoadError> {
    let series = column.as_materialized_series();
    if series.dtype() == &DataType::String {
        let values = series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_float))
            .collect();
        return Ok(values);
    }

    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Parse a decimal cell, accepting a comma decimal separator
pub fn parse_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .or_else(|| trimmed.replace(',', ".").parse::<f64>().ok())
}

/// Truthiness of an ownership flag cell (`true`, `t`, `1`, `1.0`; anything else is false)
pub fn is_truthy(raw: Option<&str>) -> bool {
    match raw {
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "t" | "1" | "1.0"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: ColumnSpec = ColumnSpec::new("region", &["regiao", "region"]);
    const STATE: ColumnSpec = ColumnSpec::new("state", &["estado"]);

    #[test]
    fn test_require_columns_reports_all_missing() {
        let df = df![
            "other" => &["x"],
        ]
        .unwrap();

        let err = require_columns(&df, &[REGION, STATE]).unwrap_err();
        match err {
            DataLoadError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["regiao".to_string(), "estado".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_alias_resolution() {
        let df = df![
            "region" => &["sul"],
            "estado" => &["PR"],
        ]
        .unwrap();

        assert!(require_columns(&df, &[REGION, STATE]).is_ok());
        assert_eq!(REGION.find(&df).unwrap().name().as_str(), "region");
    }

    #[test]
    fn test_text_values_from_typed_columns() {
        let df = df![
            "flag" => &[true, false],
            "score" => &[0.5f64, 1.0],
        ]
        .unwrap();

        let flags = text_values(df.column("flag").unwrap()).unwrap();
        assert_eq!(flags, vec![Some("true".to_string()), Some("false".to_string())]);

        let scores = float_values(df.column("score").unwrap()).unwrap();
        assert_eq!(scores, vec![Some(0.5), Some(1.0)]);
    }

    #[test]
    fn test_float_values_from_text() {
        let df = df![
            "score" => &[Some("0.85"), Some("0,25"), Some("n/a"), None],
        ]
        .unwrap();

        let scores = float_values(df.column("score").unwrap()).unwrap();
        assert_eq!(scores, vec![Some(0.85), Some(0.25), None, None]);
    }

    #[test]
    fn test_truthiness() {
        for raw in ["true", "TRUE", "t", "1", "1.0", " True "] {
            assert!(is_truthy(Some(raw)), "{raw}");
        }
        for raw in ["false", "0", "f", "yes", ""] {
            assert!(!is_truthy(Some(raw)), "{raw}");
        }
        assert!(!is_truthy(None));
    }
}
