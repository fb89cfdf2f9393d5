//! Convert the similarity CSV into a compact Parquet file
//!
//! Downcasts every column to the smallest dtype the query layer accepts:
//! - similarity index and areas to Float32 (invalid cells become null)
//! - registration year to Int16, ownership flag to Boolean
//! - low-cardinality text (region, state, municipality, class, status) to Categorical
//!
//! Usage:
//!   cargo run --release --bin optimize_dataset [input.csv] [output.parquet]

use polars::prelude::*;
use registry_similarity::config::DEFAULT_DATA_PATH;
use registry_similarity::data::{
    self, read_frame, DataSource, AREA_AGGREGATED, AREA_DECLARED, JACCARD, MUNICIPALITY, OWNERSHIP,
    REGION, REGISTERED_TOTAL, SIZE, STATE, STATUS, YEAR,
};
use registry_similarity::utils::columns::{is_truthy, parse_float, ColumnSpec};
use std::path::PathBuf;
use std::time::Instant;

const CATEGORICAL: [ColumnSpec; 5] = [REGION, STATE, MUNICIPALITY, SIZE, STATUS];
const FLOAT32: [ColumnSpec; 3] = [AREA_DECLARED, AREA_AGGREGATED, REGISTERED_TOTAL];

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let input = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()));
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| input.with_extension("parquet"));

    println!("\n{}", "=".repeat(70));
    println!("Dataset Optimization (CSV -> Parquet)");
    println!("{}", "=".repeat(70));
    println!("  Input:  {}", input.display());
    println!("  Output: {}", output.display());
    println!();

    let load_start = Instant::now();
    let source = read_frame(&DataSource::path(&input))?;
    println!(
        "Loaded:  {} rows × {} columns ({:.3} ms)",
        source.height(),
        source.width(),
        load_start.elapsed().as_secs_f64() * 1000.0
    );

    let cast_start = Instant::now();
    let mut df = source.clone();

    if let Some(column) = JACCARD.find(&source) {
        let values: Vec<Option<f32>> = text(column)?
            .into_iter()
            .map(|v| v.and_then(data::parse_similarity))
            .collect();
        let invalid = values.iter().filter(|v| v.is_none()).count();
        if invalid > 0 {
            println!("  WARNING: {} similarity cells are missing or outside [0, 1]", invalid);
        }
        df.with_column(Series::new(column.name().clone(), values))?;
    }

    for spec in FLOAT32 {
        if let Some(column) = spec.find(&source) {
            let values: Vec<Option<f32>> = text(column)?
                .into_iter()
                .map(|v| v.and_then(parse_float).map(|x| x as f32))
                .collect();
            df.with_column(Series::new(column.name().clone(), values))?;
        }
    }

    if let Some(column) = YEAR.find(&source) {
        let values: Vec<Option<i16>> = text(column)?
            .into_iter()
            .map(|v| v.and_then(parse_float).map(|x| x.trunc() as i16))
            .collect();
        df.with_column(Series::new(column.name().clone(), values))?;
    }

    if let Some(column) = OWNERSHIP.find(&source) {
        let values: Vec<Option<bool>> = text(column)?
            .into_iter()
            .map(|v| v.map(|s| is_truthy(Some(s))))
            .collect();
        df.with_column(Series::new(column.name().clone(), values))?;
    }

    for spec in CATEGORICAL {
        if let Some(column) = spec.find(&source) {
            let categorical = column
                .as_materialized_series()
                .cast(&DataType::Categorical(None, Default::default()))?;
            df.with_column(categorical)?;
        }
    }

    println!("Cast:    {:.3} ms", cast_start.elapsed().as_secs_f64() * 1000.0);
    for column in df.get_columns() {
        println!("  {:<28} {}", column.name(), column.dtype());
    }

    // Write Parquet with ZSTD compression
    let write_start = Instant::now();
    let file = std::fs::File::create(&output)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(None))
        .finish(&mut df)?;

    let input_size = std::fs::metadata(&input)?.len() as f64 / (1024.0 * 1024.0);
    let output_size = std::fs::metadata(&output)?.len() as f64 / (1024.0 * 1024.0);

    println!();
    println!("Written: {:.2} MB ({:.3} ms)", output_size, write_start.elapsed().as_secs_f64() * 1000.0);
    println!("CSV size: {:.2} MB", input_size);
    println!("Compression: {:.1}x", input_size / output_size.max(f64::EPSILON));
    println!("{}", "=".repeat(70));

    Ok(())
}

fn text(column: &Column) -> PolarsResult<Vec<Option<&str>>> {
    Ok(column.as_materialized_series().str()?.into_iter().collect())
}
