//! Load a dataset and print what the query layer sees
//!
//! Reports dropped/degraded rows, distinct filter values per dimension and
//! the cold vs. cached timing of every aggregate over the unfiltered view.
//!
//! Usage:
//!   cargo run --release --bin inspect_dataset [path]

use registry_similarity::aggregations::AggregationKind;
use registry_similarity::config::{CacheConfig, DEFAULT_DATA_PATH};
use registry_similarity::{DataSource, Dimension, FilterState, QueryEngine};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registry_similarity=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());

    println!("\n=== DATASET: {} ===\n", path);

    let start = Instant::now();
    let engine = QueryEngine::load(DataSource::path(&path), CacheConfig::default())?;
    println!("Loaded in {:?}\n", start.elapsed());

    let store = engine.store();
    let report = store.report();
    println!("Rows");
    println!("  source:                 {}", report.source_rows);
    println!("  kept:                   {}", store.row_count());
    println!("  dropped (state):        {}", report.dropped_unknown_state);
    println!("  dropped (similarity):   {}", report.dropped_invalid_jaccard);
    println!("  region derived:         {}", report.derived_region);
    println!("  unknown size class:     {}", report.unknown_size);
    println!("  unknown status:         {}", report.unknown_status);
    println!("  municipality totals:    {}", store.table().has_registered_totals());

    println!("\nFilter choices");
    for dimension in Dimension::ALL {
        let values = engine.get_filter_choices(dimension);
        let preview: Vec<&str> = values.iter().take(6).map(String::as_str).collect();
        let more = if values.len() > preview.len() { ", ..." } else { "" };
        println!("  {:<14} {:>5}  [{}{}]", dimension.to_string(), values.len(), preview.join(", "), more);
    }

    let filter = FilterState::new();
    let mut kinds = vec![
        AggregationKind::Distribution,
        AggregationKind::TemporalEvolution,
        AggregationKind::RiskMatrix,
        AggregationKind::SummaryStats,
        AggregationKind::StateMaturity,
        AggregationKind::AreaDiscrepancy,
    ];
    for dimension in Dimension::ALL {
        kinds.push(AggregationKind::CategoricalRollup(dimension));
        kinds.push(AggregationKind::SimilarityBreakdown(dimension));
        kinds.push(AggregationKind::OwnershipBreakdown(dimension));
        kinds.push(AggregationKind::TemporalByGroup(dimension));
    }

    println!("\nAggregates (unfiltered)");
    println!("  {:<36} {:>12} {:>12}", "kind", "cold", "cached");
    for kind in kinds {
        let cold_start = Instant::now();
        let result = engine.get_aggregate(&filter, kind);
        let cold = cold_start.elapsed();

        let warm_start = Instant::now();
        let _ = engine.get_aggregate(&filter, kind);
        let warm = warm_start.elapsed();

        match result {
            Ok(_) => println!("  {:<36} {:>12.3?} {:>12.3?}", kind.to_string(), cold, warm),
            Err(e) => println!("  {:<36} ERROR: {}", kind.to_string(), e),
        }
    }

    let stats = engine.cache_stats();
    println!(
        "\nCache: {} entries, {} computations, {} hits\n",
        stats.entries, stats.computations, stats.hits
    );

    Ok(())
}
