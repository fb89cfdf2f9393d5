// Query engine integration tests
//
// Purpose: exercise the public entry points end to end (CSV bytes -> loader ->
// filter -> aggregate -> cache) on a small hand-checked dataset.
// Run with: cargo test --test query_engine_tests

use approx::assert_relative_eq;
use registry_similarity::aggregations::AggregateTable;
use registry_similarity::config::CacheConfig;
use registry_similarity::domain::{Dimension, Region, State};
use registry_similarity::filter::BoundInput;
use registry_similarity::risk::RiskQuadrant;
use registry_similarity::{
    AggregateResult, AggregationKind, DataSource, DataStore, FilterRequest, FilterState, QueryEngine, Record,
    RowSelection, SimilarityRange, TableBuilder,
};
use std::sync::Arc;

const HEADER: &str = "cod_imovel,regiao,estado,municipio_nome,class_tam_imovel,status_imovel,data_cadastro_imovel,area_sicar_ha,area_sigef_agregado_ha,indice_jaccard,igualdade_cpf";

// Risk quadrants: 6 high maturity, 2 technical error, 1 legal risk, 1 critical
const ROWS: [&str; 10] = [
    "MT-001,centro_oeste,MT,Sinop,Grande,AT,2018-03-01,1000,1010,0.95,true",
    "MT-002,centro_oeste,MT,Sinop,Médio,AT,2018-05-10,500,480,0.90,true",
    "MT-003,centro_oeste,MT,Sorriso,Grande,AT,2019-01-15,2000,2100,0.85,true",
    "SP-001,sudeste,SP,Campinas,Pequeno,AT,2019-07-20,50,51,0.88,true",
    "SP-002,sudeste,SP,Campinas,Pequeno,PE,2020-02-02,40,80,0.91,true",
    "RS-001,sul,RS,Pelotas,Pequeno,AT,2020-09-09,30,30,0.99,true",
    "RS-002,sul,RS,Pelotas,Médio,AT,2021-01-01,600,300,0.40,true",
    "BA-001,nordeste,BA,Salvador,Pequeno,SU,2021-06-30,20,35,0.10,true",
    "BA-002,nordeste,BA,Salvador,Grande,AT,2021-08-08,3000,3050,0.86,false",
    "PA-001,norte,PA,Belem,Médio,CA,2022-04-04,700,1500,0.30,false",
];

fn csv(rows: &[&str]) -> DataSource {
    let mut text = String::from(HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    DataSource::csv_bytes(text)
}

fn engine() -> QueryEngine {
    QueryEngine::load(csv(&ROWS), CacheConfig::default()).unwrap()
}

fn risk_counts(result: &AggregateResult) -> Vec<(RiskQuadrant, usize)> {
    match &result.table {
        AggregateTable::RiskMatrix(cells) => cells.iter().map(|c| (c.quadrant, c.count)).collect(),
        other => panic!("expected risk matrix, got {other:?}"),
    }
}

fn count_of(result: &AggregateResult, quadrant: RiskQuadrant) -> usize {
    risk_counts(result)
        .into_iter()
        .find(|(q, _)| *q == quadrant)
        .map(|(_, c)| c)
        .unwrap_or(0)
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_loads_all_rows() {
    let engine = engine();
    assert_eq!(engine.row_count(), 10);
    assert_eq!(engine.store().report().dropped(), 0);
    assert_eq!(engine.get_filter_choices(Dimension::State), vec!["BA", "MT", "PA", "RS", "SP"]);
    assert_eq!(
        engine.get_filter_choices(Dimension::SizeClass),
        vec!["Grande", "Médio", "Pequeno"]
    );
}

#[test]
fn test_filter_choices_are_accepted_back() {
    let engine = engine();
    let request = FilterRequest {
        regions: engine.get_filter_choices(Dimension::Region),
        states: engine.get_filter_choices(Dimension::State),
        municipalities: engine.get_filter_choices(Dimension::Municipality),
        sizes: engine.get_filter_choices(Dimension::SizeClass),
        statuses: engine.get_filter_choices(Dimension::Status),
        ..FilterRequest::default()
    };
    let (filter, warnings) = engine.resolve_filter(&request);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let result = engine.get_aggregate(&filter, AggregationKind::SummaryStats).unwrap();
    assert_eq!(result.filtered_rows, 10);
}

// ============================================================================
// Risk matrix
// ============================================================================

#[test]
fn test_risk_matrix_scenario() {
    let engine = engine();
    let result = engine.get_aggregate(&FilterState::new(), AggregationKind::RiskMatrix).unwrap();

    assert_eq!(count_of(&result, RiskQuadrant::HighMaturity), 6);
    assert_eq!(count_of(&result, RiskQuadrant::TechnicalError), 2);
    assert_eq!(count_of(&result, RiskQuadrant::LegalRisk), 1);
    assert_eq!(count_of(&result, RiskQuadrant::Critical), 1);

    if let AggregateTable::RiskMatrix(cells) = &result.table {
        let total_pct: f64 = cells.iter().map(|c| c.percentage).sum();
        assert_relative_eq!(total_pct, 100.0, epsilon = 1e-9);
        let high = cells.iter().find(|c| c.quadrant == RiskQuadrant::HighMaturity).unwrap();
        assert_relative_eq!(high.percentage, 60.0, epsilon = 1e-9);
    }
}

/// Filters spanning every state, each similarity band, code search and a region
fn filter_grid() -> Vec<FilterState> {
    let mut filters = vec![
        FilterState::new(),
        FilterState::new().with_states([State::MT, State::BA]),
        FilterState::new().with_regions([Region::Sul]),
        FilterState::new().with_regions([Region::CentroOeste, Region::Norte]),
        FilterState::new().with_code_search("sp-"),
        FilterState::new().with_code_search("no-such-code"),
    ];
    for state in [State::BA, State::MT, State::PA, State::RS, State::SP] {
        filters.push(FilterState::new().with_states([state]));
    }
    for (lo, hi) in [(0.0, 0.25), (0.25, 0.5), (0.5, 0.85), (0.85, 1.0), (0.85, 0.85), (0.2, 0.9)] {
        filters.push(FilterState::new().with_similarity(SimilarityRange::new(lo, hi)));
    }
    filters
}

/// Every per-group view of `dimension` accounts for each filtered row exactly once
fn assert_groups_reconcile(engine: &QueryEngine, filter: &FilterState, dimension: Dimension) {
    let result = engine
        .get_aggregate(filter, AggregationKind::CategoricalRollup(dimension))
        .unwrap();
    let AggregateTable::CategoricalRollup(rows) = &result.table else {
        panic!("expected rollup");
    };
    assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), result.filtered_rows, "{dimension:?}");
    assert!(rows.iter().filter(|r| r.is_other).count() <= 1);

    let result = engine
        .get_aggregate(filter, AggregationKind::SimilarityBreakdown(dimension))
        .unwrap();
    let AggregateTable::SimilarityBreakdown(rows) = &result.table else {
        panic!("expected similarity breakdown");
    };
    assert_eq!(rows.iter().map(|r| r.total).sum::<usize>(), result.filtered_rows, "{dimension:?}");
    for row in rows {
        assert_eq!(row.bands.iter().map(|b| b.count).sum::<usize>(), row.total);
    }

    let result = engine
        .get_aggregate(filter, AggregationKind::OwnershipBreakdown(dimension))
        .unwrap();
    let AggregateTable::OwnershipBreakdown(rows) = &result.table else {
        panic!("expected ownership breakdown");
    };
    assert_eq!(rows.iter().map(|r| r.total).sum::<usize>(), result.filtered_rows, "{dimension:?}");
    for row in rows {
        assert_eq!(row.same_owner + row.different_owner, row.total);
    }
}

#[test]
fn test_risk_cells_sum_to_filtered_rows() {
    let engine = engine();

    for filter in filter_grid() {
        let result = engine.get_aggregate(&filter, AggregationKind::RiskMatrix).unwrap();
        let total: usize = risk_counts(&result).iter().map(|(_, c)| c).sum();
        assert_eq!(total, result.filtered_rows, "{filter:?}");
    }
}

#[test]
fn test_group_views_reconcile_for_every_dimension() {
    let engine = engine();

    for filter in filter_grid() {
        for dimension in Dimension::ALL {
            assert_groups_reconcile(&engine, &filter, dimension);
        }
    }
}

// ============================================================================
// Filter semantics
// ============================================================================

#[test]
fn test_empty_filter_equals_unfiltered_computation() {
    let engine = engine();
    let store = engine.store();
    let table = store.table();
    let all = RowSelection::all(table);

    for kind in [
        AggregationKind::Distribution,
        AggregationKind::RiskMatrix,
        AggregationKind::CategoricalRollup(Dimension::State),
        AggregationKind::TemporalEvolution,
    ] {
        let (filter, _) = FilterRequest::default().into_filter_state();
        let cached = engine.get_aggregate(&filter, kind).unwrap();
        let direct = AggregateResult::compute(kind, table, &all).unwrap();
        assert_eq!(cached.table, direct.table, "{kind}");
        assert_eq!(cached.filtered_rows, 10);
    }
}

#[test]
fn test_similarity_point_range_at_threshold() {
    let engine = engine();
    let filter = FilterState::new().with_similarity(SimilarityRange::new(0.85, 0.85));

    let result = engine.get_aggregate(&filter, AggregationKind::Distribution).unwrap();
    assert_eq!(result.filtered_rows, 1);
    match &result.table {
        AggregateTable::Distribution(rows) => {
            assert_eq!(rows.last().map(|r| r.count), Some(1));
            assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), 1);
        }
        other => panic!("expected distribution, got {other:?}"),
    }

    let risk = engine.get_aggregate(&filter, AggregationKind::RiskMatrix).unwrap();
    assert_eq!(count_of(&risk, RiskQuadrant::HighMaturity), 1);
}

#[test]
fn test_dimensions_are_combined() {
    let engine = engine();
    let filter = FilterState::new()
        .with_regions([Region::CentroOeste])
        .with_states([State::MT, State::SP]);
    let result = engine.get_aggregate(&filter, AggregationKind::SummaryStats).unwrap();
    assert_eq!(result.filtered_rows, 3);
}

#[test]
fn test_empty_result_is_not_an_error() {
    let engine = engine();
    let filter = FilterState::new().with_states([State::AC]);

    for kind in [
        AggregationKind::Distribution,
        AggregationKind::RiskMatrix,
        AggregationKind::SummaryStats,
        AggregationKind::CategoricalRollup(Dimension::Municipality),
        AggregationKind::AreaDiscrepancy,
    ] {
        let result = engine.get_aggregate(&filter, kind).unwrap();
        assert!(result.is_empty(), "{kind}");
    }
}

#[test]
fn test_code_search() {
    let engine = engine();

    let hit = FilterState::new().with_code_search("sp-");
    let result = engine.get_aggregate(&hit, AggregationKind::SummaryStats).unwrap();
    assert_eq!(result.filtered_rows, 2);

    let miss = FilterState::new().with_code_search("no-such-code");
    let result = engine.get_aggregate(&miss, AggregationKind::SummaryStats).unwrap();
    assert_eq!(result.filtered_rows, 0);
}

#[test]
fn test_invalid_request_values_degrade_gracefully() {
    let engine = engine();
    let request = FilterRequest {
        states: vec!["SP".into(), "ZZ".into()],
        similarity_min: Some(BoundInput::Text("abc".into())),
        similarity_max: Some(BoundInput::Number(1.5)),
        ..FilterRequest::default()
    };
    let (filter, warnings) = engine.resolve_filter(&request);
    assert_eq!(warnings.len(), 3);

    let result = engine.get_aggregate(&filter, AggregationKind::SummaryStats).unwrap();
    assert_eq!(result.filtered_rows, 2);
}

// ============================================================================
// Rollups and breakdowns
// ============================================================================

#[test]
fn test_municipality_rollup_collapses_tail() {
    // 25 municipalities with 25, 24, ..., 1 rows
    let mut records = Vec::new();
    for i in 0..25u32 {
        for _ in 0..(25 - i) {
            records.push(Record::new(State::GO, 0.9, true).with_municipality(format!("Cidade {:02}", i)));
        }
    }
    let total = records.len();
    let table = TableBuilder::from_iter(records).build().unwrap();
    let engine = QueryEngine::new(DataStore::from_table(table), CacheConfig::default());

    let result = engine
        .get_aggregate(&FilterState::new(), AggregationKind::CategoricalRollup(Dimension::Municipality))
        .unwrap();

    let AggregateTable::CategoricalRollup(rows) = &result.table else {
        panic!("expected rollup");
    };
    assert_eq!(rows.len(), 21);
    assert_eq!(rows[0].group, "Cidade 00");
    assert_eq!(rows[0].count, 25);

    let other = rows.last().unwrap();
    assert!(other.is_other);
    assert_eq!(other.group, "Other");
    assert_eq!(other.count, 5 + 4 + 3 + 2 + 1);
    assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), total);
}

#[test]
fn test_other_bucket_reconciles_under_filters() {
    // 25 municipalities over two states, similarity and ownership varying by row
    let mut records = Vec::new();
    for i in 0..25u32 {
        let state = if i % 2 == 0 { State::GO } else { State::MT };
        for j in 0..(25 - i) {
            records.push(
                Record::new(state, ((i + j) % 20) as f32 / 19.0, j % 3 != 0)
                    .with_code(format!("{}-{:02}-{:02}", state, i, j))
                    .with_municipality(format!("Cidade {:02}", i)),
            );
        }
    }
    let table = TableBuilder::from_iter(records).build().unwrap();
    let engine = QueryEngine::new(DataStore::from_table(table), CacheConfig::default());

    let filters = [
        FilterState::new(),
        FilterState::new().with_states([State::GO]),
        FilterState::new().with_similarity(SimilarityRange::new(0.0, 0.5)),
        FilterState::new().with_similarity(SimilarityRange::new(0.85, 1.0)),
        FilterState::new().with_code_search("-1"),
    ];
    for filter in &filters {
        for dimension in Dimension::ALL {
            assert_groups_reconcile(&engine, filter, dimension);
        }
    }

    let result = engine
        .get_aggregate(&filters[0], AggregationKind::CategoricalRollup(Dimension::Municipality))
        .unwrap();
    let AggregateTable::CategoricalRollup(rows) = &result.table else {
        panic!("expected rollup");
    };
    assert!(rows.last().unwrap().is_other);
}

#[test]
fn test_breakdowns_cover_every_row() {
    let engine = engine();
    let filter = FilterState::new();

    let result = engine
        .get_aggregate(&filter, AggregationKind::SimilarityBreakdown(Dimension::State))
        .unwrap();
    let AggregateTable::SimilarityBreakdown(rows) = &result.table else {
        panic!("expected similarity breakdown");
    };
    assert_eq!(rows.iter().map(|r| r.total).sum::<usize>(), 10);
    for row in rows {
        assert_eq!(row.bands.iter().map(|b| b.count).sum::<usize>(), row.total);
    }

    let result = engine
        .get_aggregate(&filter, AggregationKind::OwnershipBreakdown(Dimension::Region))
        .unwrap();
    let AggregateTable::OwnershipBreakdown(rows) = &result.table else {
        panic!("expected ownership breakdown");
    };
    assert_eq!(rows.iter().map(|r| r.total).sum::<usize>(), 10);
    for row in rows {
        assert_eq!(row.same_owner + row.different_owner, row.total);
    }
}

#[test]
fn test_temporal_evolution_by_year() {
    let engine = engine();
    let result = engine
        .get_aggregate(&FilterState::new(), AggregationKind::TemporalEvolution)
        .unwrap();
    let AggregateTable::TemporalEvolution(rows) = &result.table else {
        panic!("expected temporal evolution");
    };
    let years: Vec<(u16, usize)> = rows.iter().map(|r| (r.year, r.records)).collect();
    assert_eq!(years, vec![(2018, 2), (2019, 2), (2020, 2), (2021, 3), (2022, 1)]);
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn test_repeated_query_computes_once() {
    let engine = engine();
    let filter = FilterState::new().with_states([State::MT]);

    let first = engine.get_aggregate(&filter, AggregationKind::StateMaturity).unwrap();
    let second = engine.get_aggregate(&filter, AggregationKind::StateMaturity).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let stats = engine.cache_stats();
    assert_eq!(stats.computations, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_selection_order_does_not_change_cache_key() {
    let engine = engine();
    let a = FilterState::new().with_states([State::SP, State::MT, State::BA]);
    let b = FilterState::new().with_states([State::BA, State::SP, State::MT]);

    let first = engine.get_aggregate(&a, AggregationKind::RiskMatrix).unwrap();
    let second = engine.get_aggregate(&b, AggregationKind::RiskMatrix).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.cache_stats().computations, 1);
}

#[test]
fn test_concurrent_identical_requests_compute_once() {
    let engine = engine();
    let filter = FilterState::new().with_regions([Region::Nordeste, Region::Norte]);

    let results: Vec<Arc<AggregateResult>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| engine.get_aggregate(&filter, AggregationKind::AreaDiscrepancy).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(engine.cache_stats().computations, 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

#[test]
fn test_reload_replaces_dataset_and_cache() {
    let engine = engine();
    let filter = FilterState::new();
    let before = engine.get_aggregate(&filter, AggregationKind::RiskMatrix).unwrap();
    assert_eq!(before.filtered_rows, 10);

    engine.reload(csv(&ROWS[..4])).unwrap();
    assert_eq!(engine.row_count(), 4);
    assert_eq!(engine.cache_stats().computations, 0);

    let after = engine.get_aggregate(&filter, AggregationKind::RiskMatrix).unwrap();
    assert_eq!(after.filtered_rows, 4);
    assert_eq!(count_of(&after, RiskQuadrant::HighMaturity), 4);
    // The earlier result is still a valid snapshot of the old dataset
    assert_eq!(before.filtered_rows, 10);
}

#[test]
fn test_batch_evaluates_every_kind() {
    let engine = engine();
    let filter = FilterState::new().with_states([State::SP, State::RS]);
    let kinds = [
        AggregationKind::Distribution,
        AggregationKind::CategoricalRollup(Dimension::Municipality),
        AggregationKind::TemporalByGroup(Dimension::State),
        AggregationKind::SummaryStats,
    ];

    let results = engine.get_aggregates(&filter, &kinds);
    assert_eq!(results.len(), kinds.len());
    for ((kind, result), expected) in results.iter().zip(kinds) {
        assert_eq!(*kind, expected);
        assert_eq!(result.as_ref().unwrap().filtered_rows, 4);
    }
    assert_eq!(engine.cache_stats().computations, kinds.len() as u64);
}
