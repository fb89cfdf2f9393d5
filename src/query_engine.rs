//! Query Engine
//!
//! Entry points consumed by the presentation layer:
//! - `get_filter_choices(dimension)`: distinct values for populating filters
//! - `get_aggregate(filter, kind)`: one cached aggregate
//! - `get_aggregates(filter, kinds)`: every view of one interaction, one selection scan
//! - `invalidate_cache()` / `reload(source)`
//!
//! The engine owns the current `(DataStore, QueryCache)` pair behind a lock
//! that is held only to clone an `Arc`. A reload swaps in a new pair: queries
//! already running finish against the snapshot they started with and write
//! into that snapshot's cache, never the new one.

use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info};

use crate::aggregations::{AggregateResult, AggregationKind};
use crate::cache::{CacheStats, QueryCache};
use crate::config::{CacheConfig, Config};
use crate::data::{DataSource, DataStore};
use crate::domain::Dimension;
use crate::error::{DataLoadError, InvalidFilterError, QueryError};
use crate::filter::{FilterRequest, FilterState};
use crate::predicate::{FilterEngine, RowSelection};

struct Snapshot {
    store: DataStore,
    cache: QueryCache,
}

pub struct QueryEngine {
    current: RwLock<Arc<Snapshot>>,
    cache_config: CacheConfig,
}

impl QueryEngine {
    pub fn new(store: DataStore, cache_config: CacheConfig) -> Self {
        let snapshot = Snapshot {
            cache: QueryCache::new(&cache_config),
            store,
        };
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            cache_config,
        }
    }

    /// Load a dataset and build an engine over it
    pub fn load(source: DataSource, cache_config: CacheConfig) -> Result<Self, DataLoadError> {
        Ok(Self::new(DataStore::load(source)?, cache_config))
    }

    pub fn from_config(config: &Config) -> Result<Self, DataLoadError> {
        Self::load(DataSource::Path(config.data_path.clone()), config.cache.clone())
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    pub fn row_count(&self) -> usize {
        self.snapshot().store.row_count()
    }

    /// The currently loaded store
    pub fn store(&self) -> DataStore {
        self.snapshot().store.clone()
    }

    /// Sorted distinct values of a dimension
    pub fn get_filter_choices(&self, dimension: Dimension) -> Vec<String> {
        self.snapshot().store.distinct_values(dimension)
    }

    /// Parse a loosely typed request, validating municipalities against the dataset
    pub fn resolve_filter(&self, request: &FilterRequest) -> (FilterState, Vec<InvalidFilterError>) {
        let snapshot = self.snapshot();
        let table = snapshot.store.table();
        request.resolve(|label| table.municipality_code_of(label).is_some())
    }

    /// Aggregate `kind` under `filter`, served from cache when possible
    pub fn get_aggregate(&self, filter: &FilterState, kind: AggregationKind) -> Result<Arc<AggregateResult>, QueryError> {
        let snapshot = self.snapshot();
        snapshot.cache.get_or_compute(filter, kind, || {
            let start = Instant::now();
            let table = snapshot.store.table();
            let rows = FilterEngine::compile(filter).select(table);
            let result = AggregateResult::compute(kind, table, &rows)?;
            log_computation(kind, &rows, start);
            Ok(result)
        })
    }

    /// Aggregate several kinds under one filter
    ///
    /// The row selection is evaluated at most once, on the calling thread,
    /// and only if some kind misses the cache. Repeated kinds are computed
    /// once and share a result. Each kind succeeds or fails independently.
    ///
    /// Kinds are resolved in order on the calling thread (each scan is
    /// parallel internally); cache lookups never run on a Rayon worker.
    /// Call from a plain thread such as the blocking pool, not from inside
    /// a Rayon task.
    pub fn get_aggregates(
        &self,
        filter: &FilterState,
        kinds: &[AggregationKind],
    ) -> Vec<(AggregationKind, Result<Arc<AggregateResult>, QueryError>)> {
        let snapshot = self.snapshot();
        let table = snapshot.store.table();
        let mut selection: Option<RowSelection> = None;
        let mut resolved: FxHashMap<AggregationKind, Result<Arc<AggregateResult>, QueryError>> =
            FxHashMap::default();

        for &kind in kinds {
            if resolved.contains_key(&kind) {
                continue;
            }
            let result = snapshot.cache.get_or_compute(filter, kind, || {
                let start = Instant::now();
                let rows = selection.get_or_insert_with(|| FilterEngine::compile(filter).select(table));
                let result = AggregateResult::compute(kind, table, rows)?;
                log_computation(kind, rows, start);
                Ok(result)
            });
            resolved.insert(kind, result);
        }

        kinds
            .iter()
            .filter_map(|kind| resolved.get(kind).map(|result| (*kind, result.clone())))
            .collect()
    }

    /// Force recomputation on next access
    pub fn invalidate_cache(&self) {
        info!("Invalidating query cache");
        self.snapshot().cache.invalidate_all();
    }

    /// Load a new dataset and swap it in with a fresh cache
    ///
    /// On failure the current dataset and cache stay in place.
    pub fn reload(&self, source: DataSource) -> Result<(), DataLoadError> {
        let store = DataStore::load(source)?;
        let rows = store.row_count();
        let snapshot = Arc::new(Snapshot {
            cache: QueryCache::new(&self.cache_config),
            store,
        });

        let mut guard = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = snapshot;
        info!("Dataset reloaded: {} rows, cache reset", rows);
        Ok(())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.snapshot().cache.stats()
    }
}

fn log_computation(kind: AggregationKind, rows: &RowSelection, start: Instant) {
    if rows.is_empty() {
        debug!("{} computed over an empty selection", kind);
    } else {
        debug!("{} computed over {} rows in {:?}", kind, rows.len(), start.elapsed());
    }
}
