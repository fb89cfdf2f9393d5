//! Query cache
//!
//! Memoizes `(filter signature, aggregation kind) → AggregateResult` for the
//! lifetime of one loaded dataset. Backed by a Moka sync cache:
//! - entries expire after the configured TTL (checked lazily on access)
//! - concurrent misses on one key are coalesced, so the computation runs once
//! - failed computations are returned to every waiter and never stored

use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::aggregations::{AggregateResult, AggregationKind};
use crate::config::CacheConfig;
use crate::error::QueryError;
use crate::filter::FilterState;

/// Canonical cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    signature: String,
    kind: AggregationKind,
}

impl CacheKey {
    pub fn new(filter: &FilterState, kind: AggregationKind) -> Self {
        Self {
            signature: filter.signature(),
            kind,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn kind(&self) -> AggregationKind {
        self.kind
    }
}

/// Counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub computations: u64,
    pub entries: u64,
}

pub struct QueryCache {
    entries: Cache<CacheKey, Arc<AggregateResult>>,
    hits: AtomicU64,
    computations: AtomicU64,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().time_to_live(Duration::from_secs(config.ttl_secs));
        if let Some(capacity) = config.max_entries {
            builder = builder.max_capacity(capacity);
        }
        Self {
            entries: builder.build(),
            hits: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Cached result for `(filter, kind)`, computing it on a miss
    ///
    /// Concurrent callers with the same key wait for a single computation.
    /// Errors are propagated and leave no entry behind.
    pub fn get_or_compute<F>(
        &self,
        filter: &FilterState,
        kind: AggregationKind,
        compute: F,
    ) -> Result<Arc<AggregateResult>, QueryError>
    where
        F: FnOnce() -> Result<AggregateResult, QueryError>,
    {
        let key = CacheKey::new(filter, kind);
        let mut computed = false;

        let result = self.entries.try_get_with(key, || {
            computed = true;
            compute().map(Arc::new)
        });

        if computed {
            self.computations.fetch_add(1, Ordering::Relaxed);
            debug!("Cache miss: computed {}", kind);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit: {}", kind);
        }

        result.map_err(|e| (*e).clone())
    }

    /// Drop every entry; the next access recomputes
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    pub fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            entries: self.entries.entry_count(),
        }
    }
}
