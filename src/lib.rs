//! Registry Similarity Query Core
//!
//! Filter composition, aggregation and caching over paired CAR × SIGEF land
//! registry records, each carrying a polygon similarity (Jaccard index) and an
//! ownership-match flag.
//!
//! Layout:
//! - `domain/`, `table/`, `data/`: vocabulary, columnar storage, Polars loading
//! - `filter/`, `predicate/`: selection state and its compiled row predicate
//! - `aggregations/`: one module per analytical view
//! - `risk/`: ownership × spatial risk quadrants
//! - `cache/`, `query_engine/`: memoization and the external entry points
//! - `api_server/` (feature `api`): JSON adapter over the query engine

pub mod aggregations;
pub mod cache;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod filter;
pub mod predicate;
pub mod query_engine;
pub mod risk;
pub mod table;
pub mod utils;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use aggregations::{AggregateResult, AggregateTable, AggregationKind};
pub use cache::{CacheStats, QueryCache};
pub use config::{CacheConfig, Config};
pub use data::{DataFormat, DataSource, DataStore};
pub use domain::{Dimension, Region, SizeClass, State, Status};
pub use error::{DataLoadError, InvalidFilterError, QueryError};
pub use filter::{DimensionFilter, FilterRequest, FilterState, SimilarityRange};
pub use predicate::{FilterEngine, Predicate, RowSelection};
pub use query_engine::QueryEngine;
pub use risk::{RiskQuadrant, HIGH_SIMILARITY_THRESHOLD};
pub use table::{Record, Table, TableBuilder};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
