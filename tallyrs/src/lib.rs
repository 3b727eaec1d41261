pub mod analyzer;
pub mod backends;
pub mod config;
pub mod derived;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod fields;
pub mod filter;
pub mod models;
pub mod query_builder;
pub mod sql_ast;

/// Open a DuckDB file, create the tables and return an analyzer configured by `config`.
#[cfg(feature = "duckdb")]
pub async fn open_duckdb<P: AsRef<std::path::Path>>(
    path: P,
    config: &TallyConfig,
) -> error::Result<Analyzer> {
    let resolved = config.for_store("duckdb");
    let store = DuckDbStore::open(path)?
        .with_max_concurrency(resolved.duckdb.max_concurrency)
        .with_pool_size(resolved.pool.size);
    store.create_schema().await?;
    Analyzer::with_config(std::sync::Arc::new(store), &resolved.query)
}

pub use analyzer::{
    Analyzer, Demographics, Device, Events, FilterOptions, Pages, Sessions, Tags, Utm, Visitors,
};
#[cfg(feature = "duckdb")]
pub use backends::DuckDbStore;
pub use backends::Store;
pub use config::{QueryConfig, TallyConfig};
pub use dialect::{ClickHouseDialect, Dialect};
#[cfg(feature = "duckdb")]
pub use dialect::DuckDbDialect;
pub use error::{Result as TallyResult, TallyError};
pub use executor::{CancelHandle, QueryContext, QueryResult};
pub use fields::{Field, ImportedTable, Table};
pub use filter::{CustomMetricType, Direction, Filter, Period, Search, Sort, WeekdayMode};
pub use query_builder::{build_query, QueryBuilder, QuerySpec};
pub use sql_ast::{SqlValue, Statement};
