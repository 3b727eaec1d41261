// End-to-end tests against an in-memory DuckDB store.
#[cfg(feature = "duckdb")]
mod duckdb_analyzer;
