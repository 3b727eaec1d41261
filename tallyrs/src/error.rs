use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TallyError>;

#[derive(Debug, Error)]
pub enum TallyError {
    /// Growth and comparison statistics need both ends of the period.
    #[error("no period or day specified")]
    NoPeriodOrDay,
    #[error("config error: {0}")]
    Config(String),
    #[error("sql generation error: {0}")]
    Sql(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("query cancelled")]
    Cancelled,
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
