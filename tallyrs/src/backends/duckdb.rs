//! DuckDB store.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use duckdb::types::{ToSql, ToSqlOutput, Value, ValueRef};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};

use crate::dialect::{Dialect, DuckDbDialect};
use crate::error::{Result, TallyError};
use crate::executor::{duck_value_to_json, ColumnMeta, QueryResult};
use crate::sql_ast::{SqlValue, Statement};

use super::schema::DUCKDB_TABLES;
use super::Store;

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Int(i) => ToSqlOutput::Owned(Value::BigInt(*i)),
            SqlValue::UInt(u) => ToSqlOutput::Owned(Value::UBigInt(*u)),
            SqlValue::Float(f) => ToSqlOutput::Owned(Value::Double(*f)),
            SqlValue::Bool(b) => ToSqlOutput::Owned(Value::Boolean(*b)),
        })
    }
}

/// Embedded DuckDB database behind a bounded connection pool.
///
/// Pooled connections are clones of one root connection, so in-memory
/// databases are shared by every query.
#[derive(Clone)]
pub struct DuckDbStore {
    dialect: DuckDbDialect,
    root: Arc<Mutex<duckdb::Connection>>,
    limiter: Arc<Semaphore>,
    pool: Arc<Mutex<Vec<duckdb::Connection>>>,
    max_idle: usize,
}

impl DuckDbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), max_concurrency = 16, "creating DuckDB store");
        Ok(Self::from_connection(duckdb::Connection::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        tracing::info!(max_concurrency = 16, "creating in-memory DuckDB store");
        Ok(Self::from_connection(duckdb::Connection::open_in_memory()?))
    }

    fn from_connection(root: duckdb::Connection) -> Self {
        Self {
            dialect: DuckDbDialect,
            root: Arc::new(Mutex::new(root)),
            limiter: Arc::new(Semaphore::new(16)),
            pool: Arc::new(Mutex::new(Vec::new())),
            max_idle: 16,
        }
    }

    /// Configure maximum concurrent executions; callers can tune based on hardware.
    pub fn with_max_concurrency(mut self, max_in_flight: usize) -> Self {
        tracing::debug!(max_concurrency = max_in_flight, "configuring DuckDB concurrency");
        self.limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    /// Number of idle connections kept for reuse. Extra connections are closed.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        tracing::debug!(pool_size = size, "configuring DuckDB pool");
        self.max_idle = size.max(1);
        self
    }

    /// Creates the fact and imported tables if they don't exist.
    pub async fn create_schema(&self) -> Result<()> {
        self.execute_batch(&DUCKDB_TABLES.join(";\n")).await
    }

    /// Runs statements without parameters or results, e.g. DDL and fixtures.
    pub async fn execute_batch(&self, sql: &str) -> Result<()> {
        let sql = sql.to_string();
        let _permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;
        let (result, conn) = tokio::task::spawn_blocking(move || {
            let result = conn.execute_batch(&sql).map_err(TallyError::from);
            (result, conn)
        })
        .await
        .map_err(|e| TallyError::Execution(format!("task join error: {e}")))?;
        self.release(conn).await;
        result
    }

    async fn release(&self, conn: duckdb::Connection) {
        let mut pool = self.pool.lock().await;
        if pool.len() < self.max_idle {
            pool.push(conn);
        }
    }

    async fn acquire_slot(&self) -> Result<SemaphorePermit<'_>> {
        let available = self.limiter.available_permits();
        if available == 0 {
            tracing::debug!("all DuckDB slots in use, waiting for permit");
        }
        self.limiter
            .acquire()
            .await
            .map_err(|e| TallyError::Execution(format!("limiter closed: {e}")))
    }

    async fn checkout_connection(&self) -> Result<duckdb::Connection> {
        let mut guard = self.pool.lock().await;
        if let Some(conn) = guard.pop() {
            let pool_size = guard.len();
            drop(guard);
            tracing::trace!(pool_remaining = pool_size, "reusing pooled DuckDB connection");
            return Ok(conn);
        }
        drop(guard);
        tracing::debug!("opening new DuckDB connection");
        let root = self.root.lock().await;
        Ok(root.try_clone()?)
    }
}

fn run_statement(
    conn: &duckdb::Connection,
    sql: &str,
    args: &[SqlValue],
) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query(duckdb::params_from_iter(args.iter()))?;
    let stmt_ref = rows_iter
        .as_ref()
        .ok_or_else(|| TallyError::Execution("statement missing".to_string()))?;
    let mut column_names = Vec::new();
    for idx in 0..stmt_ref.column_count() {
        let name = stmt_ref
            .column_name(idx)
            .map_err(|e| TallyError::Execution(e.to_string()))?;
        column_names.push(name.to_string());
    }
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut map = serde_json::Map::new();
        for (idx, name) in column_names.iter().enumerate() {
            map.insert(name.clone(), duck_value_to_json(row.get_ref(idx)?.to_owned()));
        }
        rows.push(map);
    }
    let columns = column_names
        .into_iter()
        .map(|name| ColumnMeta { name })
        .collect();
    Ok(QueryResult { columns, rows })
}

#[async_trait]
impl Store for DuckDbStore {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        &self.dialect
    }

    async fn query(&self, statement: &Statement) -> Result<QueryResult> {
        let Statement { sql, args } = statement.clone();
        let _permit = self.acquire_slot().await?;
        let conn = self.checkout_connection().await?;
        let (result, conn) = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let result = run_statement(&conn, &sql, &args);
            if let Ok(result) = &result {
                tracing::debug!(
                    rows = result.rows.len(),
                    columns = result.columns.len(),
                    ms = start.elapsed().as_millis(),
                    "duckdb query"
                );
            }
            (result, conn)
        })
        .await
        .map_err(|e| TallyError::Execution(format!("task join error: {e}")))?;

        self.release(conn).await;
        result
    }
}
