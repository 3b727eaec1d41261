//! Stores the analyzer reads from.
//!
//! A store executes SQL with positional arguments and returns rows keyed by
//! column name. Each implementation lives in its own file behind a feature flag.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::{QueryContext, QueryResult};
use crate::sql_ast::Statement;

/// Unified interface for all stores.
#[async_trait]
pub trait Store: Send + Sync {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync);

    /// Executes `statement`, binding its arguments in order.
    async fn query(&self, statement: &Statement) -> Result<QueryResult>;

    /// [`query`](Self::query) under a cancellation scope.
    async fn query_in(&self, ctx: &QueryContext, statement: &Statement) -> Result<QueryResult> {
        ctx.run(self.query(statement)).await
    }

    /// First row, if any.
    async fn query_row(
        &self,
        ctx: &QueryContext,
        statement: &Statement,
    ) -> Result<Option<Map<String, Value>>> {
        let result = self.query_in(ctx, statement).await?;
        Ok(result.rows.into_iter().next())
    }

    /// First column of the first row as an integer, 0 for NULL or no rows.
    async fn count(&self, ctx: &QueryContext, statement: &Statement) -> Result<i64> {
        self.query_in(ctx, statement).await?.scalar()
    }
}

impl dyn Store {
    pub async fn select<T>(&self, ctx: &QueryContext, statement: &Statement) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.query_in(ctx, statement).await?.decode()
    }

    /// First decoded row, or the default record when the query returns none.
    pub async fn select_one<T>(&self, ctx: &QueryContext, statement: &Statement) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let rows: Vec<T> = self.select(ctx, statement).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }
}

pub mod schema;

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbStore;
