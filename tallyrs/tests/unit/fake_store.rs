use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tally::executor::ColumnMeta;
use tally::{ClickHouseDialect, Dialect, QueryResult, Statement, Store, TallyResult};

type Responder = dyn Fn(&Statement) -> QueryResult + Send + Sync;

/// Answers every statement through `respond` and keeps a copy of it.
pub struct FakeStore {
    respond: Box<Responder>,
    delay: Option<Duration>,
    statements: Mutex<Vec<Statement>>,
}

impl FakeStore {
    pub fn empty() -> Arc<Self> {
        Self::responding(|_| QueryResult::default())
    }

    pub fn responding<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&Statement) -> QueryResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            delay: None,
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(|_| QueryResult::default()),
            delay: Some(delay),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().expect("lock").clone()
    }
}

#[async_trait::async_trait]
impl Store for FakeStore {
    fn dialect(&self) -> &(dyn Dialect + Send + Sync) {
        &ClickHouseDialect
    }

    async fn query(&self, statement: &Statement) -> TallyResult<QueryResult> {
        self.statements.lock().expect("lock").push(statement.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok((self.respond)(statement))
    }
}

/// A single-row result with the given columns.
pub fn row(values: &[(&str, Value)]) -> QueryResult {
    let columns = values
        .iter()
        .map(|(name, _)| ColumnMeta {
            name: name.to_string(),
        })
        .collect();
    let row: Map<String, Value> = values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    QueryResult {
        columns,
        rows: vec![row],
    }
}
