//! Query execution plumbing shared by every store: cancellation, result
//! rows and decoding of rows into statistic records.

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "duckdb")]
use duckdb::types::{TimeUnit, Value as DuckValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{Result, TallyError};

/// Cancellation scope of a call, carried by the filter into every store round-trip.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    cancel: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
}

/// Cancels every query running under the contexts cloned from its pair.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone already.
        let _ = self.sender.send(true);
    }
}

impl QueryContext {
    /// A context that is cancelled through the returned handle.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                cancel: Some(receiver),
                timeout: None,
            },
            CancelHandle { sender },
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Drives `fut` until it completes, the context is cancelled or the timeout elapses.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let guarded = async {
            match self.cancel.clone() {
                Some(mut rx) => {
                    if *rx.borrow() {
                        return Err(TallyError::Cancelled);
                    }
                    tokio::select! {
                        biased;
                        Ok(_) = rx.wait_for(|cancelled| *cancelled) => Err(TallyError::Cancelled),
                        result = fut => result,
                    }
                }
                None => fut.await,
            }
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| TallyError::Timeout(limit))?,
            None => guarded.await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
}

/// Rows of a statement as JSON objects keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    /// First column of the first row as an integer. NULL and empty results read as 0.
    pub fn scalar(&self) -> Result<i64> {
        let Some(value) = self
            .columns
            .first()
            .and_then(|column| self.rows.first()?.get(&column.name))
        else {
            return Ok(0);
        };
        match value {
            Value::Null => Ok(0),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .ok_or_else(|| TallyError::Execution(format!("not an integer: {n}"))),
            Value::String(s) => s
                .parse::<i64>()
                .map_err(|e| TallyError::Execution(format!("not an integer: {s}: {e}"))),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(TallyError::Execution(format!("not an integer: {other}"))),
        }
    }

    /// Decodes every row into `T` by column name.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        self.rows
            .into_iter()
            .map(|row| serde_json::from_value(Value::Object(row)).map_err(TallyError::from))
            .collect()
    }
}

#[cfg(feature = "duckdb")]
fn timestamp_to_json(unit: TimeUnit, value: i64) -> Value {
    let micros = match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    };
    match chrono::DateTime::from_timestamp_micros(micros) {
        Some(datetime) => Value::String(datetime.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()),
        None => Value::Null,
    }
}

#[cfg(feature = "duckdb")]
fn date_to_json(days: i32) -> Value {
    let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    match epoch.checked_add_signed(chrono::Duration::days(i64::from(days))) {
        Some(date) => Value::String(date.format("%Y-%m-%d").to_string()),
        None => Value::Null,
    }
}

/// Text form of a map key.
#[cfg(feature = "duckdb")]
fn key_to_string(key: DuckValue) -> String {
    match duck_value_to_json(key) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(feature = "duckdb")]
pub(crate) fn duck_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        // sum() over BIGINT widens to HUGEINT
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(i) => Value::from(i),
            Err(_) => Value::from(i as f64),
        },
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Decimal(d) => d
            .to_string()
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        DuckValue::Timestamp(unit, t) => timestamp_to_json(unit, t),
        DuckValue::Text(s) => Value::String(s),
        DuckValue::Blob(bytes) => Value::String(hex::encode(bytes)),
        DuckValue::Date32(d) => date_to_json(d),
        DuckValue::Time64(unit, t) => timestamp_to_json(unit, t),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => Value::String(format!("{months} months {days} days {nanos} nanos")),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(duck_value_to_json).collect())
        }
        DuckValue::Enum(s) => Value::String(s),
        DuckValue::Struct(fields) => {
            let mut map = Map::new();
            for (key, val) in fields.iter() {
                map.insert(key.clone(), duck_value_to_json(val.clone()));
            }
            Value::Object(map)
        }
        DuckValue::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries.iter() {
                map.insert(key_to_string(k.clone()), duck_value_to_json(v.clone()));
            }
            Value::Object(map)
        }
        DuckValue::Union(inner) => duck_value_to_json(*inner),
    }
}
