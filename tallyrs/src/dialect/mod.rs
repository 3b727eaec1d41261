//! SQL dialect abstractions for the supported column stores.
//!
//! Each dialect is implemented in its own file. ClickHouse is always
//! available for SQL generation, DuckDB is gated behind the `duckdb` feature.

use crate::sql_ast::{Aggregation, Function};

/// Dialects render identifiers and primitive expression pieces.
/// Expression tree walking lives in the renderer; the dialect
/// only maps logical constructs to SQL fragments.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;
    fn quote_ident(&self, ident: &str) -> String;
    fn placeholder(&self, _idx: usize) -> String {
        "?".to_string()
    }
    /// Text appended after a named table reference (merge reads, sampling).
    fn table_modifiers(&self, _final_read: bool, _sample: u32) -> String {
        String::new()
    }
    fn supports_final(&self) -> bool {
        false
    }
    fn render_function(&self, func: &Function, args: Vec<String>) -> String;
    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
            Aggregation::Avg => format!("AVG({expr})"),
            Aggregation::Any => format!("ANY_VALUE({expr})"),
        }
    }
    fn render_literal(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "NULL".to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            serde_json::Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| self.render_literal(v)).collect();
                rendered.join(", ")
            }
            serde_json::Value::Object(_) => {
                format!("'{}'", value.to_string().replace('\'', "''"))
            }
        }
    }
}

/// Quoted timezone name for use as a function argument.
pub(crate) fn tz_literal(tz: &chrono_tz::Tz) -> String {
    format!("'{}'", tz.name().replace('\'', "''"))
}

mod clickhouse;
pub use clickhouse::ClickHouseDialect;

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "duckdb")]
pub use duckdb::DuckDbDialect;
