//! DuckDB dialect implementation.
//!
//! DuckDB has no sampling clause matching the ClickHouse semantics and no
//! merge reads, so both are ignored.

use chrono_tz::Tz;

use crate::filter::Period;
use crate::sql_ast::Function;

use super::{tz_literal, Dialect};

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

/// Wall clock time of a UTC timestamp in `tz`.
fn local(expr: &str, tz: &Tz) -> String {
    if *tz == Tz::UTC {
        expr.to_string()
    } else {
        format!("timezone({}, {expr} AT TIME ZONE 'UTC')", tz_literal(tz))
    }
}

fn distinct_key(args: &[String]) -> String {
    match args {
        [single] => single.clone(),
        many => format!("concat({})", many.join(", ':', ")),
    }
}

impl Dialect for DuckDbDialect {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        let joined = args.join(", ");
        match func {
            Function::Uniq => format!("count(DISTINCT {})", distinct_key(&args)),
            Function::UniqIf => match args.split_last() {
                Some((cond, keys)) if !keys.is_empty() => format!(
                    "count(DISTINCT {}) FILTER (WHERE {cond})",
                    distinct_key(keys)
                ),
                _ => "NULL".to_string(),
            },
            Function::Greatest => format!("greatest({joined})"),
            Function::Least => format!("least({joined})"),
            Function::Coalesce => format!("coalesce({joined})"),
            Function::ToFloat => format!("CAST({joined} AS DOUBLE)"),
            Function::ToInt => format!("CAST({joined} AS BIGINT)"),
            Function::ElementAt => match args.as_slice() {
                [values, keys, key] => {
                    format!("coalesce({values}[list_position({keys}, {key})], '')")
                }
                _ => "NULL".to_string(),
            },
            Function::ArrayHas => format!("list_contains({joined})"),
            Function::RegexMatch => format!("regexp_matches({joined})"),
            Function::ToDate => format!("CAST({joined} AS DATE)"),
            Function::ToDateTime => format!("CAST({joined} AS TIMESTAMP)"),
            Function::DateIn { tz } => format!("CAST({} AS DATE)", local(&joined, tz)),
            Function::StartOfPeriod {
                period,
                tz,
                weekday,
            } => {
                let time = local(&joined, tz);
                match period {
                    Period::Day => format!("CAST({time} AS DATE)"),
                    Period::Week if weekday.is_sunday() => format!(
                        "CAST(date_trunc('week', {time} + INTERVAL 1 DAY) - INTERVAL 1 DAY AS DATE)"
                    ),
                    Period::Week => format!("CAST(date_trunc('week', {time}) AS DATE)"),
                    Period::Month => format!("CAST(date_trunc('month', {time}) AS DATE)"),
                    Period::Year => format!("CAST(date_trunc('year', {time}) AS DATE)"),
                }
            }
            Function::Hour { tz } => format!("hour({})", local(&joined, tz)),
            Function::Minute { tz } => format!("minute({})", local(&joined, tz)),
            Function::Weekday { tz, mode } => {
                if mode.is_sunday() {
                    format!("(dayofweek({}) + 1)", local(&joined, tz))
                } else {
                    format!("isodow({})", local(&joined, tz))
                }
            }
            Function::MapFromArrays => format!("map({joined})"),
            Function::ArrayJoin => format!("unnest({joined})"),
            Function::DistinctFlatten => format!("list_distinct(flatten(list({joined})))"),
            Function::ParseNumber { float } => {
                let data_type = if *float { "DOUBLE" } else { "BIGINT" };
                format!("coalesce(TRY_CAST({joined} AS {data_type}), 0)")
            }
            Function::NthValue => format!("nth_value({joined})"),
        }
    }
}
