//! ClickHouse dialect implementation.

use crate::filter::Period;
use crate::sql_ast::{Aggregation, Function};

use super::{tz_literal, Dialect};

#[derive(Debug, Default, Clone, Copy)]
pub struct ClickHouseDialect;

impl Dialect for ClickHouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "\\`"))
    }

    fn supports_final(&self) -> bool {
        true
    }

    fn table_modifiers(&self, final_read: bool, sample: u32) -> String {
        let mut modifiers = String::new();
        if final_read {
            modifiers.push_str(" FINAL");
        }
        if sample > 0 {
            modifiers.push_str(&format!(" SAMPLE {sample}"));
        }
        modifiers
    }

    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Sum => format!("sum({expr})"),
            Aggregation::Count => format!("count({expr})"),
            Aggregation::Min => format!("min({expr})"),
            Aggregation::Max => format!("max({expr})"),
            Aggregation::Avg => format!("avg({expr})"),
            Aggregation::Any => format!("any({expr})"),
        }
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        let joined = args.join(", ");
        match func {
            Function::Uniq => format!("uniq({joined})"),
            Function::UniqIf => format!("uniqIf({joined})"),
            Function::Greatest => format!("greatest({joined})"),
            Function::Least => format!("least({joined})"),
            Function::Coalesce => format!("coalesce({joined})"),
            Function::ToFloat => format!("toFloat64({joined})"),
            Function::ToInt => format!("toInt64({joined})"),
            Function::ElementAt => match args.as_slice() {
                [values, keys, key] => format!("{values}[indexOf({keys}, {key})]"),
                _ => "NULL".to_string(),
            },
            Function::ArrayHas => format!("has({joined})"),
            Function::RegexMatch => format!("match({joined})"),
            Function::ToDate => format!("toDate({joined})"),
            Function::ToDateTime => format!("toDateTime({joined})"),
            Function::DateIn { tz } => format!("toDate({joined}, {})", tz_literal(tz)),
            Function::StartOfPeriod {
                period,
                tz,
                weekday,
            } => {
                let tz = tz_literal(tz);
                match period {
                    Period::Day => format!("toDate({joined}, {tz})"),
                    Period::Week => {
                        let mode = if weekday.is_sunday() { 0 } else { 1 };
                        format!("toStartOfWeek({joined}, {mode}, {tz})")
                    }
                    Period::Month => format!("toStartOfMonth({joined}, {tz})"),
                    Period::Year => format!("toStartOfYear({joined}, {tz})"),
                }
            }
            Function::Hour { tz } => format!("toHour({joined}, {})", tz_literal(tz)),
            Function::Minute { tz } => format!("toMinute({joined}, {})", tz_literal(tz)),
            Function::Weekday { tz, mode } => {
                let mode = if mode.is_sunday() { 3 } else { 0 };
                format!("toDayOfWeek({joined}, {mode}, {})", tz_literal(tz))
            }
            Function::MapFromArrays => format!("mapFromArrays({joined})"),
            Function::ArrayJoin => format!("arrayJoin({joined})"),
            Function::DistinctFlatten => format!("groupUniqArrayArray({joined})"),
            Function::ParseNumber { float } => {
                if *float {
                    format!("toFloat64OrZero({joined})")
                } else {
                    format!("toInt64OrZero({joined})")
                }
            }
            Function::NthValue => format!("nth_value({joined})"),
        }
    }
}
