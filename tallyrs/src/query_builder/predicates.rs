//! Filter compilation into WHERE predicates.
//!
//! The same compiler serves every place a filter is applied: fact tables,
//! imported tables and the projection of the time-on-page window query.
//! A [`ColumnSource`] tells it where each dimension lives.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::fields::{columns, Field, ImportedTable, Table};
use crate::filter::Filter;
use crate::sql_ast::{Function, SqlBinaryOperator, SqlExpr, SqlValue};

/// How a scope answers a column lookup.
pub(crate) enum Resolved {
    Column(SqlExpr),
    /// The predicate belongs to another layer of the query.
    Skip,
    /// The scope can't express the predicate at all.
    Unsupported,
}

pub(crate) trait ColumnSource {
    fn resolve(&self, field: Field) -> Resolved;
}

/// A fact table, optionally with event columns available through the left-joined `ev`.
pub(crate) struct TableScope<'a> {
    pub table: Table,
    pub alias: &'a str,
    pub event_alias: Option<&'a str>,
}

impl<'a> TableScope<'a> {
    pub fn new(table: Table, alias: &'a str) -> Self {
        Self {
            table,
            alias,
            event_alias: None,
        }
    }
}

impl ColumnSource for TableScope<'_> {
    fn resolve(&self, field: Field) -> Resolved {
        if let Some(column) = field.column(self.table) {
            return Resolved::Column(SqlExpr::column(self.alias, column));
        }
        match (self.event_alias, field) {
            (Some(alias), Field::EventName) => Resolved::Column(SqlExpr::func(
                Function::Coalesce,
                vec![SqlExpr::column(alias, field.name()), SqlExpr::text("")],
            )),
            (Some(alias), Field::EventMetaKeysRaw | Field::EventMetaValuesRaw) => {
                Resolved::Column(SqlExpr::column(alias, field.name()))
            }
            _ => Resolved::Skip,
        }
    }
}

/// An imported table. Anything it doesn't store makes the filter unsupported.
pub(crate) struct ImportedScope<'a> {
    pub table: ImportedTable,
    pub alias: &'a str,
}

impl ColumnSource for ImportedScope<'_> {
    fn resolve(&self, field: Field) -> Resolved {
        match field.imported_column(self.table) {
            Some(column) => Resolved::Column(SqlExpr::column(self.alias, column)),
            None => Resolved::Unsupported,
        }
    }
}

/// Columns projected by an inner query under their field names.
pub(crate) struct ProjectedScope<'a> {
    pub alias: &'a str,
    pub fields: Vec<Field>,
}

impl ColumnSource for ProjectedScope<'_> {
    fn resolve(&self, field: Field) -> Resolved {
        if self.fields.contains(&field) {
            Resolved::Column(SqlExpr::column(self.alias, field.name()))
        } else {
            Resolved::Skip
        }
    }
}

/// `client_id = ?` plus the time range on `time`.
pub(crate) fn time_predicates(filter: &Filter, alias: &str, time: &str) -> Vec<SqlExpr> {
    let mut predicates = vec![
        SqlExpr::column(alias, columns::CLIENT_ID).equals(SqlExpr::param(filter.client_id))
    ];
    let column = SqlExpr::column(alias, time);
    let day = SqlExpr::func(Function::DateIn { tz: filter.tz() }, vec![column.clone()]);

    if let Some(from) = filter.from {
        predicates.push(if filter.include_time {
            column.clone().at_least(SqlExpr::func(
                Function::ToDateTime,
                vec![SqlExpr::param(SqlValue::datetime(from))],
            ))
        } else {
            day.clone().at_least(SqlExpr::func(
                Function::ToDate,
                vec![SqlExpr::param(SqlValue::date(from))],
            ))
        });
    }
    if let Some(to) = filter.to {
        predicates.push(if filter.include_time {
            column.at_most(SqlExpr::func(
                Function::ToDateTime,
                vec![SqlExpr::param(SqlValue::datetime(to))],
            ))
        } else {
            day.at_most(SqlExpr::func(
                Function::ToDate,
                vec![SqlExpr::param(SqlValue::date(to))],
            ))
        });
    }
    predicates
}

fn is_null(value: &str) -> bool {
    value.eq_ignore_ascii_case("null")
}

fn negated(value: &str) -> Option<&str> {
    value.strip_prefix('!')
}

/// The value as a parameter, or the empty literal for the null sentinel.
fn value_expr(value: &str) -> SqlExpr {
    if is_null(value) {
        SqlExpr::text("")
    } else {
        SqlExpr::param(value)
    }
}

/// Positive values OR'd, negated values AND'd.
fn list_predicates(column: &SqlExpr, values: &[String], out: &mut Vec<SqlExpr>) {
    let mut positive = Vec::new();
    for value in values {
        match negated(value) {
            Some(value) => out.push(column.clone().not_equals(value_expr(value))),
            None => positive.push(column.clone().equals(value_expr(value))),
        }
    }
    out.extend(SqlExpr::or_all(positive));
}

fn pattern_predicates(column: &SqlExpr, patterns: &[String], out: &mut Vec<SqlExpr>) {
    let mut positive = Vec::new();
    for pattern in patterns {
        let (pattern, negate) = match negated(pattern) {
            Some(pattern) => (pattern, true),
            None => (pattern.as_str(), false),
        };
        let matches = SqlExpr::func(
            Function::RegexMatch,
            vec![column.clone(), SqlExpr::param(pattern)],
        );
        if negate {
            out.push(matches.negate());
        } else {
            positive.push(matches);
        }
    }
    out.extend(SqlExpr::or_all(positive));
}

fn key_predicates(keys_column: &SqlExpr, keys: &[String], out: &mut Vec<SqlExpr>) {
    let mut positive = Vec::new();
    for key in keys {
        let (key, negate) = match negated(key) {
            Some(key) => (key, true),
            None => (key.as_str(), false),
        };
        let has = SqlExpr::func(
            Function::ArrayHas,
            vec![keys_column.clone(), SqlExpr::param(key)],
        );
        if negate {
            out.push(has.negate());
        } else {
            positive.push(has);
        }
    }
    out.extend(SqlExpr::or_all(positive));
}

fn map_predicates(
    values_column: &SqlExpr,
    keys_column: &SqlExpr,
    entries: &BTreeMap<String, String>,
    out: &mut Vec<SqlExpr>,
) {
    for (key, value) in entries {
        let element = SqlExpr::func(
            Function::ElementAt,
            vec![
                values_column.clone(),
                keys_column.clone(),
                SqlExpr::param(key.as_str()),
            ],
        );
        out.push(match negated(value) {
            Some(value) => element.not_equals(value_expr(value)),
            None => element.equals(value_expr(value)),
        });
    }
}

fn platform_predicate(desktop: SqlExpr, mobile: SqlExpr, platform: &str) -> Option<SqlExpr> {
    let one = || SqlExpr::int(1);
    let zero = || SqlExpr::int(0);
    let (platform, negate) = match negated(platform) {
        Some(platform) => (platform, true),
        None => (platform, false),
    };
    let matches = match platform {
        "desktop" => desktop.equals(one()),
        "mobile" => mobile.equals(one()),
        "unknown" => SqlExpr::and_all(vec![desktop.equals(zero()), mobile.equals(zero())])?,
        _ => return None,
    };
    Some(if negate { matches.negate() } else { matches })
}

/// Compiles every dimension predicate of `filter` that `source` can express.
///
/// Returns `None` when the source reports a predicate as unsupported.
pub(crate) fn compile_predicates(filter: &Filter, source: &dyn ColumnSource) -> Option<Vec<SqlExpr>> {
    let unsupported = Cell::new(false);
    let predicates = compile(filter, &|field: Field| match source.resolve(field) {
        Resolved::Column(column) => Some(column),
        Resolved::Skip => None,
        Resolved::Unsupported => {
            unsupported.set(true);
            None
        }
    });
    (!unsupported.get()).then_some(predicates)
}

/// Compiles the predicates `source` can express and skips the rest.
pub(crate) fn compile_available(filter: &Filter, source: &dyn ColumnSource) -> Vec<SqlExpr> {
    compile(filter, &|field: Field| match source.resolve(field) {
        Resolved::Column(column) => Some(column),
        Resolved::Skip | Resolved::Unsupported => None,
    })
}

/// `column` is only asked for fields the filter constrains. `None` drops the predicate.
fn compile(filter: &Filter, column: &dyn Fn(Field) -> Option<SqlExpr>) -> Vec<SqlExpr> {
    let mut out = Vec::new();

    let lists: [(Field, &Vec<String>); 24] = [
        (Field::Hostname, &filter.hostname),
        (Field::Path, &filter.path),
        (Field::Path, &filter.any_path),
        (Field::EntryPath, &filter.entry_path),
        (Field::ExitPath, &filter.exit_path),
        (Field::Language, &filter.language),
        (Field::Country, &filter.country),
        (Field::Region, &filter.region),
        (Field::City, &filter.city),
        (Field::Referrer, &filter.referrer),
        (Field::ReferrerName, &filter.referrer_name),
        (Field::Channel, &filter.channel),
        (Field::Os, &filter.os),
        (Field::OsVersion, &filter.os_version),
        (Field::Browser, &filter.browser),
        (Field::BrowserVersion, &filter.browser_version),
        (Field::ScreenClass, &filter.screen_class),
        (Field::UtmSource, &filter.utm_source),
        (Field::UtmMedium, &filter.utm_medium),
        (Field::UtmCampaign, &filter.utm_campaign),
        (Field::UtmContent, &filter.utm_content),
        (Field::UtmTerm, &filter.utm_term),
        (Field::EventName, &filter.event_name),
        (Field::Path, &filter.path_pattern),
    ];
    let pattern_index = lists.len() - 1;

    for (index, (field, values)) in lists.iter().enumerate() {
        if values.is_empty() {
            continue;
        }
        let Some(target) = column(*field) else {
            continue;
        };
        if index == pattern_index {
            pattern_predicates(&target, values, &mut out);
        } else {
            list_predicates(&target, values, &mut out);
        }
    }

    if !filter.platform.is_empty() {
        if let (Some(desktop), Some(mobile)) = (column(Field::Desktop), column(Field::Mobile)) {
            out.extend(platform_predicate(desktop, mobile, &filter.platform));
        }
    }

    let pairs: [(&Vec<String>, &BTreeMap<String, String>, Field, Field); 2] = [
        (
            &filter.tag,
            &filter.tags,
            Field::TagKeysRaw,
            Field::TagValuesRaw,
        ),
        (
            &filter.event_meta_key,
            &filter.event_meta,
            Field::EventMetaKeysRaw,
            Field::EventMetaValuesRaw,
        ),
    ];
    for (keys, entries, keys_field, values_field) in pairs {
        if !keys.is_empty() {
            if let Some(keys_column) = column(keys_field) {
                key_predicates(&keys_column, keys, &mut out);
            }
        }
        if !entries.is_empty() {
            if let (Some(values), Some(keys_column)) = (column(values_field), column(keys_field)) {
                map_predicates(&values, &keys_column, entries, &mut out);
            }
        }
    }

    if filter.visitor_id != 0 {
        if let (Some(visitor), Some(session)) =
            (column(Field::VisitorId), column(Field::SessionId))
        {
            out.push(visitor.equals(SqlExpr::param(filter.visitor_id)));
            out.push(session.equals(SqlExpr::param(filter.session_id)));
        }
    }

    out
}

/// Case-insensitive substring match for each search `source` can resolve.
pub(crate) fn search_predicates(filter: &Filter, source: &dyn ColumnSource) -> Vec<SqlExpr> {
    filter
        .search
        .iter()
        .filter(|s| !s.input.is_empty())
        .filter_map(|s| match source.resolve(s.field) {
            Resolved::Column(column) => Some(SqlExpr::binary(
                SqlBinaryOperator::ILike,
                column,
                SqlExpr::param(format!("%{}%", s.input)),
            )),
            Resolved::Skip | Resolved::Unsupported => None,
        })
        .collect()
}
