//! Merging pre-aggregated imported history with live rows.
//!
//! When the filter carries an imported sub-range, the live query covers the
//! rest of the period and both are combined with `UNION ALL`. The outer query
//! sums counts, recomputes rates from the merged counts and applies
//! ordering and paging.

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use tracing::debug;

use crate::fields::{columns, Field, FieldCategory, ImportedTable};
use crate::sql_ast::{
    Aggregation, Function, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr, SqlValue,
    TableRef, TableSource,
};

use super::columns::{neutral, ratio, sum_or_zero};
use super::predicates::{compile_predicates, ImportedScope};
use super::{ImportedSpec, QueryBuilder, IMPORTED_ALIAS, UNION_ALIAS};

fn i(column: &str) -> SqlExpr {
    SqlExpr::column(IMPORTED_ALIAS, column)
}

fn u(field: Field) -> SqlExpr {
    SqlExpr::column(UNION_ALIAS, field.name())
}

/// `client_id = ?` and the imported date range.
pub(crate) fn imported_range_predicates(
    client_id: i64,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Vec<SqlExpr> {
    let date = || i(columns::IMPORTED_DATE);
    let bound = |day: NaiveDateTime| {
        SqlExpr::func(Function::ToDate, vec![SqlExpr::param(SqlValue::date(day))])
    };
    vec![
        i(columns::CLIENT_ID).equals(SqlExpr::param(client_id)),
        date().at_least(bound(from)),
        date().at_most(bound(to)),
    ]
}

/// Sum of an imported column over the imported range.
pub(crate) fn imported_total(
    table: ImportedTable,
    column: &str,
    client_id: i64,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> SelectQuery {
    SelectQuery {
        select: vec![SelectItem::new(
            SqlExpr::agg(Aggregation::Sum, i(column)),
            column,
        )],
        from: TableRef::named(table.name(), IMPORTED_ALIAS),
        filters: imported_range_predicates(client_id, from, to),
        ..SelectQuery::default()
    }
}

struct Imported<'a> {
    q: &'a QueryBuilder,
    spec: &'a ImportedSpec,
    from: NaiveDateTime,
    to: NaiveDateTime,
}

impl Imported<'_> {
    fn group_expr(&self, field: Field) -> Option<SqlExpr> {
        let column = i(field.imported_column(self.spec.table)?);
        Some(if field == Field::Day {
            SqlExpr::func(
                Function::StartOfPeriod {
                    period: self.q.filter.period,
                    tz: Tz::UTC,
                    weekday: self.q.filter.weekday_mode,
                },
                vec![column],
            )
        } else {
            column
        })
    }

    fn select_expr(&self, field: Field) -> SqlExpr {
        if self.q.group_by.contains(&field) {
            if let Some(expr) = self.group_expr(field) {
                return expr;
            }
        }
        match field.imported_column(self.spec.table) {
            Some(column) if field.is_summable() && self.spec.fields.contains(&field) => {
                SqlExpr::agg(Aggregation::Sum, i(column))
            }
            _ => neutral(field),
        }
    }

    fn select(&self, predicates: Vec<SqlExpr>, search: Vec<SqlExpr>) -> SelectQuery {
        let mut filters =
            imported_range_predicates(self.q.filter.client_id, self.from, self.to);
        filters.extend(predicates);
        filters.extend(search);

        let group_by = self
            .q
            .group_by
            .iter()
            .map(|field| match field {
                Field::Day => SqlExpr::Alias(field.name().to_string()),
                f => self.group_expr(*f).unwrap_or_else(|| neutral(*f)),
            })
            .collect();

        SelectQuery {
            select: selected(self.q)
                .map(|field| SelectItem::new(self.select_expr(field), field.name()))
                .collect(),
            from: TableRef::named(self.spec.table.name(), IMPORTED_ALIAS),
            filters,
            group_by,
            ..SelectQuery::default()
        }
    }

    /// Live total plus imported total, the denominator of merged rates.
    fn merged_total(&self, field: Field) -> SqlExpr {
        let live = self.q.total(field);
        let Some(column) = field.imported_column(ImportedTable::Visitors) else {
            return live;
        };
        let imported = SqlExpr::Subquery(Box::new(imported_total(
            ImportedTable::Visitors,
            column,
            self.q.filter.client_id,
            self.from,
            self.to,
        )));
        live.plus(SqlExpr::func(
            Function::Coalesce,
            vec![imported, SqlExpr::int(0)],
        ))
    }

    fn outer_expr(&self, field: Field) -> SqlExpr {
        let sum = |f: Field| sum_or_zero(u(f));
        let has = |f: Field| self.q.fields.contains(&f);

        if self.q.group_by.contains(&field) {
            return u(field);
        }
        match field {
            f if f.is_summable() => sum(f),
            Field::BounceRate if has(Field::Bounces) && has(Field::Sessions) => {
                ratio(sum(Field::Bounces), sum(Field::Sessions))
            }
            Field::RelativeVisitors | Field::Cr if has(Field::Visitors) => {
                ratio(sum(Field::Visitors), self.merged_total(Field::Visitors))
            }
            Field::RelativeViews if has(Field::Views) => {
                ratio(sum(Field::Views), self.merged_total(Field::Views))
            }
            Field::EntryRate if has(Field::Entries) => {
                ratio(sum(Field::Entries), self.merged_total(Field::Sessions))
            }
            Field::ExitRate if has(Field::Exits) => {
                ratio(sum(Field::Exits), self.merged_total(Field::Sessions))
            }
            f => SqlExpr::agg(Aggregation::Max, u(f)),
        }
    }
}

fn selected(q: &QueryBuilder) -> impl Iterator<Item = Field> + '_ {
    q.fields
        .iter()
        .copied()
        .filter(|f| f.category() != FieldCategory::Marker)
}

/// The merged statement, or `None` when the query must read live rows only.
pub(super) fn union_query(q: &QueryBuilder, supports_final: bool) -> Option<SelectQuery> {
    let spec = q.imported.as_ref().filter(|spec| !spec.fields.is_empty())?;
    let (from, to) = q.filter.imported_range()?;

    if let Some(field) = q
        .group_by
        .iter()
        .find(|field| field.imported_column(spec.table).is_none())
    {
        debug!(
            table = spec.table.name(),
            group = field.name(),
            "grouping not stored in imported table, reading live rows only"
        );
        return None;
    }

    let scope = ImportedScope {
        table: spec.table,
        alias: IMPORTED_ALIAS,
    };
    let Some(predicates) = compile_predicates(&q.filter, &scope) else {
        debug!(
            table = spec.table.name(),
            "filter not expressible on imported table, reading live rows only"
        );
        return None;
    };

    let mut search = Vec::new();
    for s in q.search.iter().filter(|s| !s.input.is_empty()) {
        let column = s.field.imported_column(spec.table)?;
        search.push(SqlExpr::binary(
            SqlBinaryOperator::ILike,
            i(column),
            SqlExpr::param(format!("%{}%", s.input)),
        ));
    }

    let imported = Imported { q, spec, from, to };
    let live = q.select(supports_final, false);
    let history = imported.select(predicates, search);

    let from_union = TableRef {
        source: TableSource::UnionAll(vec![live, history]),
        alias: Some(UNION_ALIAS.to_string()),
        ..TableRef::default()
    };

    debug!(
        table = spec.table.name(),
        from = %from.date(),
        to = %to.date(),
        "merging imported rows"
    );

    Some(SelectQuery {
        select: selected(q)
            .map(|field| SelectItem::new(imported.outer_expr(field), field.name()))
            .collect(),
        from: from_union,
        group_by: q.group_by.iter().map(|field| u(*field)).collect(),
        order_by: q.order_items(),
        limit: u64::try_from(q.limit).ok().filter(|l| *l > 0),
        offset: u64::try_from(q.offset).ok().filter(|o| *o > 0),
        ..SelectQuery::default()
    })
}
