//! Field expressions and assembly of a single SELECT.

use crate::fields::{columns, Field, FieldCategory, Table};
use crate::sql_ast::{
    Aggregation, Function, Join, OrderItem, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr,
    SqlJoinType, TableRef,
};

use super::predicates::{compile_available, time_predicates, TableScope};
use super::{QueryBuilder, PERIOD_ALIAS, PRIMARY_ALIAS};

fn t(column: &str) -> SqlExpr {
    SqlExpr::column(PRIMARY_ALIAS, column)
}

fn uniq_sessions() -> SqlExpr {
    SqlExpr::func(
        Function::Uniq,
        vec![t(columns::VISITOR_ID), t(columns::SESSION_ID)],
    )
}

/// `coalesce(sum(expr), 0)`. A sum over no rows is NULL on DuckDB.
pub(crate) fn sum_or_zero(expr: SqlExpr) -> SqlExpr {
    SqlExpr::func(
        Function::Coalesce,
        vec![SqlExpr::agg(Aggregation::Sum, expr), SqlExpr::int(0)],
    )
}

fn signed(column: &str) -> SqlExpr {
    sum_or_zero(t(column).times(t(columns::SIGN)))
}

/// `float(numerator) / greatest(denominator, 1)`
pub(crate) fn ratio(numerator: SqlExpr, denominator: SqlExpr) -> SqlExpr {
    SqlExpr::func(Function::ToFloat, vec![numerator]).over(SqlExpr::func(
        Function::Greatest,
        vec![denominator, SqlExpr::int(1)],
    ))
}

/// Neutral value of a field that the current scope can't compute.
pub(crate) fn neutral(field: Field) -> SqlExpr {
    if field.is_text() {
        SqlExpr::text("")
    } else {
        SqlExpr::int(0)
    }
}

impl QueryBuilder {
    /// Joined sub-queries a plain column may be read from, with their alias
    /// and whether they are left joined.
    fn correlated(&self) -> impl Iterator<Item = (&QueryBuilder, &'static str, bool)> {
        let inner = self
            .join
            .iter()
            .chain(self.join_second.iter())
            .map(|child| (child.as_ref(), child.join_alias(), false));
        let left = self
            .left_join
            .iter()
            .map(|child| (child.as_ref(), child.join_alias(), true));
        inner.chain(left)
    }

    fn joined_field(&self, field: Field) -> bool {
        self.correlated().any(|(child, _, _)| child.fields.contains(&field))
    }

    /// Plain column of a field, on the primary table or a joined sub-query.
    pub(crate) fn locate(&self, field: Field) -> Option<SqlExpr> {
        if let Some(column) = field.column(self.table) {
            return Some(t(column));
        }
        self.correlated()
            .find(|(child, _, _)| child.fields.contains(&field))
            .map(|(_, alias, left)| {
                let column = SqlExpr::column(alias, field.name());
                if left && field.is_text() {
                    SqlExpr::func(Function::Coalesce, vec![column, SqlExpr::text("")])
                } else {
                    column
                }
            })
    }

    /// Time bucket of the primary timestamp.
    pub(crate) fn bucket(&self, field: Field) -> SqlExpr {
        let tz = self.filter.tz();
        let func = match field {
            Field::Hour => Function::Hour { tz },
            Field::Minute => Function::Minute { tz },
            Field::Weekday => Function::Weekday {
                tz,
                mode: self.filter.weekday_mode,
            },
            _ => Function::StartOfPeriod {
                period: self.filter.period,
                tz,
                weekday: self.filter.weekday_mode,
            },
        };
        SqlExpr::func(func, vec![t(columns::TIME)])
    }

    fn element_at(&self, values: Field, keys: Field, key: Option<&String>) -> Option<SqlExpr> {
        Some(SqlExpr::func(
            Function::ElementAt,
            vec![
                self.locate(values)?,
                self.locate(keys)?,
                SqlExpr::param(key.map(String::as_str).unwrap_or_default()),
            ],
        ))
    }

    /// Total of `field` over the time range, used as a rate denominator.
    pub(super) fn total(&self, field: Field) -> SqlExpr {
        let mut totals = QueryBuilder::new(Table::Sessions, self.filter.time_only(), vec![field]);
        totals.sample = self.sample;
        SqlExpr::Subquery(Box::new(totals.select(false, false)))
    }

    fn views(&self) -> SqlExpr {
        match self.table {
            Table::Sessions => signed(columns::PAGE_VIEWS),
            Table::Events if self.joined_field(Field::Views) => {
                sum_or_zero(SqlExpr::column("s", Field::Views.name()))
            }
            _ => SqlExpr::agg(Aggregation::Count, SqlExpr::Star),
        }
    }

    fn bounces(&self) -> SqlExpr {
        match self.table {
            Table::Sessions => signed(columns::IS_BOUNCE),
            _ if self.joined_field(Field::Bounces) => SqlExpr::func(
                Function::UniqIf,
                vec![
                    t(columns::VISITOR_ID),
                    t(columns::SESSION_ID),
                    SqlExpr::column("s", Field::Bounces.name()).equals(SqlExpr::int(1)),
                ],
            ),
            _ => SqlExpr::int(0),
        }
    }

    fn custom_metric(&self, agg: Aggregation) -> SqlExpr {
        let key = self
            .filter
            .custom_metric()
            .map(|(key, _)| key.to_string());
        let value = self.element_at(
            Field::EventMetaValuesRaw,
            Field::EventMetaKeysRaw,
            key.as_ref(),
        );
        match value {
            Some(value) => SqlExpr::func(
                Function::ToFloat,
                vec![SqlExpr::func(
                    Function::Coalesce,
                    vec![
                        SqlExpr::agg(
                            agg,
                            SqlExpr::func(Function::ParseNumber { float: true }, vec![value]),
                        ),
                        SqlExpr::int(0),
                    ],
                )],
            ),
            None => SqlExpr::int(0),
        }
    }

    /// Expression of an aggregate or rate field.
    fn aggregate(&self, field: Field) -> SqlExpr {
        let visitors = || SqlExpr::func(Function::Uniq, vec![t(columns::VISITOR_ID)]);
        match field {
            Field::Count => SqlExpr::agg(Aggregation::Count, SqlExpr::Star),
            Field::Visitors | Field::VisitorsRaw => visitors(),
            Field::Sessions | Field::Entries | Field::Exits => uniq_sessions(),
            Field::Views => self.views(),
            Field::Bounces => self.bounces(),
            Field::EventTimeSpent => SqlExpr::func(
                Function::ToInt,
                vec![SqlExpr::func(
                    Function::Coalesce,
                    vec![
                        SqlExpr::agg(Aggregation::Avg, t(columns::DURATION_SECONDS)),
                        SqlExpr::int(0),
                    ],
                )],
            ),
            Field::EventDurationSeconds => sum_or_zero(t(columns::DURATION_SECONDS)),
            Field::SessionDurationAvg if self.table == Table::Sessions => SqlExpr::func(
                Function::ToInt,
                vec![SqlExpr::func(
                    Function::Coalesce,
                    vec![
                        signed(columns::DURATION_SECONDS).over(SqlExpr::func(
                            Function::Greatest,
                            vec![
                                SqlExpr::agg(Aggregation::Sum, t(columns::SIGN)),
                                SqlExpr::int(1),
                            ],
                        )),
                        SqlExpr::int(0),
                    ],
                )],
            ),
            Field::EventMetaKeys => match self.locate(Field::EventMetaKeysRaw) {
                Some(keys) => SqlExpr::func(Function::DistinctFlatten, vec![keys]),
                None => SqlExpr::int(0),
            },
            Field::EventMetaCustomMetricAvg => self.custom_metric(Aggregation::Avg),
            Field::EventMetaCustomMetricTotal => self.custom_metric(Aggregation::Sum),
            Field::ReferrerIcon => {
                SqlExpr::agg(Aggregation::Any, t(columns::REFERRER_ICON))
            }
            Field::AnyReferrer => match self.locate(Field::Referrer) {
                Some(referrer) => SqlExpr::agg(Aggregation::Any, referrer),
                None => neutral(field),
            },
            Field::RelativeVisitors | Field::Cr => ratio(visitors(), self.total(Field::Visitors)),
            Field::RelativeViews => ratio(self.views(), self.total(Field::Views)),
            Field::BounceRate => ratio(self.bounces(), uniq_sessions()),
            Field::CrPeriod if self.join_third.is_some() => ratio(
                visitors(),
                SqlExpr::agg(
                    Aggregation::Max,
                    SqlExpr::column(PERIOD_ALIAS, Field::VisitorsRaw.name()),
                ),
            ),
            Field::EntryRate | Field::ExitRate => ratio(uniq_sessions(), self.total(Field::Sessions)),
            _ => neutral(field),
        }
    }

    /// SELECT expression of a non-marker field.
    pub(crate) fn select_expr(&self, field: Field) -> SqlExpr {
        let expr = match field {
            Field::Day | Field::Hour | Field::Minute | Field::Weekday => Some(self.bucket(field)),
            Field::Platform => Some(SqlExpr::Case {
                branches: vec![
                    (
                        t(columns::DESKTOP).equals(SqlExpr::int(1)),
                        SqlExpr::text("desktop"),
                    ),
                    (
                        t(columns::MOBILE).equals(SqlExpr::int(1)),
                        SqlExpr::text("mobile"),
                    ),
                ],
                else_expr: Box::new(SqlExpr::text("unknown")),
            }),
            Field::TagKey => self
                .locate(Field::TagKeysRaw)
                .map(|keys| SqlExpr::func(Function::ArrayJoin, vec![keys])),
            Field::TagValue => self.element_at(
                Field::TagValuesRaw,
                Field::TagKeysRaw,
                self.filter.tag.first(),
            ),
            Field::EventMetaValues => self.element_at(
                Field::EventMetaValuesRaw,
                Field::EventMetaKeysRaw,
                self.filter.event_meta_key.first(),
            ),
            Field::EventMeta => self
                .locate(Field::EventMetaKeysRaw)
                .zip(self.locate(Field::EventMetaValuesRaw))
                .map(|(keys, values)| SqlExpr::func(Function::MapFromArrays, vec![keys, values])),
            f if f.is_aggregate() || f == Field::VisitorsRaw => Some(self.aggregate(f)),
            f => self.locate(f),
        };
        expr.unwrap_or_else(|| neutral(field))
    }

    fn selects(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// GROUP BY expressions: qualified columns for plain fields, aliases otherwise.
    pub(crate) fn group_exprs(&self) -> Vec<SqlExpr> {
        let mut exprs = Vec::new();
        for field in &self.group_by {
            match field {
                Field::EventMeta => {
                    exprs.extend(self.locate(Field::EventMetaKeysRaw));
                    exprs.extend(self.locate(Field::EventMetaValuesRaw));
                }
                f if f.category() == FieldCategory::TimeBucket
                    || matches!(
                        f,
                        Field::Platform | Field::TagKey | Field::TagValue | Field::EventMetaValues
                    ) =>
                {
                    exprs.push(SqlExpr::Alias(f.name().to_string()));
                }
                f => match self.locate(*f) {
                    Some(column) => exprs.push(column),
                    None => exprs.push(SqlExpr::Alias(f.name().to_string())),
                },
            }
        }
        exprs
    }

    /// ORDER BY items: the filter's sort when it names selected fields,
    /// the requested order otherwise.
    pub(crate) fn order_items(&self) -> Vec<OrderItem> {
        let alias = |field: Field| SqlExpr::Alias(field.name().to_string());
        let sorted: Vec<OrderItem> = self
            .filter
            .sort
            .iter()
            .filter(|sort| self.selects(sort.field))
            .map(|sort| OrderItem {
                expr: alias(sort.field),
                direction: sort.direction,
            })
            .collect();
        if !sorted.is_empty() {
            return sorted;
        }
        self.order_by
            .iter()
            .filter(|field| self.selects(**field))
            .map(|field| OrderItem {
                expr: alias(*field),
                direction: field.default_direction(),
            })
            .collect()
    }

    fn where_exprs(&self) -> Vec<SqlExpr> {
        let mut exprs = time_predicates(&self.filter, PRIMARY_ALIAS, columns::TIME);

        let scope = TableScope {
            table: self.table,
            alias: PRIMARY_ALIAS,
            event_alias: self
                .left_join
                .as_ref()
                .filter(|_| self.include_event_filter && self.table != Table::Events)
                .map(|child| child.join_alias()),
        };
        exprs.extend(compile_available(&self.filter, &scope));

        if self.table == Table::Events {
            if let Some((key, _)) = self.filter.custom_metric() {
                exprs.push(SqlExpr::func(
                    Function::ArrayHas,
                    vec![t(columns::EVENT_META_KEYS), SqlExpr::param(key)],
                ));
            }
        }

        for search in self.search.iter().filter(|s| !s.input.is_empty()) {
            if let Some(column) = self.locate(search.field) {
                exprs.push(SqlExpr::binary(
                    SqlBinaryOperator::ILike,
                    column,
                    SqlExpr::param(format!("%{}%", search.input)),
                ));
            }
        }
        exprs
    }

    fn joins(&self, supports_final: bool) -> Vec<Join> {
        let correlate = |child: &QueryBuilder, join_type: SqlJoinType| {
            let alias = child.join_alias();
            Join {
                join_type,
                table: TableRef::subquery(child.select(supports_final, true), alias),
                on: [columns::VISITOR_ID, columns::SESSION_ID]
                    .into_iter()
                    .map(|column| SqlExpr::column(alias, column).equals(t(column)))
                    .collect(),
            }
        };

        let mut joins = Vec::new();
        if let Some(child) = &self.join {
            joins.push(correlate(child.as_ref(), SqlJoinType::Inner));
        }
        if let Some(child) = &self.join_second {
            joins.push(correlate(child.as_ref(), SqlJoinType::Inner));
        }
        if let Some(child) = &self.left_join {
            joins.push(correlate(child.as_ref(), SqlJoinType::Left));
        }
        if let Some(child) = &self.join_third {
            if let Some(bucket) = child.group_by.first() {
                joins.push(Join {
                    join_type: SqlJoinType::Inner,
                    table: TableRef::subquery(child.select(supports_final, true), PERIOD_ALIAS),
                    on: vec![self
                        .bucket(*bucket)
                        .equals(SqlExpr::column(PERIOD_ALIAS, bucket.name()))],
                });
            }
        }
        joins
    }

    /// The live SELECT. `paged` adds ORDER BY, LIMIT and OFFSET.
    pub(crate) fn select(&self, supports_final: bool, paged: bool) -> SelectQuery {
        let final_read = self.final_read && supports_final;
        let mut from = TableRef::named(self.table.name(), PRIMARY_ALIAS);
        from.final_read = final_read;
        from.sample = self.sample;

        let select = self
            .fields
            .iter()
            .filter(|f| f.category() != FieldCategory::Marker)
            .map(|f| SelectItem::new(self.select_expr(*f), f.name()))
            .collect();

        let having = if self.table.is_sign_versioned() && !final_read && !self.group_by.is_empty() {
            vec![SqlExpr::agg(Aggregation::Sum, t(columns::SIGN)).greater(SqlExpr::int(0))]
        } else {
            Vec::new()
        };

        let mut query = SelectQuery {
            select,
            from,
            joins: self.joins(supports_final),
            filters: self.where_exprs(),
            group_by: self.group_exprs(),
            having,
            ..SelectQuery::default()
        };
        if paged {
            query.order_by = self.order_items();
            query.limit = u64::try_from(self.limit).ok().filter(|l| *l > 0);
            query.offset = u64::try_from(self.offset).ok().filter(|o| *o > 0);
        }
        query
    }
}
