//! Metrics that need more than one aggregation level: time on page,
//! session duration, event duration, period over period growth.

use chrono::{Duration, NaiveDateTime, NaiveTime, Utc};

use crate::dialect::Dialect;
use crate::fields::{columns, Field, ImportedTable, Table};
use crate::filter::Filter;
use crate::query_builder::{
    compile_available, imported_total, render, search_predicates, time_predicates,
    ProjectedScope, QueryBuilder, TableScope,
};
use crate::sql_ast::{
    Aggregation, Function, Join, SelectItem, SelectQuery, SqlExpr, SqlJoinType, Statement,
    TableRef,
};

const PAGE_VIEW_ALIAS: &str = "v";
const WINDOW_ALIAS: &str = "p";
const SESSION_ALIAS: &str = "s";
const EVENT_ALIAS: &str = "ev";
const DURATION_ALIAS: &str = "d";
const TIME_ON_PAGE: &str = "time_on_page";

/// Page view columns carried out of the window query so the outer query can filter on them.
const PROJECTED: &[Field] = &[
    Field::VisitorId,
    Field::SessionId,
    Field::Hostname,
    Field::Path,
    Field::Language,
    Field::Country,
    Field::Region,
    Field::City,
    Field::Referrer,
    Field::ReferrerName,
    Field::Channel,
    Field::Os,
    Field::OsVersion,
    Field::Browser,
    Field::BrowserVersion,
    Field::ScreenClass,
    Field::UtmSource,
    Field::UtmMedium,
    Field::UtmCampaign,
    Field::UtmContent,
    Field::UtmTerm,
    Field::Desktop,
    Field::Mobile,
    Field::TagKeysRaw,
    Field::TagValuesRaw,
];

/// Relative change from `previous` to `current`.
///
/// Zero when both are zero, one when only `previous` is.
pub fn growth(current: f64, previous: f64) -> f64 {
    if current == 0.0 && previous == 0.0 {
        0.0
    } else if previous == 0.0 {
        1.0
    } else {
        (current - previous) / previous
    }
}

/// Shifts a validated filter to the period preceding it.
pub fn previous_period(filter: &mut Filter) {
    previous_period_at(filter, Utc::now().naive_utc());
}

/// [`previous_period`] with an explicit current time.
///
/// A single day is compared to the same weekday one week earlier. For today
/// that comparison ends at the current time of day a week ago. Longer ranges
/// are compared to the range of equal length ending the day before `from`.
pub fn previous_period_at(filter: &mut Filter, now: NaiveDateTime) {
    let (Some(mut from), Some(mut to)) = (filter.from, filter.to) else {
        return;
    };
    if let Some(imported_from) = filter.imported_from {
        if imported_from < from {
            from = imported_from;
        }
    }

    let week = Duration::days(7);
    let day = Duration::days(1);
    let today = now.date().and_time(NaiveTime::default());

    if from == to {
        if to == today {
            from -= week;
            to = now - week;
            filter.include_time = true;
        } else {
            from -= week;
            to -= week;
        }
    } else {
        let span = to - from;
        if span >= day {
            to = from - day;
            from = to - span;
        } else {
            from -= day;
            to -= day;
        }
    }

    filter.from = Some(from);
    filter.to = Some(to);

    if filter.imported_until.is_some() {
        filter.clear_imported_range();
        filter.validate_at(now);
    }
}

/// Duration of a page view, capped when a maximum is configured.
pub fn time_on_page_expr(filter: &Filter) -> SqlExpr {
    let duration = SqlExpr::column(PAGE_VIEW_ALIAS, columns::DURATION_SECONDS);
    if filter.max_time_on_page_seconds > 0 {
        SqlExpr::func(
            Function::Least,
            vec![duration, SqlExpr::int(filter.max_time_on_page_seconds)],
        )
    } else {
        duration
    }
}

fn correlate(child: &QueryBuilder, alias: &str, supports_final: bool) -> Join {
    Join {
        join_type: SqlJoinType::Inner,
        table: TableRef::subquery(child.select(supports_final, false), alias),
        on: [columns::VISITOR_ID, columns::SESSION_ID]
            .into_iter()
            .map(|column| {
                SqlExpr::column(alias, column).equals(SqlExpr::column(PAGE_VIEW_ALIAS, column))
            })
            .collect(),
    }
}

/// Distinct visitor and session pairs of `table` matching `filter`.
fn session_keys(table: Table, filter: Filter) -> QueryBuilder {
    let fields = vec![Field::VisitorId, Field::SessionId];
    let mut child = QueryBuilder::new(table, filter, fields.clone());
    child.group_by = fields;
    child
}

/// Page views with the time spent on each, read from the next page view of the session.
fn time_on_page_window(filter: &Filter, supports_final: bool) -> SelectQuery {
    let v = |column: &str| SqlExpr::column(PAGE_VIEW_ALIAS, column);

    let window = SqlExpr::Window {
        expr: Box::new(SqlExpr::func(
            Function::NthValue,
            vec![time_on_page_expr(filter), SqlExpr::int(2)],
        )),
        partition_by: vec![v(columns::VISITOR_ID), v(columns::SESSION_ID)],
        order_by: vec![v(columns::TIME)],
        following: 1,
    };

    let mut select = vec![SelectItem::new(window, TIME_ON_PAGE)];
    select.extend(PROJECTED.iter().filter_map(|field| {
        field
            .column(Table::PageViews)
            .map(|column| SelectItem::new(v(column), field.name()))
    }));

    let mut joins = Vec::new();
    if !filter.entry_path.is_empty() || !filter.exit_path.is_empty() {
        let sessions = session_keys(Table::Sessions, filter.for_session_join());
        joins.push(correlate(&sessions, SESSION_ALIAS, supports_final));
    }
    if !filter.event_name.is_empty() || !filter.event_meta.is_empty() {
        let events = session_keys(Table::Events, filter.for_event_join());
        joins.push(correlate(&events, EVENT_ALIAS, supports_final));
    }

    let mut from = TableRef::named(Table::PageViews.name(), PAGE_VIEW_ALIAS);
    from.sample = filter.sample;

    SelectQuery {
        select,
        from,
        joins,
        filters: time_predicates(filter, PAGE_VIEW_ALIAS, columns::TIME),
        ..SelectQuery::default()
    }
}

/// Positive time on page plus every page view predicate and search of the filter.
fn time_on_page_filters(filter: &Filter) -> Vec<SqlExpr> {
    let scope = ProjectedScope {
        alias: WINDOW_ALIAS,
        fields: PROJECTED.to_vec(),
    };
    let mut filters =
        vec![SqlExpr::column(WINDOW_ALIAS, TIME_ON_PAGE).greater(SqlExpr::int(0))];
    filters.extend(compile_available(filter, &scope));
    filters.extend(search_predicates(filter, &scope));
    filters
}

/// Sum of the time spent on pages matching the filter.
pub fn total_time_on_page_query(filter: &Filter, dialect: &dyn Dialect) -> Statement {
    let query = SelectQuery {
        select: vec![SelectItem::new(
            SqlExpr::agg(
                Aggregation::Sum,
                SqlExpr::column(WINDOW_ALIAS, TIME_ON_PAGE),
            ),
            Field::EventTimeSpent.name(),
        )],
        from: TableRef::subquery(
            time_on_page_window(filter, dialect.supports_final()),
            WINDOW_ALIAS,
        ),
        filters: time_on_page_filters(filter),
        ..SelectQuery::default()
    };
    render(&query, dialect)
}

/// Average time spent per page, for the given paths.
pub fn avg_time_on_page_query(
    filter: &Filter,
    paths: &[String],
    dialect: &dyn Dialect,
) -> Statement {
    let path = || SqlExpr::column(WINDOW_ALIAS, Field::Path.name());
    let mut filters = time_on_page_filters(filter);
    filters.extend(SqlExpr::or_all(
        paths
            .iter()
            .map(|p| path().equals(SqlExpr::param(p.as_str())))
            .collect(),
    ));

    let average = SqlExpr::func(
        Function::ToInt,
        vec![SqlExpr::func(
            Function::Coalesce,
            vec![
                SqlExpr::agg(
                    Aggregation::Avg,
                    SqlExpr::column(WINDOW_ALIAS, TIME_ON_PAGE),
                ),
                SqlExpr::int(0),
            ],
        )],
    );

    let query = SelectQuery {
        select: vec![
            SelectItem::new(path(), Field::Path.name()),
            SelectItem::new(average, Field::EventTimeSpent.name()),
        ],
        from: TableRef::subquery(
            time_on_page_window(filter, dialect.supports_final()),
            WINDOW_ALIAS,
        ),
        filters,
        group_by: vec![path()],
        ..SelectQuery::default()
    };
    render(&query, dialect)
}

/// Sum of the net duration of all live sessions matching the filter.
///
/// Path and tag predicates restrict sessions to those with a matching page view.
pub fn total_session_duration_query(filter: &Filter, dialect: &dyn Dialect) -> Statement {
    let t = |column: &str| SqlExpr::column("t", column);
    let supports_final = dialect.supports_final();

    let mut filters = time_predicates(filter, "t", columns::TIME);
    filters.extend(compile_available(filter, &TableScope::new(Table::Sessions, "t")));

    let mut joins = Vec::new();
    let narrows_to_pages = !filter.path.is_empty()
        || !filter.path_pattern.is_empty()
        || !filter.tag.is_empty()
        || !filter.tags.is_empty();
    if narrows_to_pages {
        let pages = session_keys(Table::PageViews, filter.for_page_view_join());
        joins.push(Join {
            join_type: SqlJoinType::Inner,
            table: TableRef::subquery(pages.select(supports_final, false), PAGE_VIEW_ALIAS),
            on: [columns::VISITOR_ID, columns::SESSION_ID]
                .into_iter()
                .map(|column| SqlExpr::column(PAGE_VIEW_ALIAS, column).equals(t(column)))
                .collect(),
        });
    }

    let mut from = TableRef::named(Table::Sessions.name(), "t");
    from.sample = filter.sample;

    let per_session = SelectQuery {
        select: vec![SelectItem::new(
            SqlExpr::agg(
                Aggregation::Sum,
                t(columns::DURATION_SECONDS).times(t(columns::SIGN)),
            ),
            columns::DURATION_SECONDS,
        )],
        from,
        joins,
        filters,
        group_by: vec![t(columns::VISITOR_ID), t(columns::SESSION_ID)],
        having: vec![SqlExpr::agg(Aggregation::Sum, t(columns::SIGN)).greater(SqlExpr::int(0))],
        ..SelectQuery::default()
    };

    let query = SelectQuery {
        select: vec![SelectItem::new(
            SqlExpr::agg(
                Aggregation::Sum,
                SqlExpr::column(DURATION_ALIAS, columns::DURATION_SECONDS),
            ),
            columns::DURATION_SECONDS,
        )],
        from: TableRef::subquery(per_session, DURATION_ALIAS),
        ..SelectQuery::default()
    };
    render(&query, dialect)
}

/// Session duration stored for the imported part of the period, if there is one.
pub fn total_imported_session_duration_query(
    filter: &Filter,
    dialect: &dyn Dialect,
) -> Option<Statement> {
    let (from, to) = filter.imported_range()?;
    let query = imported_total(
        ImportedTable::Visitors,
        columns::IMPORTED_SESSION_DURATION,
        filter.client_id,
        from,
        to,
    );
    Some(render(&query, dialect))
}

/// Sum of the duration of events matching the filter.
pub fn total_event_duration_query(filter: &Filter, dialect: &dyn Dialect) -> Statement {
    let mut events = QueryBuilder::new(
        Table::Events,
        filter.clone(),
        vec![Field::EventDurationSeconds],
    );
    events.search = filter.search.clone();
    render(&events.select(dialect.supports_final(), false), dialect)
}
