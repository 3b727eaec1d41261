use serde::Deserialize;

use crate::error::Result;
use crate::fields::{columns, Field, Table};
use crate::filter::{Direction, Filter};
use crate::query_builder::{render, time_predicates};
use crate::sql_ast::{
    Function, OrderItem, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr, TableRef,
};

use super::Analyzer;

const TABLE_ALIAS: &str = "t";
const OPTIONS_ALIAS: &str = "o";
const VALUE: &str = "value";

#[derive(Deserialize)]
struct OptionRow {
    value: String,
}

/// Distinct, non-empty values of one dimension within the client and time range.
///
/// Dimension predicates of the filter are ignored. Only a search on the
/// listed field narrows the values.
#[derive(Debug, Clone, Copy)]
pub struct FilterOptions<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> FilterOptions<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    pub async fn hostnames(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Hostname, Table::Sessions).await
    }

    pub async fn pages(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Path, Table::PageViews).await
    }

    pub async fn referrers(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Referrer, Table::Sessions).await
    }

    pub async fn referrer_names(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::ReferrerName, Table::Sessions).await
    }

    pub async fn channels(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Channel, Table::Sessions).await
    }

    pub async fn utm_sources(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::UtmSource, Table::Sessions).await
    }

    pub async fn utm_mediums(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::UtmMedium, Table::Sessions).await
    }

    pub async fn utm_campaigns(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::UtmCampaign, Table::Sessions).await
    }

    pub async fn utm_contents(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::UtmContent, Table::Sessions).await
    }

    pub async fn utm_terms(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::UtmTerm, Table::Sessions).await
    }

    pub async fn countries(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Country, Table::Sessions).await
    }

    pub async fn regions(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Region, Table::Sessions).await
    }

    pub async fn cities(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::City, Table::Sessions).await
    }

    pub async fn languages(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::Language, Table::Sessions).await
    }

    pub async fn event_names(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        self.column(filter, Field::EventName, Table::Events).await
    }

    /// Metadata keys of events. Empty unless the filter has a time range or event names.
    pub async fn event_metadata_keys(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        let filter = self.filter(filter);
        if !has_range(&filter) && filter.event_name.is_empty() {
            return Ok(Vec::new());
        }
        let value = SqlExpr::func(Function::ArrayJoin, vec![t(columns::EVENT_META_KEYS)]);
        let narrowing = event_names(&filter);
        self.distinct(&filter, Field::EventMetaKeysRaw, Table::Events, value, narrowing)
            .await
    }

    /// Metadata values of events, restricted to the first metadata key of the filter if any.
    ///
    /// Empty unless the filter has a time range, event names or a metadata key.
    pub async fn event_metadata_values(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        let filter = self.filter(filter);
        let key = filter.event_meta_key.first().cloned();
        if !has_range(&filter) && filter.event_name.is_empty() && key.is_none() {
            return Ok(Vec::new());
        }

        let mut narrowing = event_names(&filter);
        let value = match key {
            Some(key) => {
                narrowing.push(SqlExpr::func(
                    Function::ArrayHas,
                    vec![t(columns::EVENT_META_KEYS), SqlExpr::param(key.as_str())],
                ));
                SqlExpr::func(
                    Function::ElementAt,
                    vec![
                        t(columns::EVENT_META_VALUES),
                        t(columns::EVENT_META_KEYS),
                        SqlExpr::param(key.as_str()),
                    ],
                )
            }
            None => SqlExpr::func(Function::ArrayJoin, vec![t(columns::EVENT_META_VALUES)]),
        };
        self.distinct(&filter, Field::EventMetaValues, Table::Events, value, narrowing)
            .await
    }

    /// Tag keys of page views. Empty unless the filter has a time range.
    pub async fn tag_keys(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        let filter = self.filter(filter);
        if !has_range(&filter) {
            return Ok(Vec::new());
        }
        let value = SqlExpr::func(Function::ArrayJoin, vec![t(columns::TAG_KEYS)]);
        self.distinct(&filter, Field::TagKey, Table::PageViews, value, Vec::new())
            .await
    }

    /// Values of the first tag key of the filter. Empty without a tag key.
    pub async fn tag_values(&self, filter: Option<&Filter>) -> Result<Vec<String>> {
        let filter = self.filter(filter);
        let Some(key) = filter.tag.first().cloned() else {
            return Ok(Vec::new());
        };
        let value = SqlExpr::func(
            Function::ElementAt,
            vec![
                t(columns::TAG_VALUES),
                t(columns::TAG_KEYS),
                SqlExpr::param(key.as_str()),
            ],
        );
        let narrowing = vec![SqlExpr::func(
            Function::ArrayHas,
            vec![t(columns::TAG_KEYS), SqlExpr::param(key.as_str())],
        )];
        self.distinct(&filter, Field::TagValue, Table::PageViews, value, narrowing)
            .await
    }

    /// Options cover the whole range, imported days included.
    fn filter(&self, filter: Option<&Filter>) -> Filter {
        match filter {
            Some(filter) => {
                let mut filter = filter.clone();
                filter.imported_until = None;
                self.analyzer.get_filter(Some(&filter))
            }
            None => self.analyzer.get_filter(None),
        }
    }

    async fn column(
        &self,
        filter: Option<&Filter>,
        field: Field,
        table: Table,
    ) -> Result<Vec<String>> {
        let filter = self.filter(filter);
        let Some(column) = field.column(table) else {
            return Ok(Vec::new());
        };
        self.distinct(&filter, field, table, t(column), Vec::new()).await
    }

    async fn distinct(
        &self,
        filter: &Filter,
        field: Field,
        table: Table,
        value: SqlExpr,
        narrowing: Vec<SqlExpr>,
    ) -> Result<Vec<String>> {
        let query = options_query(filter, field, table, value, narrowing);
        let statement = render(&query, self.analyzer.dialect());
        let rows: Vec<OptionRow> = self.analyzer.fetch(filter, &statement).await?;
        Ok(rows.into_iter().map(|row| row.value).collect())
    }
}

fn t(column: &str) -> SqlExpr {
    SqlExpr::column(TABLE_ALIAS, column)
}

fn has_range(filter: &Filter) -> bool {
    filter.from.is_some() || filter.to.is_some()
}

fn event_names(filter: &Filter) -> Vec<SqlExpr> {
    let names: Vec<SqlExpr> = filter
        .event_name
        .iter()
        .map(|name| t(Field::EventName.name()).equals(SqlExpr::param(name.as_str())))
        .collect();
    SqlExpr::or_all(names).into_iter().collect()
}

/// `SELECT o.value FROM (SELECT <value> AS value FROM <table> t WHERE ...) o
/// WHERE o.value != '' GROUP BY o.value ORDER BY value`
fn options_query(
    filter: &Filter,
    field: Field,
    table: Table,
    value: SqlExpr,
    narrowing: Vec<SqlExpr>,
) -> SelectQuery {
    let mut inner_filters = time_predicates(filter, TABLE_ALIAS, columns::TIME);
    inner_filters.extend(narrowing);
    let inner = SelectQuery {
        select: vec![SelectItem::new(value, VALUE)],
        from: TableRef::named(table.name(), TABLE_ALIAS),
        filters: inner_filters,
        ..SelectQuery::default()
    };

    let outer_value = SqlExpr::column(OPTIONS_ALIAS, VALUE);
    let mut filters = vec![outer_value.clone().not_equals(SqlExpr::text(""))];
    filters.extend(
        filter
            .search
            .iter()
            .filter(|search| search.field == field && !search.input.is_empty())
            .map(|search| {
                SqlExpr::binary(
                    SqlBinaryOperator::ILike,
                    outer_value.clone(),
                    SqlExpr::param(format!("%{}%", search.input)),
                )
            }),
    );

    SelectQuery {
        select: vec![SelectItem::new(outer_value.clone(), VALUE)],
        from: TableRef::subquery(inner, OPTIONS_ALIAS),
        filters,
        group_by: vec![outer_value],
        order_by: vec![OrderItem {
            expr: SqlExpr::Alias(VALUE.to_string()),
            direction: Direction::Asc,
        }],
        ..SelectQuery::default()
    }
}
