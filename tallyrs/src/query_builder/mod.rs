//! SQL generation for analytics queries.
//!
//! A [`QueryBuilder`] is a tree: the primary fact table plus up to three
//! joined sub-queries, each of which is a builder itself. Planning
//! (`tables`) decides the shape of the tree, `columns` turns fields into
//! expressions, `predicates` compiles the filter and `imported` merges
//! pre-aggregated history into the result.

use tracing::debug;

use crate::dialect::Dialect;
use crate::fields::{Field, ImportedTable, Table};
use crate::filter::{Filter, Search};
use crate::sql_ast::{SelectQuery, SqlRenderer, Statement};

mod columns;
mod imported;
mod predicates;
mod tables;

pub(crate) use imported::imported_total;
pub(crate) use predicates::{
    compile_available, search_predicates, time_predicates, ProjectedScope, TableScope,
};

/// Alias of the table a builder reads from.
pub(crate) const PRIMARY_ALIAS: &str = "t";
/// Alias of the unique-visitors-per-bucket join.
pub(crate) const PERIOD_ALIAS: &str = "uvp";
/// Alias of the UNION ALL of live and imported rows.
pub(crate) const UNION_ALIAS: &str = "u";
/// Alias of an imported table.
pub(crate) const IMPORTED_ALIAS: &str = "i";

/// Fields, grouping and ordering requested by an analyzer method.
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub fields: Vec<Field>,
    pub group_by: Vec<Field>,
    pub order_by: Vec<Field>,
    pub imported: Option<ImportedSpec>,
}

/// Fields read from an imported table for the part of the period before the import cutoff.
#[derive(Debug, Clone)]
pub struct ImportedSpec {
    pub table: ImportedTable,
    pub fields: Vec<Field>,
}

impl QuerySpec {
    pub fn new(fields: &[Field]) -> Self {
        Self {
            fields: fields.to_vec(),
            ..Self::default()
        }
    }

    pub fn group_by(mut self, fields: &[Field]) -> Self {
        self.group_by = fields.to_vec();
        self
    }

    pub fn order_by(mut self, fields: &[Field]) -> Self {
        self.order_by = fields.to_vec();
        self
    }

    pub fn imported(mut self, table: ImportedTable, fields: &[Field]) -> Self {
        self.imported = Some(ImportedSpec {
            table,
            fields: fields.to_vec(),
        });
        self
    }
}

/// Construction context for one SELECT statement or sub-statement.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub(crate) table: Table,
    pub(crate) fields: Vec<Field>,
    pub(crate) group_by: Vec<Field>,
    pub(crate) order_by: Vec<Field>,
    pub(crate) filter: Filter,
    /// Session or page view correlation.
    pub(crate) join: Option<Box<QueryBuilder>>,
    /// Inner event correlation.
    pub(crate) join_second: Option<Box<QueryBuilder>>,
    /// Unique visitors per time bucket.
    pub(crate) join_third: Option<Box<QueryBuilder>>,
    /// Event correlation for negated event names.
    pub(crate) left_join: Option<Box<QueryBuilder>>,
    pub(crate) search: Vec<Search>,
    pub(crate) offset: i64,
    pub(crate) limit: i64,
    pub(crate) sample: u32,
    pub(crate) final_read: bool,
    pub(crate) include_event_filter: bool,
    pub(crate) imported: Option<ImportedSpec>,
}

impl QueryBuilder {
    /// Builder without joins, grouping or paging.
    pub(crate) fn new(table: Table, filter: Filter, fields: Vec<Field>) -> Self {
        let sample = filter.sample;
        Self {
            table,
            fields,
            group_by: Vec::new(),
            order_by: Vec::new(),
            filter,
            join: None,
            join_second: None,
            join_third: None,
            left_join: None,
            search: Vec::new(),
            offset: 0,
            limit: 0,
            sample,
            final_read: false,
            include_event_filter: false,
            imported: None,
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Alias used when this builder is joined into a parent.
    pub(crate) fn join_alias(&self) -> &'static str {
        match self.table {
            Table::Sessions => "s",
            Table::PageViews => "v",
            Table::Events => "ev",
        }
    }

    pub(crate) fn join_count(&self) -> usize {
        [
            &self.join,
            &self.join_second,
            &self.join_third,
            &self.left_join,
        ]
        .iter()
        .filter(|j| j.is_some())
        .count()
    }

    /// The full statement: the live query, merged with imported rows when possible.
    pub fn to_select(&self, supports_final: bool) -> SelectQuery {
        match imported::union_query(self, supports_final) {
            Some(query) => query,
            None => self.select(supports_final, true),
        }
    }
}

/// Plans and renders the query for `spec` under `filter`.
///
/// The filter must be validated.
pub fn build_query(filter: &Filter, spec: &QuerySpec, dialect: &dyn Dialect) -> Statement {
    let builder = QueryBuilder::plan(filter, spec);
    let query = builder.to_select(dialect.supports_final());
    let statement = SqlRenderer::new(dialect).render(&query);
    debug!(
        dialect = dialect.name(),
        table = builder.table.name(),
        joins = builder.join_count(),
        args = statement.args.len(),
        sql_len = statement.sql.len(),
        "built query"
    );
    statement
}

/// Renders a query assembled outside the planner.
pub(crate) fn render(query: &SelectQuery, dialect: &dyn Dialect) -> Statement {
    let statement = SqlRenderer::new(dialect).render(query);
    debug!(
        dialect = dialect.name(),
        args = statement.args.len(),
        sql_len = statement.sql.len(),
        "built derived query"
    );
    statement
}
