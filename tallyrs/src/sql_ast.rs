use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use serde_json::Value;

use crate::dialect::Dialect;
use crate::filter::{Direction, Period, WeekdayMode};

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl SqlValue {
    pub fn date(date: NaiveDateTime) -> Self {
        SqlValue::Text(date.format("%Y-%m-%d").to_string())
    }

    pub fn day(date: NaiveDate) -> Self {
        SqlValue::Text(date.format("%Y-%m-%d").to_string())
    }

    pub fn datetime(datetime: NaiveDateTime) -> Self {
        SqlValue::Text(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::UInt(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::UInt(u64::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    /// Any value of the group.
    Any,
}

/// Engine-specific functions. Dialects must emit the rendered arguments in
/// the order they receive them, since parameters are bound positionally.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// Distinct count over one or more columns.
    Uniq,
    /// Distinct count over all but the last argument, which is the condition.
    UniqIf,
    Greatest,
    Least,
    Coalesce,
    ToFloat,
    ToInt,
    /// `(values, keys, key)`: the value at the position of `key` in `keys`.
    ElementAt,
    /// `(array, value)`.
    ArrayHas,
    /// `(haystack, pattern)`.
    RegexMatch,
    ToDate,
    ToDateTime,
    /// Calendar date of a UTC timestamp in the given timezone.
    DateIn { tz: Tz },
    StartOfPeriod {
        period: Period,
        tz: Tz,
        weekday: WeekdayMode,
    },
    Hour { tz: Tz },
    Minute { tz: Tz },
    /// Day of the week, 1 = first day according to `mode`.
    Weekday { tz: Tz, mode: WeekdayMode },
    /// `(keys, values)`.
    MapFromArrays,
    /// One row per array element.
    ArrayJoin,
    /// Distinct elements of all arrays in the group.
    DistinctFlatten,
    /// Parses text to a number, 0 if it isn't one.
    ParseNumber { float: bool },
    NthValue,
}

#[derive(Debug, Clone)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    /// Reference to a select alias.
    Alias(String),
    Literal(Value),
    Param(SqlValue),
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        else_expr: Box<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Not(Box<SqlExpr>),
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
    Star,
    /// `expr OVER (PARTITION BY .. ORDER BY .. ROWS BETWEEN CURRENT ROW AND n FOLLOWING)`
    Window {
        expr: Box<SqlExpr>,
        partition_by: Vec<SqlExpr>,
        order_by: Vec<SqlExpr>,
        following: u32,
    },
    Subquery(Box<SelectQuery>),
}

impl SqlExpr {
    pub fn column(table: &str, name: &str) -> Self {
        SqlExpr::Column {
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    pub fn param(value: impl Into<SqlValue>) -> Self {
        SqlExpr::Param(value.into())
    }

    pub fn text(value: &str) -> Self {
        SqlExpr::Literal(Value::String(value.to_string()))
    }

    pub fn int(value: i64) -> Self {
        SqlExpr::Literal(Value::from(value))
    }

    pub fn func(func: Function, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function { func, args }
    }

    pub fn agg(agg: Aggregation, expr: SqlExpr) -> Self {
        SqlExpr::Aggregate {
            agg,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: SqlBinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equals(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Eq, self, right)
    }

    pub fn not_equals(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Neq, self, right)
    }

    pub fn greater(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Gt, self, right)
    }

    pub fn at_least(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Gte, self, right)
    }

    pub fn at_most(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Lte, self, right)
    }

    pub fn times(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Multiply, self, right)
    }

    pub fn over(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Divide, self, right)
    }

    pub fn plus(self, right: SqlExpr) -> Self {
        Self::binary(SqlBinaryOperator::Add, self, right)
    }

    pub fn negate(self) -> Self {
        SqlExpr::Not(Box::new(self))
    }

    /// Joins expressions with AND, `None` if there are none.
    pub fn and_all(exprs: Vec<SqlExpr>) -> Option<SqlExpr> {
        exprs
            .into_iter()
            .reduce(|acc, e| Self::binary(SqlBinaryOperator::And, acc, e))
    }

    /// Joins expressions with OR, `None` if there are none.
    pub fn or_all(exprs: Vec<SqlExpr>) -> Option<SqlExpr> {
        exprs
            .into_iter()
            .reduce(|acc, e| Self::binary(SqlBinaryOperator::Or, acc, e))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SqlBinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    ILike,
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: SqlExpr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum TableSource {
    Named(String),
    Subquery(Box<SelectQuery>),
    UnionAll(Vec<SelectQuery>),
}

impl Default for TableSource {
    fn default() -> Self {
        TableSource::Named(String::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableRef {
    pub source: TableSource,
    pub alias: Option<String>,
    /// Read merged rows of a versioned table.
    pub final_read: bool,
    /// Sampling size, 0 disables sampling.
    pub sample: u32,
}

impl TableRef {
    pub fn named(name: &str, alias: &str) -> Self {
        Self {
            source: TableSource::Named(name.to_string()),
            alias: Some(alias.to_string()),
            ..Self::default()
        }
    }

    pub fn subquery(query: SelectQuery, alias: &str) -> Self {
        Self {
            source: TableSource::Subquery(Box::new(query)),
            alias: Some(alias.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub join_type: SqlJoinType,
    pub table: TableRef,
    pub on: Vec<SqlExpr>,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// SQL text and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Renders the query, binding parameters in the order they appear in the text.
    pub fn render(&self, query: &SelectQuery) -> Statement {
        let mut args = Vec::new();
        let sql = self.render_select(query, &mut args);
        Statement { sql, args }
    }

    fn render_select(&self, query: &SelectQuery, args: &mut Vec<SqlValue>) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr, args);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {}", self.dialect.quote_ident(alias)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = format!("SELECT {}", select_items.join(", "));
        sql.push_str(&format!(" FROM {}", self.render_table_ref(&query.from, args)));

        for join in &query.joins {
            let join_kw = match join.join_type {
                SqlJoinType::Inner => "JOIN",
                SqlJoinType::Left => "LEFT JOIN",
            };
            let table = self.render_table_ref(&join.table, args);
            let on_clause: Vec<String> = join.on.iter().map(|e| self.render_expr(e, args)).collect();
            sql.push_str(&format!(" {join_kw} {table} ON {}", on_clause.join(" AND ")));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query
                .filters
                .iter()
                .map(|f| self.render_expr(f, args))
                .collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query
                .group_by
                .iter()
                .map(|g| self.render_expr(g, args))
                .collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !query.having.is_empty() {
            let having: Vec<String> = query
                .having
                .iter()
                .map(|h| self.render_expr(h, args))
                .collect();
            sql.push_str(&format!(" HAVING {}", having.join(" AND ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| format!("{} {}", self.render_expr(&o.expr, args), o.direction.as_sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    fn render_table_ref(&self, table: &TableRef, args: &mut Vec<SqlValue>) -> String {
        let source = match &table.source {
            TableSource::Named(name) => self.dialect.quote_ident(name),
            TableSource::Subquery(query) => format!("({})", self.render_select(query, args)),
            TableSource::UnionAll(queries) => {
                let parts: Vec<String> = queries
                    .iter()
                    .map(|q| self.render_select(q, args))
                    .collect();
                format!("({})", parts.join(" UNION ALL "))
            }
        };
        let alias = match &table.alias {
            Some(alias) => format!(" {}", self.dialect.quote_ident(alias)),
            None => String::new(),
        };
        let modifiers = match &table.source {
            TableSource::Named(_) => self.dialect.table_modifiers(table.final_read, table.sample),
            _ => String::new(),
        };
        format!("{source}{alias}{modifiers}")
    }

    fn render_expr(&self, expr: &SqlExpr, args: &mut Vec<SqlValue>) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!(
                    "{}.{}",
                    self.dialect.quote_ident(t),
                    self.dialect.quote_ident(name)
                ),
                None => self.dialect.quote_ident(name),
            },
            SqlExpr::Alias(name) => self.dialect.quote_ident(name),
            SqlExpr::Literal(v) => self.dialect.render_literal(v),
            SqlExpr::Param(value) => {
                args.push(value.clone());
                self.dialect.placeholder(args.len())
            }
            SqlExpr::Function { func, args: fn_args } => {
                let rendered_args: Vec<String> =
                    fn_args.iter().map(|a| self.render_expr(a, args)).collect();
                self.dialect.render_function(func, rendered_args)
            }
            SqlExpr::Case {
                branches,
                else_expr,
            } => {
                let mut parts = Vec::new();
                parts.push("CASE".to_string());
                for (when, then) in branches {
                    let when = self.render_expr(when, args);
                    let then = self.render_expr(then, args);
                    parts.push(format!(" WHEN {when} THEN {then}"));
                }
                parts.push(format!(" ELSE {} END", self.render_expr(else_expr, args)));
                parts.join("")
            }
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Add => "+",
                    SqlBinaryOperator::Subtract => "-",
                    SqlBinaryOperator::Multiply => "*",
                    SqlBinaryOperator::Divide => "/",
                    SqlBinaryOperator::And => "AND",
                    SqlBinaryOperator::Or => "OR",
                    SqlBinaryOperator::Eq => "=",
                    SqlBinaryOperator::Neq => "!=",
                    SqlBinaryOperator::Gt => ">",
                    SqlBinaryOperator::Gte => ">=",
                    SqlBinaryOperator::Lt => "<",
                    SqlBinaryOperator::Lte => "<=",
                    SqlBinaryOperator::ILike => "ILIKE",
                };
                let left = self.render_expr(left, args);
                let right = self.render_expr(right, args);
                format!("({left} {op_sql} {right})")
            }
            SqlExpr::Not(inner) => format!("NOT {}", self.render_expr(inner, args)),
            SqlExpr::Aggregate { agg, expr } => {
                let inner = self.render_expr(expr, args);
                self.dialect.render_aggregation(agg, &inner)
            }
            SqlExpr::Star => "*".to_string(),
            SqlExpr::Window {
                expr,
                partition_by,
                order_by,
                following,
            } => {
                let func = self.render_expr(expr, args);
                let partition: Vec<String> = partition_by
                    .iter()
                    .map(|p| self.render_expr(p, args))
                    .collect();
                let order: Vec<String> = order_by
                    .iter()
                    .map(|o| format!("{} ASC", self.render_expr(o, args)))
                    .collect();
                format!(
                    "{func} OVER (PARTITION BY {} ORDER BY {} ROWS BETWEEN CURRENT ROW AND {following} FOLLOWING)",
                    partition.join(", "),
                    order.join(", ")
                )
            }
            SqlExpr::Subquery(query) => format!("({})", self.render_select(query, args)),
        }
    }
}
