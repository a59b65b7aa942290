//! SELECT query model and its T-SQL rendering.

use crate::condition::{Condition, Function, Operand};
use crate::error::TsqlResult;
use crate::ident::{quote_column_name, quote_column_or_expr, quote_table_name};
use crate::qb::condition::{build_condition, build_operand};
use crate::qb::pagination::{OrderBy, build_order_by_and_limit};
use crate::qb::param::Params;
use crate::version::ServerVersion;
use regex::Regex;
use std::sync::OnceLock;

/// JOIN flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
        }
    }
}

#[derive(Clone, Debug)]
enum SelectItem {
    /// `col`, `t.col`, `col AS alias`, `col alias` or an expression.
    Column(String),
    /// An operand with an explicit alias.
    Aliased(Operand, String),
}

#[derive(Clone, Debug)]
struct Join {
    kind: JoinKind,
    table: String,
    on: Condition,
}

/// SELECT query builder.
///
/// ```
/// use tsqlkit::condition::Condition;
/// use tsqlkit::qb::{self, QueryBuilder};
///
/// let q = qb::select("dbo.users")
///     .columns(&["id", "name"])
///     .and_where(Condition::eq("status", "active"))
///     .order_by_desc("id")
///     .limit(10);
/// let stmt = QueryBuilder::default().build_select(&q).unwrap();
/// assert_eq!(
///     stmt.sql,
///     "SELECT [id], [name] FROM [dbo].[users] WHERE [status] = :qp0 ORDER BY [id] DESC OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct SelectQb {
    distinct: bool,
    items: Vec<SelectItem>,
    from: Vec<String>,
    joins: Vec<Join>,
    where_: Vec<Condition>,
    group_by: Vec<String>,
    having: Vec<Condition>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQb {
    /// Create a new SELECT query builder for a table (`users`, `dbo.users u`).
    pub fn new(table: &str) -> Self {
        Self {
            distinct: false,
            items: Vec::new(),
            from: vec![table.to_string()],
            joins: Vec::new(),
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// A SELECT without FROM, e.g. `SELECT 1`.
    pub fn bare() -> Self {
        let mut q = Self::new("");
        q.from.clear();
        q
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Set the select list. Items may carry an alias (`name AS n`).
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.items = cols.iter().map(|c| SelectItem::Column(c.to_string())).collect();
        self
    }

    /// Append one select item.
    pub fn add_column(mut self, col: &str) -> Self {
        self.items.push(SelectItem::Column(col.to_string()));
        self
    }

    /// Append an operand (function, subquery, value) under an alias.
    pub fn add_expr(mut self, operand: impl Into<Operand>, alias: &str) -> Self {
        self.items.push(SelectItem::Aliased(operand.into(), alias.to_string()));
        self
    }

    /// Append a multi-operand function under an alias.
    pub fn add_function(self, function: Function, alias: &str) -> Self {
        self.add_expr(function, alias)
    }

    /// Add another FROM source.
    pub fn add_from(mut self, table: &str) -> Self {
        self.from.push(table.to_string());
        self
    }

    pub fn join(mut self, kind: JoinKind, table: &str, on: Condition) -> Self {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            on,
        });
        self
    }

    pub fn inner_join(self, table: &str, on: Condition) -> Self {
        self.join(JoinKind::Inner, table, on)
    }

    pub fn left_join(self, table: &str, on: Condition) -> Self {
        self.join(JoinKind::Left, table, on)
    }

    /// Add a WHERE condition, AND-ed with existing ones.
    pub fn and_where(mut self, cond: Condition) -> Self {
        self.where_.push(cond);
        self
    }

    /// OR a condition with everything collected so far.
    pub fn or_where(mut self, cond: Condition) -> Self {
        let existing = std::mem::take(&mut self.where_);
        self.where_ = vec![Condition::Or(vec![Condition::And(existing), cond])];
        self
    }

    pub fn group_by(mut self, cols: &[&str]) -> Self {
        self.group_by = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn having(mut self, cond: Condition) -> Self {
        self.having.push(cond);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn order_by_asc(self, expr: &str) -> Self {
        self.order_by(OrderBy::asc(expr))
    }

    pub fn order_by_desc(self, expr: &str) -> Self {
        self.order_by(OrderBy::desc(expr))
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set both limit and offset from a 1-based page number.
    pub fn page(self, page: u64, per_page: u64) -> Self {
        self.limit(per_page).offset(page.saturating_sub(1) * per_page)
    }
}

fn alias_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(.*?)(?:\s+as\s+|\s+)([\w\-.]+)$").expect("invalid built-in alias regex")
    })
}

fn quote_select_column(col: &str) -> String {
    if col.contains('(') {
        return col.to_string();
    }
    match alias_re().captures(col) {
        Some(caps) => format!(
            "{} AS {}",
            quote_column_name(&caps[1]),
            quote_column_name(&caps[2])
        ),
        None => quote_column_name(col),
    }
}

fn quote_from(table: &str) -> String {
    if table.contains('(') {
        return table.to_string();
    }
    match alias_re().captures(table) {
        Some(caps) => format!(
            "{} {}",
            quote_table_name(&caps[1]),
            quote_table_name(&caps[2])
        ),
        None => quote_table_name(table),
    }
}

fn build_where(conds: &[Condition], version: ServerVersion, params: &mut Params) -> TsqlResult<String> {
    match conds {
        [] => Ok(String::new()),
        [single] => build_condition(single, version, params),
        many => build_condition(&Condition::And(many.to_vec()), version, params),
    }
}

/// Render a SELECT, binding values into `params`.
pub(crate) fn build_select(q: &SelectQb, version: ServerVersion, params: &mut Params) -> TsqlResult<String> {
    let mut sql = String::from(if q.distinct { "SELECT DISTINCT " } else { "SELECT " });

    if q.items.is_empty() {
        sql.push('*');
    } else {
        let mut items = Vec::with_capacity(q.items.len());
        for item in &q.items {
            items.push(match item {
                SelectItem::Column(col) => quote_select_column(col),
                SelectItem::Aliased(operand, alias) => format!(
                    "{} AS {}",
                    build_operand(operand, version, params)?,
                    quote_column_name(alias)
                ),
            });
        }
        sql.push_str(&items.join(", "));
    }

    if !q.from.is_empty() {
        let from: Vec<String> = q.from.iter().map(|t| quote_from(t)).collect();
        sql.push_str(" FROM ");
        sql.push_str(&from.join(", "));
    }

    for join in &q.joins {
        let on = build_condition(&join.on, version, params)?;
        sql.push_str(&format!(" {} {}", join.kind.as_sql(), quote_from(&join.table)));
        if !on.is_empty() {
            sql.push_str(&format!(" ON {on}"));
        }
    }

    let where_sql = build_where(&q.where_, version, params)?;
    if !where_sql.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
    }

    if !q.group_by.is_empty() {
        let cols: Vec<String> = q.group_by.iter().map(|c| quote_column_or_expr(c)).collect();
        sql.push_str(" GROUP BY ");
        sql.push_str(&cols.join(", "));
    }

    let having_sql = build_where(&q.having, version, params)?;
    if !having_sql.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&having_sql);
    }

    Ok(build_order_by_and_limit(&sql, &q.order_by, q.limit, q.offset, version))
}
