//! ORDER BY / OFFSET / FETCH and the ROW_NUMBER() rewrite for old servers.

use crate::ident::quote_column_or_expr;
use crate::version::ServerVersion;
use regex::Regex;
use std::sync::OnceLock;

/// Sort direction of an ORDER BY item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY item. Column names are quoted; expressions (containing
/// `(`) are emitted as given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub expr: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: Direction::Desc,
        }
    }
}

/// Render `ORDER BY ...`, or an empty string for no items.
pub fn build_order_by(order_by: &[OrderBy]) -> String {
    if order_by.is_empty() {
        return String::new();
    }
    let items: Vec<String> = order_by
        .iter()
        .map(|o| format!("{} {}", quote_column_or_expr(&o.expr), o.direction.as_sql()))
        .collect();
    format!("ORDER BY {}", items.join(", "))
}

fn has_offset(offset: Option<u64>) -> bool {
    matches!(offset, Some(n) if n > 0)
}

/// Append ordering and pagination to a base SELECT.
///
/// An offset of zero counts as absent. Servers before SQL Server 2012 get
/// the `ROW_NUMBER()` rewrite instead of `OFFSET .. FETCH`.
pub fn build_order_by_and_limit(
    sql: &str,
    order_by: &[OrderBy],
    limit: Option<u64>,
    offset: Option<u64>,
    version: ServerVersion,
) -> String {
    let order = build_order_by(order_by);
    if limit.is_none() && !has_offset(offset) {
        return if order.is_empty() {
            sql.to_string()
        } else {
            format!("{sql} {order}")
        };
    }

    let order = if order.is_empty() {
        "ORDER BY (SELECT NULL)".to_string()
    } else {
        order
    };

    if !version.supports_offset_fetch() {
        return build_row_number_pagination(sql, &order, limit, offset);
    }

    let mut out = format!("{sql} {order} OFFSET {} ROWS", offset.unwrap_or(0));
    if let Some(limit) = limit {
        out.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
    }
    out
}

fn select_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^([\s(]*)SELECT(\s+DISTINCT)?").expect("invalid built-in select regex")
    })
}

fn top_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*TOP\s*\(").expect("invalid built-in top regex"))
}

/// Inject `rowNum = ROW_NUMBER() over (...)` as the first projected column,
/// wrap the statement, and filter on `rowNum`.
fn build_row_number_pagination(
    sql: &str,
    order: &str,
    limit: Option<u64>,
    offset: Option<u64>,
) -> String {
    let inner = select_head_re()
        .captures(sql)
        .and_then(|caps| {
            let head = caps.get(0).map_or(0, |m| m.end());
            let lead = caps.get(1).map_or("", |m| m.as_str());
            let distinct = caps.get(2).map_or("", |m| m.as_str());
            let (top, rest) = split_top_clause(&sql[head..])?;
            Some(format!(
                "{lead}SELECT{distinct}{top} rowNum = ROW_NUMBER() over ({order}),{rest}"
            ))
        })
        .unwrap_or_else(|| sql.to_string());

    let mut out = match limit {
        Some(limit) => format!("SELECT TOP {limit} * FROM ({inner}) sub"),
        None => format!("SELECT * FROM ({inner}) sub"),
    };
    if let Some(offset) = offset.filter(|n| *n > 0) {
        out.push_str(&format!(" WHERE rowNum > {offset}"));
    }
    out
}

/// Split a leading `TOP (...)` off the projection. `None` if its parentheses
/// never close.
fn split_top_clause(rest: &str) -> Option<(&str, &str)> {
    let Some(m) = top_paren_re().find(rest) else {
        return Some(("", rest));
    };
    let mut depth = 1;
    for (i, ch) in rest[m.end()..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let end = m.end() + i + 1;
                    return Some((&rest[..end], &rest[end..]));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2019: ServerVersion = ServerVersion::new(15, 0, 0, 0);
    const V2008: ServerVersion = ServerVersion::new(10, 50, 0, 0);

    #[test]
    fn no_pagination_keeps_order_only() {
        let sql = build_order_by_and_limit("SELECT * FROM [t]", &[OrderBy::desc("id")], None, None, V2019);
        assert_eq!(sql, "SELECT * FROM [t] ORDER BY [id] DESC");
        let sql = build_order_by_and_limit("SELECT * FROM [t]", &[], None, Some(0), V2019);
        assert_eq!(sql, "SELECT * FROM [t]");
    }

    #[test]
    fn offset_only_synthesizes_order() {
        let sql = build_order_by_and_limit("SELECT * FROM [t]", &[], None, Some(10), V2019);
        assert!(sql.ends_with("ORDER BY (SELECT NULL) OFFSET 10 ROWS"));
        assert!(!sql.contains("FETCH"));
    }

    #[test]
    fn limit_with_zero_offset() {
        let sql = build_order_by_and_limit("SELECT * FROM [t]", &[], Some(10), Some(0), V2019);
        assert!(sql.ends_with("OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"));
    }

    #[test]
    fn legacy_row_number_rewrite() {
        let sql = build_order_by_and_limit(
            "SELECT DISTINCT [a] FROM [t]",
            &[OrderBy::asc("a")],
            Some(5),
            Some(20),
            V2008,
        );
        assert_eq!(
            sql,
            "SELECT TOP 5 * FROM (SELECT DISTINCT rowNum = ROW_NUMBER() over (ORDER BY [a] ASC), [a] FROM [t]) sub WHERE rowNum > 20"
        );
    }

    #[test]
    fn legacy_without_limit_or_order() {
        let sql = build_order_by_and_limit("SELECT [a] FROM [t]", &[], None, Some(3), V2008);
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT rowNum = ROW_NUMBER() over (ORDER BY (SELECT NULL)), [a] FROM [t]) sub WHERE rowNum > 3"
        );
    }

    #[test]
    fn legacy_numbers_rows_after_top_clause() {
        let sql = build_order_by_and_limit("SELECT TOP (3) [a] FROM [t]", &[], Some(2), None, V2008);
        assert_eq!(
            sql,
            "SELECT TOP 2 * FROM (SELECT TOP (3) rowNum = ROW_NUMBER() over (ORDER BY (SELECT NULL)), [a] FROM [t]) sub"
        );

        let sql = build_order_by_and_limit(
            "SELECT TOP (LEN('ab') + 1) [a] FROM [t]",
            &[OrderBy::asc("a")],
            None,
            Some(1),
            V2008,
        );
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT TOP (LEN('ab') + 1) rowNum = ROW_NUMBER() over (ORDER BY [a] ASC), [a] FROM [t]) sub WHERE rowNum > 1"
        );
    }
}
