//! Condition rendering: [`Condition`] tree -> T-SQL fragment.
//!
//! Empty fragments (an empty `NOT IN`, an empty group) are skipped by the
//! enclosing AND/OR so they impose no restriction.

use crate::condition::{CompareOp, Condition, InRow, InValues, Like, LikeMode, Operand};
use crate::error::{TsqlError, TsqlResult};
use crate::ident::quote_column_or_expr;
use crate::qb::function::build_function;
use crate::qb::param::Params;
use crate::qb::select::build_select;
use crate::value::Value;
use crate::version::ServerVersion;

/// LIKE wildcard escapes; SQL Server has no default escape character, so
/// each special character is wrapped in a one-character class.
const LIKE_ESCAPES: [(char, &str); 5] = [
    ('%', "[%]"),
    ('_', "[_]"),
    ('[', "[[]"),
    (']', "[]]"),
    ('\\', "[\\]"),
];

pub(crate) fn build_condition(
    cond: &Condition,
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    match cond {
        Condition::Compare { column, op, value } => build_compare(column, *op, value, version, params),
        Condition::In {
            columns,
            values,
            negated,
        } => build_in(columns, values, *negated, version, params),
        Condition::Like(like) => build_like(like, version, params),
        Condition::Between {
            column,
            low,
            high,
            negated,
        } => {
            let low = build_operand(low, version, params)?;
            let high = build_operand(high, version, params)?;
            let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
            Ok(format!("{} {op} {low} AND {high}", quote_column_or_expr(column)))
        }
        Condition::Exists { query, negated } => {
            let sql = build_select(query, version, params)?;
            let op = if *negated { "NOT EXISTS" } else { "EXISTS" };
            Ok(format!("{op} ({sql})"))
        }
        Condition::And(children) => build_group(children, "AND", version, params),
        Condition::Or(children) => build_group(children, "OR", version, params),
        Condition::Not(inner) => {
            let sql = build_condition(inner, version, params)?;
            if sql.is_empty() {
                Ok(String::new())
            } else {
                Ok(format!("NOT ({sql})"))
            }
        }
        Condition::Raw { sql, params: raw } => {
            for (name, value) in raw {
                match params.get(name) {
                    Some(bound) if bound != value => {
                        return Err(TsqlError::invalid_argument(format!(
                            "parameter :{} is already bound to a different value",
                            name.trim_start_matches(':')
                        )));
                    }
                    Some(_) => {}
                    None => params.push_named(name, value.clone()),
                }
            }
            Ok(sql.clone())
        }
        Condition::Function(f) => build_function(f, version, params),
    }
}

/// Render an operand in value position.
pub(crate) fn build_operand(
    operand: &Operand,
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    Ok(match operand {
        Operand::Column(name) => quote_column_or_expr(name),
        Operand::Value(value) => params.bind(value.clone()),
        Operand::Expr(sql) => sql.clone(),
        Operand::Function(f) => build_function(f, version, params)?,
        Operand::Subquery(q) => format!("({})", build_select(q, version, params)?),
    })
}

fn build_group(
    children: &[Condition],
    op: &str,
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        let sql = build_condition(child, version, params)?;
        if !sql.is_empty() {
            parts.push(sql);
        }
    }
    Ok(match parts.len() {
        0 => String::new(),
        1 => parts.remove(0),
        _ => format!("({})", parts.join(&format!(") {op} ("))),
    })
}

fn build_compare(
    column: &str,
    op: CompareOp,
    value: &Operand,
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    let column = quote_column_or_expr(column);
    if let Operand::Value(Value::Null) = value {
        match op {
            CompareOp::Eq => return Ok(format!("{column} IS NULL")),
            CompareOp::Ne => return Ok(format!("{column} IS NOT NULL")),
            _ => {}
        }
    }
    let rhs = build_operand(value, version, params)?;
    Ok(format!("{column} {} {rhs}", op.as_sql()))
}

fn build_in(
    columns: &[String],
    values: &InValues,
    negated: bool,
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    if columns.is_empty() {
        return Ok(if negated { String::new() } else { "0=1".to_string() });
    }

    let composite = columns.len() > 1;
    match values {
        InValues::Subquery(query) => {
            if composite {
                return Err(TsqlError::unsupported(
                    "composite IN against a subquery is not supported by SQL Server",
                ));
            }
            let sql = build_select(query, version, params)?;
            let op = if negated { "NOT IN" } else { "IN" };
            Ok(format!("{} {op} ({sql})", quote_column_or_expr(&columns[0])))
        }
        InValues::Rows(rows) if composite => Ok(build_composite_in(columns, rows, negated, params)),
        InValues::List(list) if composite && list.is_empty() => {
            Ok(build_composite_in(columns, &[], negated, params))
        }
        InValues::List(_) if composite => Err(TsqlError::invalid_argument(
            "composite IN requires row values keyed by column",
        )),
        InValues::List(list) => Ok(build_simple_in(&columns[0], list, negated, params)),
        InValues::Rows(rows) => {
            let column = &columns[0];
            let list: Vec<Value> = rows
                .iter()
                .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
                .collect();
            Ok(build_simple_in(column, &list, negated, params))
        }
    }
}

fn build_simple_in(column: &str, values: &[Value], negated: bool, params: &mut Params) -> String {
    let column = quote_column_or_expr(column);
    let mut has_null = false;
    let mut placeholders = Vec::with_capacity(values.len());
    for value in values {
        if value.is_null() {
            has_null = true;
        } else {
            placeholders.push(params.bind(value.clone()));
        }
    }

    let null_condition = has_null.then(|| {
        if negated {
            format!("{column} IS NOT NULL")
        } else {
            format!("{column} IS NULL")
        }
    });

    if placeholders.is_empty() {
        return match null_condition {
            Some(cond) => cond,
            None if negated => String::new(),
            None => "0=1".to_string(),
        };
    }

    let sql = if placeholders.len() > 1 {
        let op = if negated { "NOT IN" } else { "IN" };
        format!("{column} {op} ({})", placeholders.join(", "))
    } else {
        let op = if negated { "<>" } else { "=" };
        format!("{column} {op} {}", placeholders[0])
    };

    match null_condition {
        Some(cond) => {
            let join = if negated { "AND" } else { "OR" };
            format!("({sql} {join} {cond})")
        }
        None => sql,
    }
}

/// Composite IN without row-value support: a disjunction of per-row
/// conjunctions for IN, a conjunction of per-row disjunctions for NOT IN.
fn build_composite_in(
    columns: &[String],
    rows: &[InRow],
    negated: bool,
    params: &mut Params,
) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| quote_column_or_expr(c)).collect();
    let (inner_join, outer_join) = if negated {
        (" OR ", " AND ")
    } else {
        (" AND ", " OR ")
    };

    let mut row_parts = Vec::with_capacity(rows.len());
    for row in rows {
        let mut parts = Vec::with_capacity(columns.len());
        for (column, quoted_column) in columns.iter().zip(&quoted) {
            match row.get(column) {
                Some(value) if !value.is_null() => {
                    let ph = params.bind(value.clone());
                    let op = if negated { "!=" } else { "=" };
                    parts.push(format!("{quoted_column} {op} {ph}"));
                }
                _ => {
                    let op = if negated { "IS NOT NULL" } else { "IS NULL" };
                    parts.push(format!("{quoted_column} {op}"));
                }
            }
        }
        row_parts.push(format!("({})", parts.join(inner_join)));
    }
    format!("({})", row_parts.join(outer_join))
}

fn build_like(like: &Like, version: ServerVersion, params: &mut Params) -> TsqlResult<String> {
    if like.case_sensitive {
        return Err(TsqlError::unsupported(
            "case-sensitive LIKE is not supported; SQL Server LIKE follows the column collation",
        ));
    }
    if like.values.is_empty() {
        return Ok(if like.negated { String::new() } else { "0=1".to_string() });
    }

    let column = quote_column_or_expr(&like.column);
    let op = if like.negated { "NOT LIKE" } else { "LIKE" };
    let mut parts = Vec::with_capacity(like.values.len());
    for value in &like.values {
        let ph = match value {
            Operand::Value(value) => match like_text(value) {
                Some(text) => params.bind(like_pattern(&text, like.mode)),
                None => params.bind(value.clone()),
            },
            other => build_operand(other, version, params)?,
        };
        parts.push(format!("{column} {op} {ph}"));
    }
    let join = if like.disjunctive { " OR " } else { " AND " };
    Ok(parts.join(join))
}

/// Text form of a scalar LIKE operand; `None` for values bound unchanged.
fn like_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(i64::from(*b).to_string()),
        Value::Uuid(u) => Some(u.to_string()),
        Value::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Json(v) => Some(v.to_string()),
        Value::Null | Value::Binary(_) => None,
    }
}

/// Escape LIKE wildcards and wrap the value according to `mode`.
pub fn like_pattern(value: &str, mode: LikeMode) -> String {
    if mode == LikeMode::Custom {
        return value.to_string();
    }
    let mut escaped = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        match LIKE_ESCAPES.iter().find(|(c, _)| *c == ch) {
            Some((_, rep)) => escaped.push_str(rep),
            None => escaped.push(ch),
        }
    }
    match mode {
        LikeMode::Contains => format!("%{escaped}%"),
        LikeMode::StartsWith => format!("{escaped}%"),
        LikeMode::EndsWith => format!("%{escaped}"),
        LikeMode::Custom => escaped,
    }
}
