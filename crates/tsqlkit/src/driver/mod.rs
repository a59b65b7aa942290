//! Driver glue: named placeholders to positional ones, and (feature
//! `tiberius`) an [`Executor`](crate::Executor) over `tiberius::Client`.

use crate::error::{TsqlError, TsqlResult};
use crate::qb::Params;
use crate::value::Value;

#[cfg(feature = "tiberius")]
mod mssql;

#[cfg(feature = "tiberius")]
pub use self::mssql::TiberiusExecutor;

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rewrite `:name` placeholders into the driver's `@P1`, `@P2`, ... form,
/// numbered by each parameter's position in `params`.
///
/// A placeholder bound to [`Value::Null`] becomes the literal `NULL`, which
/// converts to any column type; a typed null parameter would not (nvarchar
/// to varbinary has no implicit conversion).
///
/// Text inside string literals, bracketed identifiers and double-quoted
/// identifiers is copied as is; `::` is left alone.
///
/// ```
/// use tsqlkit::driver::rewrite_named_params;
/// use tsqlkit::qb::Params;
///
/// let mut params = Params::new();
/// let ph = params.bind(1);
/// let sql = format!("SELECT ':x', [a:b] FROM t WHERE id = {ph}");
/// assert_eq!(
///     rewrite_named_params(&sql, &params).unwrap(),
///     "SELECT ':x', [a:b] FROM t WHERE id = @P1"
/// );
/// ```
pub fn rewrite_named_params(sql: &str, params: &Params) -> TsqlResult<String> {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '[' => {
                let close = if c == '[' { ']' } else { c };
                out.push(c);
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == close {
                        // doubled closer is an escape
                        if chars.peek() == Some(&close) {
                            out.push(close);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            ':' if chars.peek() == Some(&':') => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars.peek().is_some_and(|&n| is_name_start(n)) => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if !is_name_char(n) {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                let position = params.position(&name).ok_or_else(|| {
                    TsqlError::invalid_argument(format!("no value bound for placeholder :{name}"))
                })?;
                if params.get(&name).is_some_and(Value::is_null) {
                    out.push_str("NULL");
                } else {
                    out.push_str(&format!("@P{}", position + 1));
                }
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}
