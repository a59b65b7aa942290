//! Bracket-delimited identifier handling.
//!
//! SQL Server quotes identifiers with `[` `]` and escapes a closing bracket
//! inside a quoted part as `]]`. Names may carry up to four dot-separated
//! parts: `server.catalog.schema.object`.
//!
//! # Example
//! ```
//! use tsqlkit::ident::{quote_column_name, split_qualified_name};
//!
//! assert_eq!(quote_column_name("t.id"), "[t].[id]");
//! assert_eq!(split_qualified_name("[a.b].c"), vec!["a.b", "c"]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Split a possibly qualified name into its unquoted parts.
///
/// Bracketed runs are opaque (dots inside them do not split) and `]]` inside
/// a bracketed run is an escaped `]`. Empty input or an unmatched bracket
/// yields the raw string as the single part.
pub fn split_qualified_name(raw: &str) -> Vec<String> {
    let fallback = || vec![raw.to_string()];
    let mut parts = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
            }
            '[' => {
                chars.next();
                let mut part = String::new();
                let mut closed = false;
                while let Some(ch) = chars.next() {
                    if ch == ']' {
                        if chars.peek() == Some(&']') {
                            chars.next();
                            part.push(']');
                        } else {
                            closed = true;
                            break;
                        }
                    } else {
                        part.push(ch);
                    }
                }
                if !closed {
                    return fallback();
                }
                parts.push(part);
            }
            ']' => return fallback(),
            _ => {
                let mut part = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '.' || ch == '[' || ch == ']' {
                        break;
                    }
                    part.push(ch);
                    chars.next();
                }
                parts.push(part);
            }
        }
    }

    if parts.is_empty() { fallback() } else { parts }
}

fn is_bracketed(name: &str) -> bool {
    name.len() >= 2 && name.starts_with('[') && name.ends_with(']')
}

/// Quote a single name part: `users` -> `[users]`.
///
/// Already bracketed input and `*` are returned unchanged.
pub fn quote_simple_name(name: &str) -> String {
    if name == "*" || is_bracketed(name) {
        return name.to_string();
    }
    format!("[{}]", name.replace(']', "]]"))
}

/// Strip brackets from a single name part: `[a]]b]` -> `a]b`.
pub fn unquote_simple_name(name: &str) -> String {
    if is_bracketed(name) {
        name[1..name.len() - 1].replace("]]", "]")
    } else {
        name.to_string()
    }
}

/// Quote a table name, part by part: `dbo.users` -> `[dbo].[users]`.
///
/// Names containing `(` are treated as expressions and returned unchanged.
pub fn quote_table_name(name: &str) -> String {
    if name.contains('(') {
        return name.to_string();
    }
    split_qualified_name(name)
        .iter()
        .map(|p| quote_simple_name(p))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a column name, part by part: `t.id` -> `[t].[id]`, `t.*` -> `[t].*`.
///
/// Idempotent: fully bracketed input and expressions (containing `(`) are
/// returned unchanged.
pub fn quote_column_name(name: &str) -> String {
    if name.contains('(') || is_bracketed(name) {
        return name.to_string();
    }
    split_qualified_name(name)
        .iter()
        .map(|p| if p == "*" { p.clone() } else { quote_simple_name(p) })
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a column reference unless it already is an expression.
pub(crate) fn quote_column_or_expr(name: &str) -> String {
    if name.contains('(') {
        name.to_string()
    } else {
        quote_column_name(name)
    }
}

/// A right-anchored `server.catalog.schema.name` object name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    server: Option<String>,
    catalog: Option<String>,
    schema: Option<String>,
    name: String,
}

impl QualifiedName {
    /// Parse a raw name. Only the last four parts are used; the last part is
    /// always the object name.
    pub fn parse(raw: &str) -> Self {
        let parts = split_qualified_name(raw);
        let start = parts.len().saturating_sub(4);
        let mut parts = parts[start..].iter().rev().cloned();

        let name = parts.next().unwrap_or_default();
        let schema = parts.next();
        let catalog = parts.next();
        let server = parts.next();

        Self {
            server,
            catalog,
            schema,
            name,
        }
    }

    /// Build a `schema.name` pair directly.
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            server: None,
            catalog: None,
            schema: schema.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Fill in the schema part when it is absent.
    pub fn with_default_schema(mut self, schema: &str) -> Self {
        if self.schema.is_none() {
            self.schema = Some(schema.to_string());
        }
        self
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Present parts, left to right.
    pub fn parts(&self) -> Vec<&str> {
        [
            self.server.as_deref(),
            self.catalog.as_deref(),
            self.schema.as_deref(),
        ]
        .into_iter()
        .flatten()
        .chain(std::iter::once(self.name.as_str()))
        .collect()
    }

    /// Unquoted dotted form, e.g. `dbo.users`.
    pub fn full_name(&self) -> String {
        self.parts().join(".")
    }

    /// Bracket-quoted dotted form, e.g. `[dbo].[users]`.
    pub fn quoted(&self) -> String {
        self.parts()
            .into_iter()
            .map(quote_simple_name)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
