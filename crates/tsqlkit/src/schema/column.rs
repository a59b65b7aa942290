use crate::client::Row;
use crate::error::TsqlResult;
use crate::value::Value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Logical column type derived from the engine's type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Boolean,
    Float,
    Double,
    Decimal,
    Money,
    Char,
    String,
    Text,
    Binary,
    Date,
    Time,
    DateTime,
    Timestamp,
    Uuid,
}

impl AbstractType {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "tinyint" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "int" => Self::Integer,
            "bigint" => Self::BigInt,
            "bit" => Self::Boolean,
            "numeric" | "decimal" => Self::Decimal,
            "smallmoney" | "money" => Self::Money,
            "float" | "real" => Self::Float,
            "double" => Self::Double,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetimeoffset" | "datetime2" | "smalldatetime" | "datetime" => Self::DateTime,
            "char" | "nchar" => Self::Char,
            "varchar" | "nvarchar" => Self::String,
            "text" | "ntext" => Self::Text,
            "binary" | "varbinary" | "image" => Self::Binary,
            "timestamp" | "rowversion" => Self::Timestamp,
            "uniqueidentifier" => Self::Uuid,
            // hierarchyid, sql_variant, xml, geography, ...
            _ => Self::String,
        }
    }

    /// Map a raw type (`nvarchar(64)`, `bit`, `decimal(10,2)`) to its
    /// logical type, narrowing one-bit integers to booleans and wide bit
    /// strings to integers.
    pub fn from_db_type(db_type: &str) -> Self {
        let (keyword, size, _) = parse_db_type(db_type);
        match (keyword.as_str(), size) {
            ("tinyint" | "bit", Some(1)) => Self::Boolean,
            ("bit", Some(n)) if n > 32 => Self::BigInt,
            ("bit", Some(32)) => Self::Integer,
            (k, _) => Self::from_keyword(k),
        }
    }
}

fn db_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\w+)(?:\(([^)]+)\))?").expect("invalid built-in db type regex")
    })
}

/// Split `decimal(10,2)` into `("decimal", Some(10), Some(2))`. `max` and
/// other non-numeric sizes read as `None`.
pub(crate) fn parse_db_type(db_type: &str) -> (String, Option<u32>, Option<u32>) {
    let db_type = db_type.trim();
    let Some(caps) = db_type_re().captures(db_type) else {
        return (db_type.to_ascii_lowercase(), None, None);
    };
    let keyword = caps[1].to_ascii_lowercase();
    let Some(args) = caps.get(2) else {
        return (keyword, None, None);
    };
    let mut parts = args.as_str().split(',').map(|p| p.trim().parse::<u32>().ok());
    let first = parts.next().flatten();
    let second = parts.next().flatten();
    (keyword, first, second)
}

/// A column default: a literal or an SQL expression such as `getdate()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Literal(Value),
    Expression(String),
}

/// Strip one pair of parentheses when they enclose the whole string.
fn strip_enclosing_parens(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    let mut in_string = false;
    for c in inner.chars() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Parse a catalog default definition.
///
/// `((1))` is `Int(1)`, `(N'abc')` is `Text("abc")`, `(NULL)` is no default
/// and anything else (`(getdate())`) is kept as an expression.
pub fn parse_default(raw: &str) -> Option<DefaultValue> {
    let mut s = raw.trim();
    while let Some(inner) = strip_enclosing_parens(s) {
        s = inner.trim();
    }
    if s.is_empty() || s.eq_ignore_ascii_case("NULL") {
        return None;
    }

    let quoted = s
        .strip_prefix("N'")
        .or_else(|| s.strip_prefix('\''))
        .and_then(|rest| rest.strip_suffix('\''));
    if let Some(text) = quoted {
        return Some(DefaultValue::Literal(Value::Text(text.replace("''", "'"))));
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(DefaultValue::Literal(Value::Int(i)));
    }
    if let Ok(f) = s.parse::<f64>() {
        return Some(DefaultValue::Literal(Value::Float(f)));
    }
    Some(DefaultValue::Expression(s.to_string()))
}

/// Metadata of one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Raw engine type including size, e.g. `nvarchar(64)`.
    pub db_type: String,
    pub abstract_type: AbstractType,
    pub allow_null: bool,
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub default_value: Option<DefaultValue>,
    pub auto_increment: bool,
    pub is_computed: bool,
    pub is_primary_key: bool,
    pub comment: Option<String>,
}

impl ColumnDescriptor {
    /// A nullable column of the given raw type with nothing else set.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        let db_type = db_type.into();
        let (_, size, scale) = parse_db_type(&db_type);
        Self {
            name: name.into(),
            abstract_type: AbstractType::from_db_type(&db_type),
            db_type,
            allow_null: true,
            size,
            precision: size,
            scale,
            default_value: None,
            auto_increment: false,
            is_computed: false,
            is_primary_key: false,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default_value = Some(default);
        self
    }

    /// Build a descriptor from one row of the column catalog query.
    pub(crate) fn from_row(row: &Row) -> TsqlResult<Self> {
        let name: String = row.try_get_column("column_name")?;
        let db_type: String = row.try_get_column("data_type")?;
        let is_nullable: String = row.try_get_column("is_nullable")?;
        let column_default: Option<String> = row.get_opt("column_default")?;
        let is_identity: Option<i64> = row.get_opt("is_identity")?;
        let is_computed: Option<i64> = row.get_opt("is_computed")?;
        let comment: Option<String> = row.get_opt("comment")?;
        let numeric_precision: Option<u32> = row.get_opt("numeric_precision")?;
        let numeric_scale: Option<u32> = row.get_opt("numeric_scale")?;

        let mut column = Self::new(name, db_type);
        column.allow_null = is_nullable.eq_ignore_ascii_case("YES");
        column.auto_increment = is_identity == Some(1);
        column.is_computed = is_computed == Some(1);
        column.comment = comment;
        if column.precision.is_none() {
            column.precision = numeric_precision;
        }
        if column.scale.is_none() {
            column.scale = numeric_scale;
        }
        column.default_value = column_default.as_deref().and_then(parse_default);
        Ok(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abstract_type_narrowing() {
        assert_eq!(AbstractType::from_db_type("bit"), AbstractType::Boolean);
        assert_eq!(AbstractType::from_db_type("tinyint(1)"), AbstractType::Boolean);
        assert_eq!(AbstractType::from_db_type("tinyint"), AbstractType::TinyInt);
        assert_eq!(AbstractType::from_db_type("bit(64)"), AbstractType::BigInt);
        assert_eq!(AbstractType::from_db_type("bit(32)"), AbstractType::Integer);
        assert_eq!(AbstractType::from_db_type("nvarchar(64)"), AbstractType::String);
        assert_eq!(AbstractType::from_db_type("datetime2"), AbstractType::DateTime);
        assert_eq!(AbstractType::from_db_type("uniqueidentifier"), AbstractType::Uuid);
        assert_eq!(AbstractType::from_db_type("xml"), AbstractType::String);
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_db_type("decimal(10,2)"), ("decimal".into(), Some(10), Some(2)));
        assert_eq!(parse_db_type("NVARCHAR(max)"), ("nvarchar".into(), None, None));
        assert_eq!(parse_db_type("int"), ("int".into(), None, None));
    }

    #[test]
    fn parses_defaults() {
        assert_eq!(parse_default("((1))"), Some(DefaultValue::Literal(Value::Int(1))));
        assert_eq!(parse_default("((1.5))"), Some(DefaultValue::Literal(Value::Float(1.5))));
        assert_eq!(
            parse_default("(N'it''s')"),
            Some(DefaultValue::Literal(Value::Text("it's".into())))
        );
        assert_eq!(parse_default("('abc')"), Some(DefaultValue::Literal(Value::Text("abc".into()))));
        assert_eq!(parse_default("(NULL)"), None);
        assert_eq!(
            parse_default("(getdate())"),
            Some(DefaultValue::Expression("getdate()".into()))
        );
        assert_eq!(
            parse_default("((1)+(2))"),
            Some(DefaultValue::Expression("(1)+(2)".into()))
        );
    }
}
