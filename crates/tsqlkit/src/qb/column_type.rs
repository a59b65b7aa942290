//! Abstract column types and their SQL Server spelling.

use crate::schema::DefaultValue;
use crate::value::quote_value;
use regex::Regex;
use std::sync::OnceLock;

/// Abstract column kinds accepted by DDL builders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Pk,
    BigPk,
    Char,
    String,
    Text,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    DateTime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
    Money,
    Uuid,
    Json,
    /// A native type spelled out verbatim, e.g. `datetimeoffset(7)`.
    Raw(String),
}

impl ColumnKind {
    /// Map an abstract keyword (`pk`, `string`, `boolean`...) to a kind.
    /// Unknown keywords become [`ColumnKind::Raw`].
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_lowercase().as_str() {
            "pk" | "upk" => ColumnKind::Pk,
            "bigpk" | "ubigpk" => ColumnKind::BigPk,
            "char" => ColumnKind::Char,
            "string" => ColumnKind::String,
            "text" => ColumnKind::Text,
            "tinyint" => ColumnKind::TinyInt,
            "smallint" => ColumnKind::SmallInt,
            "integer" => ColumnKind::Integer,
            "bigint" => ColumnKind::BigInt,
            "float" => ColumnKind::Float,
            "double" => ColumnKind::Double,
            "decimal" => ColumnKind::Decimal,
            "datetime" => ColumnKind::DateTime,
            "timestamp" => ColumnKind::Timestamp,
            "time" => ColumnKind::Time,
            "date" => ColumnKind::Date,
            "binary" => ColumnKind::Binary,
            "boolean" => ColumnKind::Boolean,
            "money" => ColumnKind::Money,
            "uuid" => ColumnKind::Uuid,
            "json" => ColumnKind::Json,
            _ => ColumnKind::Raw(keyword.to_string()),
        }
    }

    /// The SQL Server type this kind maps to.
    pub fn dialect_type(&self) -> &str {
        match self {
            ColumnKind::Pk => "int IDENTITY PRIMARY KEY",
            ColumnKind::BigPk => "bigint IDENTITY PRIMARY KEY",
            ColumnKind::Char => "nchar(1)",
            ColumnKind::String => "nvarchar(255)",
            ColumnKind::Text => "nvarchar(max)",
            ColumnKind::TinyInt => "tinyint",
            ColumnKind::SmallInt => "smallint",
            ColumnKind::Integer => "int",
            ColumnKind::BigInt => "bigint",
            ColumnKind::Float | ColumnKind::Double => "float",
            ColumnKind::Decimal => "decimal(18,0)",
            ColumnKind::DateTime | ColumnKind::Timestamp => "datetime",
            ColumnKind::Time => "time",
            ColumnKind::Date => "date",
            ColumnKind::Binary => "varbinary(max)",
            ColumnKind::Boolean => "bit",
            ColumnKind::Money => "decimal(19,4)",
            ColumnKind::Uuid => "uniqueidentifier",
            ColumnKind::Json => "nvarchar(max)",
            ColumnKind::Raw(raw) => raw,
        }
    }
}

fn sized_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\((.+?)\)(.*)$").expect("invalid built-in type regex"))
}

fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\s+(.*)$").expect("invalid built-in type regex"))
}

fn paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(.+\)").expect("invalid built-in type regex"))
}

fn with_size(mapped: &str, size: &str) -> String {
    if paren_re().is_match(mapped) {
        paren_re().replace(mapped, format!("({size})").as_str()).into_owned()
    } else {
        mapped.to_string()
    }
}

/// Translate an abstract type string such as `string(64) NOT NULL` into
/// SQL Server syntax. Unknown leading keywords pass through unchanged.
pub fn map_column_type(spec: &str) -> String {
    let spec = spec.trim();
    if let ColumnKind::Raw(_) = ColumnKind::from_keyword(spec) {
        if let Some(caps) = sized_re().captures(spec) {
            let kind = ColumnKind::from_keyword(&caps[1]);
            if !matches!(kind, ColumnKind::Raw(_)) {
                return format!("{}{}", with_size(kind.dialect_type(), &caps[2]), &caps[3]);
            }
        } else if let Some(caps) = prefix_re().captures(spec) {
            let kind = ColumnKind::from_keyword(&caps[1]);
            if !matches!(kind, ColumnKind::Raw(_)) {
                return format!("{} {}", kind.dialect_type(), &caps[2]);
            }
        }
        return spec.to_string();
    }
    ColumnKind::from_keyword(spec).dialect_type().to_string()
}

/// Column definition for CREATE TABLE / ADD COLUMN / ALTER COLUMN.
///
/// ```
/// use tsqlkit::qb::ColumnType;
///
/// let ty = ColumnType::string().size(64).not_null().unique();
/// assert_eq!(ty.to_sql(), "nvarchar(64) NOT NULL UNIQUE");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnType {
    kind: ColumnKind,
    size: Option<String>,
    not_null: Option<bool>,
    unique: bool,
    default: Option<DefaultValue>,
    check: Option<String>,
    append: Option<String>,
}

impl ColumnType {
    pub fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            size: None,
            not_null: None,
            unique: false,
            default: None,
            check: None,
            append: None,
        }
    }

    pub fn primary_key() -> Self {
        Self::new(ColumnKind::Pk)
    }

    pub fn big_primary_key() -> Self {
        Self::new(ColumnKind::BigPk)
    }

    pub fn string() -> Self {
        Self::new(ColumnKind::String)
    }

    pub fn text() -> Self {
        Self::new(ColumnKind::Text)
    }

    pub fn integer() -> Self {
        Self::new(ColumnKind::Integer)
    }

    pub fn big_integer() -> Self {
        Self::new(ColumnKind::BigInt)
    }

    pub fn boolean() -> Self {
        Self::new(ColumnKind::Boolean)
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::new(ColumnKind::Decimal).size(format!("{precision},{scale}"))
    }

    pub fn datetime() -> Self {
        Self::new(ColumnKind::DateTime)
    }

    pub fn binary() -> Self {
        Self::new(ColumnKind::Binary)
    }

    pub fn uuid() -> Self {
        Self::new(ColumnKind::Uuid)
    }

    /// Replace the parenthesised size of the mapped type.
    pub fn size(mut self, size: impl ToString) -> Self {
        self.size = Some(size.to_string());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = Some(true);
        self
    }

    pub fn null(mut self) -> Self {
        self.not_null = Some(false);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<crate::value::Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_expression(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    /// Extra SQL appended after the definition.
    pub fn append(mut self, sql: impl Into<String>) -> Self {
        self.append = Some(sql.into());
        self
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn get_default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn get_check(&self) -> Option<&str> {
        self.check.as_deref()
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    fn base_type(&self) -> String {
        let mapped = self.kind.dialect_type();
        match &self.size {
            Some(size) => with_size(mapped, size),
            None => mapped.to_string(),
        }
    }

    fn null_sql(&self) -> &'static str {
        match self.not_null {
            Some(true) => " NOT NULL",
            Some(false) => " NULL",
            None => "",
        }
    }

    /// Full definition: type, nullability, UNIQUE, DEFAULT, CHECK, appendix.
    pub fn to_sql(&self) -> String {
        let mut sql = self.base_type();
        sql.push_str(self.null_sql());
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default_sql(default));
        }
        if let Some(check) = &self.check {
            sql.push_str(&format!(" CHECK ({check})"));
        }
        if let Some(append) = &self.append {
            sql.push(' ');
            sql.push_str(append);
        }
        sql
    }

    /// Definition for `ALTER COLUMN`: constraints are added separately.
    pub fn to_alter_sql(&self) -> String {
        let mut sql = self.base_type();
        sql.push_str(self.null_sql());
        if let Some(append) = &self.append {
            sql.push(' ');
            sql.push_str(append);
        }
        sql
    }
}

impl From<ColumnKind> for ColumnType {
    fn from(kind: ColumnKind) -> Self {
        ColumnType::new(kind)
    }
}

impl From<&str> for ColumnType {
    /// Parses an abstract type string such as `string(64) NOT NULL`; the
    /// result is carried as a raw type.
    fn from(spec: &str) -> Self {
        ColumnType::new(ColumnKind::Raw(map_column_type(spec)))
    }
}

pub(crate) fn default_sql(default: &DefaultValue) -> String {
    match default {
        DefaultValue::Literal(value) => quote_value(value),
        DefaultValue::Expression(expr) => expr.clone(),
    }
}
