//! Scalar values bound into statements and decoded from result rows.

use crate::error::{TsqlError, TsqlResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scalar value carried as a bound parameter or returned in a [`Row`](crate::Row).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Binary(Vec<u8>),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
            Value::Uuid(_) => "uuid",
            Value::DateTime(_) => "datetime",
            Value::Json(_) => "json",
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::DateTime(v.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Render a value as an inline T-SQL literal.
///
/// Used where a bound parameter cannot appear: `DEFAULT` constraints,
/// extended-property calls and `DBCC` arguments.
pub fn quote_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => quote_string(s),
        Value::Binary(bytes) => format!("0x{}", hex::encode(bytes)),
        Value::Uuid(u) => format!("'{u}'"),
        Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
        Value::Json(v) => quote_string(&v.to_string()),
    }
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Conversion from a [`Value`] into a Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> TsqlResult<Self>;
}

fn mismatch(expected: &str, got: &Value) -> TsqlError {
    TsqlError::Other(format!("expected {expected}, got {}", got.kind()))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Uuid(u) => Ok(u.to_string()),
            Value::Json(v) => Ok(v.to_string()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Text(s) => s.trim().parse().map_err(|_| mismatch("int", value)),
            other => Err(mismatch("int", other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| TsqlError::Other(format!("{wide} does not fit in i32")))
    }
}

impl FromValue for u32 {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        let wide = i64::from_value(value)?;
        u32::try_from(wide).map_err(|_| TsqlError::Other(format!("{wide} does not fit in u32")))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Binary(b) => Ok(b.clone()),
            other => Err(mismatch("binary", other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s).map_err(|e| TsqlError::Other(e.to_string())),
            other => Err(mismatch("uuid", other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            other => Err(mismatch("datetime", other)),
        }
    }
}

/// SQL Server has no JSON type; documents arrive as `nvarchar` text.
impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            Value::Text(s) => Ok(serde_json::from_str(s)?),
            other => Err(mismatch("json", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> TsqlResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
