use super::rewrite_named_params;
use crate::client::{Executor, Row};
use crate::error::{TsqlError, TsqlResult};
use crate::qb::Params;
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::io::{AsyncRead, AsyncWrite};
use std::borrow::Cow;
use std::sync::Arc;
use tiberius::{Client, ColumnData, FromSql, ToSql};
use tokio::sync::Mutex;

impl ToSql for Value {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            Value::Null => ColumnData::String(None),
            Value::Bool(b) => ColumnData::Bit(Some(*b)),
            Value::Int(i) => ColumnData::I64(Some(*i)),
            Value::Float(f) => ColumnData::F64(Some(*f)),
            Value::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
            Value::Binary(b) => ColumnData::Binary(Some(Cow::Borrowed(b.as_slice()))),
            Value::Uuid(u) => ColumnData::Guid(Some(*u)),
            Value::DateTime(dt) => dt.to_sql(),
            Value::Json(v) => ColumnData::String(Some(Cow::Owned(v.to_string()))),
        }
    }
}

/// [`Executor`] over a single `tiberius::Client`.
///
/// The client is not re-entrant, so statements are serialized through an
/// async mutex. `:name` placeholders are rewritten to `@P{n}` before sending.
///
/// ```ignore
/// let config = tiberius::Config::from_ado_string(&url)?;
/// let tcp = tokio::net::TcpStream::connect(config.get_addr()).await?;
/// tcp.set_nodelay(true)?;
/// let client = tiberius::Client::connect(config, tcp.compat_write()).await?;
/// let conn = tsqlkit::Connection::new(TiberiusExecutor::new(client));
/// ```
pub struct TiberiusExecutor<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    client: Mutex<Client<S>>,
}

impl<S> TiberiusExecutor<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(client: Client<S>) -> Self {
        Self {
            client: Mutex::new(client),
        }
    }

    /// Give back the wrapped client.
    pub fn into_inner(self) -> Client<S> {
        self.client.into_inner()
    }
}

impl<S> Executor for TiberiusExecutor<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn execute(&self, sql: &str, params: &Params) -> TsqlResult<u64> {
        let sql = rewrite_named_params(sql, params)?;
        let values = params.values();
        let bind: Vec<&dyn ToSql> = values.iter().map(|v| *v as &dyn ToSql).collect();

        let mut client = self.client.lock().await;
        let result = client.execute(sql, &bind).await?;
        Ok(result.total())
    }

    async fn query_all(&self, sql: &str, params: &Params) -> TsqlResult<Vec<Row>> {
        let sql = rewrite_named_params(sql, params)?;
        let values = params.values();
        let bind: Vec<&dyn ToSql> = values.iter().map(|v| *v as &dyn ToSql).collect();

        let mut client = self.client.lock().await;
        let stream = client.query(sql, &bind).await?;
        let mut results = stream.into_results().await?;
        drop(client);

        results
            .pop()
            .unwrap_or_default()
            .into_iter()
            .map(convert_row)
            .collect()
    }
}

fn convert_row(row: tiberius::Row) -> TsqlResult<Row> {
    let columns: Arc<[String]> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut values = Vec::with_capacity(columns.len());
    for (i, data) in row.into_iter().enumerate() {
        values.push(convert_data(&columns[i], data)?);
    }
    Ok(Row::new(columns, values))
}

fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    value.map(f).unwrap_or(Value::Null)
}

fn from_sql<'a, T: FromSql<'a>>(column: &str, data: &'a ColumnData<'static>) -> TsqlResult<Option<T>> {
    T::from_sql(data).map_err(|e| TsqlError::decode(column, e.to_string()))
}

fn convert_data(column: &str, data: ColumnData<'static>) -> TsqlResult<Value> {
    Ok(match data {
        ColumnData::U8(v) => or_null(v, |v| Value::Int(v.into())),
        ColumnData::I16(v) => or_null(v, |v| Value::Int(v.into())),
        ColumnData::I32(v) => or_null(v, |v| Value::Int(v.into())),
        ColumnData::I64(v) => or_null(v, Value::Int),
        ColumnData::F32(v) => or_null(v, |v| Value::Float(v.into())),
        ColumnData::F64(v) => or_null(v, Value::Float),
        ColumnData::Bit(v) => or_null(v, Value::Bool),
        ColumnData::String(v) => or_null(v, |s| Value::Text(s.into_owned())),
        ColumnData::Binary(v) => or_null(v, |b| Value::Binary(b.into_owned())),
        ColumnData::Guid(v) => or_null(v, Value::Uuid),
        ColumnData::Numeric(v) => or_null(v, |n| {
            Value::Float(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }),
        ColumnData::Xml(v) => or_null(v, |x| Value::Text(x.into_owned().into_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            or_null(from_sql::<NaiveDateTime>(column, &data)?, Value::DateTime)
        }
        ColumnData::Date(_) => match from_sql::<NaiveDate>(column, &data)? {
            Some(date) => date
                .and_hms_opt(0, 0, 0)
                .map(Value::DateTime)
                .ok_or_else(|| TsqlError::decode(column, "date out of range"))?,
            None => Value::Null,
        },
        ColumnData::DateTimeOffset(_) => or_null(
            from_sql::<chrono::DateTime<Utc>>(column, &data)?,
            |dt| Value::DateTime(dt.naive_utc()),
        ),
        ColumnData::Time(_) => or_null(from_sql::<NaiveTime>(column, &data)?, |t| {
            Value::Text(t.to_string())
        }),
    })
}
