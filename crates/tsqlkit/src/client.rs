//! The execution collaborator: anything that can run T-SQL and return rows.

use crate::error::{TsqlError, TsqlResult};
use crate::qb::Params;
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// Query used by the default [`Executor::server_version_string`].
pub const SERVER_VERSION_SQL: &str =
    "SELECT CAST(SERVERPROPERTY('ProductVersion') AS nvarchar(128))";

/// A trait that abstracts over SQL Server connections.
///
/// Statements carry named placeholders (`:qp0`, `:name`); implementations
/// bind [`Params`] by name. Failures are returned as
/// [`TsqlError::Upstream`] and are never retried by this crate.
pub trait Executor: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &Params,
    ) -> impl std::future::Future<Output = TsqlResult<u64>> + Send;

    /// Execute a query and return all rows of the last result set.
    fn query_all(
        &self,
        sql: &str,
        params: &Params,
    ) -> impl std::future::Future<Output = TsqlResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_one(
        &self,
        sql: &str,
        params: &Params,
    ) -> impl std::future::Future<Output = TsqlResult<Option<Row>>> + Send {
        async move { Ok(self.query_all(sql, params).await?.into_iter().next()) }
    }

    /// Execute a query and return the first column of the first row.
    fn query_scalar(
        &self,
        sql: &str,
        params: &Params,
    ) -> impl std::future::Future<Output = TsqlResult<Option<Value>>> + Send {
        async move {
            Ok(self
                .query_one(sql, params)
                .await?
                .and_then(|row| row.into_values().into_iter().next()))
        }
    }

    /// Render a value as an inline literal.
    fn quote_value(&self, value: &Value) -> String {
        crate::value::quote_value(value)
    }

    /// The server's product version string, e.g. `16.0.1000.6`.
    fn server_version_string(
        &self,
    ) -> impl std::future::Future<Output = TsqlResult<String>> + Send {
        async move {
            let params = Params::new();
            match self.query_scalar(SERVER_VERSION_SQL, &params).await? {
                Some(value) => String::from_value(&value)
                    .map_err(|e| TsqlError::decode("ProductVersion", e.to_string())),
                None => Err(TsqlError::Other(
                    "server returned no product version".to_string(),
                )),
            }
        }
    }
}

/// A result row: column names shared across a result set plus values.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self::new(columns.into(), values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name (ASCII case-insensitive).
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column name, mapping failures to [`TsqlError::Decode`].
    pub fn try_get_column<T: FromValue>(&self, column: &str) -> TsqlResult<T> {
        let value = self
            .get(column)
            .ok_or_else(|| TsqlError::decode(column, "column not present in row"))?;
        T::from_value(value).map_err(|e| TsqlError::decode(column, e.to_string()))
    }

    /// Like [`Row::try_get_column`] but a missing column reads as `None`.
    pub fn get_opt<T: FromValue>(&self, column: &str) -> TsqlResult<Option<T>> {
        match self.get(column) {
            None => Ok(None),
            Some(value) => {
                Option::<T>::from_value(value).map_err(|e| TsqlError::decode(column, e.to_string()))
            }
        }
    }
}
