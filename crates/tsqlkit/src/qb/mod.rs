//! T-SQL statement builders.
//!
//! The models ([`SelectQb`], [`InsertQb`], [`UpdateQb`], [`DeleteQb`]) are
//! plain data. [`QueryBuilder`] renders them into a [`Statement`] for a given
//! server version; every placeholder is named (`:qp0`, `:qp1`, ...).
//!
//! Builders are pure: anything that needs table metadata (upsert keys,
//! returning column types, comments) takes the descriptor as an argument.
//! [`Connection`](crate::Connection) loads that metadata and calls them.
//!
//! # Example
//!
//! ```
//! use tsqlkit::qb::{self, QueryBuilder};
//!
//! let stmt = QueryBuilder::default()
//!     .build_insert(&qb::insert("users").set("name", "alice").set("age", 30), None)
//!     .unwrap();
//! assert_eq!(stmt.sql, "INSERT INTO [users] ([name], [age]) VALUES (:qp0, :qp1)");
//! assert_eq!(stmt.params.len(), 2);
//! ```

pub mod column_type;
pub(crate) mod condition;
pub mod ddl;
pub mod dml;
pub(crate) mod function;
pub mod pagination;
pub mod param;
pub mod select;

pub use column_type::{ColumnKind, ColumnType, map_column_type};
pub use condition::like_pattern;
pub use ddl::ReferentialAction;
pub use dml::{BatchInsertQb, DeleteQb, InsertQb, UpdateQb, UpsertUpdate};
pub use pagination::{Direction, OrderBy};
pub use param::Params;
pub use select::{JoinKind, SelectQb};

use crate::condition::{Condition, Function};
use crate::error::TsqlResult;
use crate::ident;
use crate::version::ServerVersion;

/// Default schema of SQL Server databases.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Generated SQL text with its bound parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Params::new())
    }
}

/// Renders statement models for one server.
///
/// The version decides between native and emulated syntax on every call; it
/// is never cached as a decision, so a builder for a new version is cheap.
#[derive(Clone, Debug)]
pub struct QueryBuilder {
    pub(crate) version: ServerVersion,
    pub(crate) default_schema: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(ServerVersion::default())
    }
}

impl QueryBuilder {
    pub fn new(version: ServerVersion) -> Self {
        Self {
            version,
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn version(&self) -> ServerVersion {
        self.version
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub fn quote_table_name(&self, name: &str) -> String {
        ident::quote_table_name(name)
    }

    pub fn quote_column_name(&self, name: &str) -> String {
        ident::quote_column_name(name)
    }

    /// Translate an abstract column type (`string(64) NOT NULL`).
    pub fn column_type(&self, spec: &str) -> String {
        map_column_type(spec)
    }

    /// Render a condition on its own.
    pub fn build_condition(&self, cond: &Condition) -> TsqlResult<Statement> {
        let mut params = Params::new();
        let sql = self.build_condition_into(cond, &mut params)?;
        Ok(Statement::new(sql, params))
    }

    /// Render a condition, binding into an existing parameter list.
    pub fn build_condition_into(&self, cond: &Condition, params: &mut Params) -> TsqlResult<String> {
        condition::build_condition(cond, self.version, params)
    }

    /// Render a multi-operand function.
    pub fn build_function(&self, f: &Function) -> TsqlResult<Statement> {
        let mut params = Params::new();
        let sql = function::build_function(f, self.version, &mut params)?;
        Ok(Statement::new(sql, params))
    }

    pub fn build_select(&self, query: &SelectQb) -> TsqlResult<Statement> {
        let mut params = Params::new();
        let sql = select::build_select(query, self.version, &mut params)?;
        Ok(Statement::new(sql, params))
    }

    /// Append ORDER BY and pagination to a base SELECT.
    pub fn build_order_by_and_limit(
        &self,
        sql: &str,
        order_by: &[OrderBy],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> String {
        pagination::build_order_by_and_limit(sql, order_by, limit, offset, self.version)
    }

    /// `SELECT CASE WHEN EXISTS(<sql>) THEN 1 ELSE 0 END`
    pub fn select_exists(&self, sql: &str) -> String {
        format!("SELECT CASE WHEN EXISTS({sql}) THEN 1 ELSE 0 END")
    }
}

/// Start a SELECT on `table`.
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Start an INSERT into `table`.
pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Start a multi-row INSERT into `table`.
pub fn batch_insert(table: &str, columns: &[&str]) -> BatchInsertQb {
    BatchInsertQb::new(table, columns)
}

/// Start an UPDATE of `table`.
pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// Start a DELETE from `table`.
pub fn delete(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}

#[cfg(test)]
mod tests;
