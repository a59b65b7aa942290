//! # tsqlkit
//!
//! SQL Server (T-SQL) dialect support: statement builders and catalog
//! introspection over any async executor.
//!
//! ## Features
//!
//! - **Bracket quoting**: `schema.table` becomes `[schema].[table]`, with `]` doubled
//! - **Version aware**: `OFFSET ... FETCH` and `GREATEST`/`LEAST` only where the server has them
//! - **Upserts**: `MERGE ... WITH (HOLDLOCK)` keyed on the table's unique constraints
//! - **Returning inserts**: `OUTPUT INSERTED.*` routed through a table variable
//! - **Catalog loading**: columns, keys, constraints and indexes from `INFORMATION_SCHEMA` and `sys.*`
//! - **Schema cache**: table metadata memoized per connection, including "table not found"
//!
//! ## Building statements
//!
//! ```
//! use tsqlkit::{Condition, QueryBuilder};
//! use tsqlkit::qb;
//!
//! let builder = QueryBuilder::default();
//! let stmt = builder
//!     .build_select(
//!         &qb::select("users")
//!             .columns(&["id", "name"])
//!             .and_where(Condition::eq("status", "active"))
//!             .order_by_asc("id")
//!             .limit(10),
//!     )
//!     .unwrap();
//! assert_eq!(
//!     stmt.sql,
//!     "SELECT [id], [name] FROM [users] WHERE [status] = :qp0 ORDER BY [id] ASC \
//!      OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
//! );
//! ```
//!
//! ## Talking to a server
//!
//! [`Connection`] wraps an [`Executor`] and adds metadata lookups, caching and
//! statement logging:
//!
//! ```ignore
//! let conn = tsqlkit::Connection::new(executor);
//! let table = conn.get_table_schema("dbo.orders").await?;
//! let key = conn.insert(&qb::insert("orders").set("name", "first")).await?;
//! ```
//!
//! With the `tiberius` feature, [`driver::TiberiusExecutor`] provides an
//! executor over a `tiberius::Client`.

pub mod client;
pub mod condition;
pub mod connection;
pub mod driver;
pub mod error;
pub mod ident;
pub mod prelude;
pub mod qb;
pub mod schema;
pub mod value;
pub mod version;

#[cfg(test)]
mod testing;

pub use client::{Executor, Row};
pub use condition::{CompareOp, Condition, Function, FunctionKind, Like, LikeMode, Operand, in_row};
pub use connection::{Connection, ConnectionConfig};
pub use error::{TsqlError, TsqlResult};
pub use ident::{QualifiedName, quote_column_name, quote_simple_name, quote_table_name};
pub use qb::{Params, QueryBuilder, Statement};
pub use schema::{
    AbstractType, ColumnDescriptor, Constraint, ConstraintKind, DefaultValue, MemorySchemaCache,
    SchemaCache, SchemaLoader, TableConstraints, TableDescriptor,
};
pub use value::{FromValue, Value};
pub use version::ServerVersion;

#[cfg(feature = "tiberius")]
pub use driver::TiberiusExecutor;
