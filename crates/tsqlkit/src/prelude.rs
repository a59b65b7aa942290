//! Convenient imports for typical `tsqlkit` usage.
//!
//! ```ignore
//! use tsqlkit::prelude::*;
//! ```

pub use crate::qb::{self, UpsertUpdate};
pub use crate::{
    Condition, Connection, ConnectionConfig, Executor, FromValue, Operand, QueryBuilder, Row,
    Statement, TsqlError, TsqlResult, Value,
};
