//! Schema-aware façade over an [`Executor`].
//!
//! [`Connection`] owns the executor, a [`SchemaCache`] and the cached server
//! version string. It resolves table metadata for the pure builders in
//! [`qb`](crate::qb) and runs the resulting statements.
//!
//! # Example
//!
//! ```ignore
//! use tsqlkit::{Connection, ConnectionConfig, qb};
//!
//! let conn = Connection::with_config(executor, ConnectionConfig::new().with_logging());
//! let key = conn.insert(&qb::insert("users").set("name", "alice")).await?;
//! ```

mod config;

pub use config::ConnectionConfig;

use crate::client::{Executor, Row};
use crate::error::{TsqlError, TsqlResult};
use crate::ident::QualifiedName;
use crate::qb::{
    BatchInsertQb, DEFAULT_SCHEMA, DeleteQb, InsertQb, QueryBuilder, SelectQb, Statement,
    UpdateQb, UpsertUpdate,
};
use crate::schema::{
    CachedTable, Constraint, ConstraintKind, DefaultValue, IndexConstraint, MemorySchemaCache,
    SchemaCache, SchemaLoader, TableConstraints, TableDescriptor,
};
use crate::value::Value;
use crate::version::ServerVersion;
use std::sync::{Arc, PoisonError, RwLock};

/// Cut `sql` to at most `max` characters, marking the cut with `...`.
fn truncate_sql(sql: &str, max: usize) -> String {
    match sql.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// A SQL Server connection with metadata caching and dialect builders.
pub struct Connection<E: Executor> {
    executor: E,
    config: ConnectionConfig,
    cache: Arc<dyn SchemaCache>,
    server_version: RwLock<Option<String>>,
    default_schema: RwLock<Option<String>>,
}

impl<E: Executor> Connection<E> {
    pub fn new(executor: E) -> Self {
        Self::with_config(executor, ConnectionConfig::default())
    }

    pub fn with_config(executor: E, config: ConnectionConfig) -> Self {
        Self {
            executor,
            config,
            cache: Arc::new(MemorySchemaCache::new()),
            server_version: RwLock::new(None),
            default_schema: RwLock::new(None),
        }
    }

    /// Use a shared or custom metadata cache.
    pub fn with_cache(mut self, cache: Arc<dyn SchemaCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn SchemaCache> {
        &self.cache
    }

    // ==================== Environment ====================

    /// The server version. The version string is fetched once and kept;
    /// every caller re-parses it.
    pub async fn server_version(&self) -> TsqlResult<ServerVersion> {
        let cached = self
            .server_version
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let raw = match cached {
            Some(raw) => raw,
            None => {
                let raw = self.executor.server_version_string().await?;
                tracing::debug!(version = %raw, "fetched server version");
                *self.server_version.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(raw.clone());
                raw
            }
        };
        ServerVersion::parse(&raw)
    }

    /// Forget the cached version string, e.g. after reconnecting.
    pub fn reset_server_version(&self) {
        *self.server_version.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Schema used for unqualified names.
    pub async fn default_schema(&self) -> TsqlResult<String> {
        if let Some(schema) = &self.config.default_schema {
            return Ok(schema.clone());
        }
        let cached = self
            .default_schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(schema) = cached {
            return Ok(schema);
        }
        let schema = SchemaLoader::new(&self.executor)
            .query_default_schema()
            .await?
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        *self.default_schema.write().unwrap_or_else(PoisonError::into_inner) = Some(schema.clone());
        Ok(schema)
    }

    /// A builder for the connected server and default schema.
    pub async fn query_builder(&self) -> TsqlResult<QueryBuilder> {
        Ok(QueryBuilder::new(self.server_version().await?)
            .with_default_schema(self.default_schema().await?))
    }

    async fn loader(&self) -> TsqlResult<SchemaLoader<'_, E>> {
        Ok(SchemaLoader::new(&self.executor).with_default_schema(self.default_schema().await?))
    }

    async fn cache_key(&self, name: &str) -> TsqlResult<String> {
        Ok(QualifiedName::parse(name)
            .with_default_schema(&self.default_schema().await?)
            .full_name())
    }

    // ==================== Metadata ====================

    /// Table metadata, `None` when the table does not exist.
    pub async fn get_table_schema(&self, name: &str) -> TsqlResult<Option<Arc<TableDescriptor>>> {
        let key = self.cache_key(name).await?;
        if self.config.schema_cache_enabled {
            if let Some(entry) = self.cache.get_table(&key) {
                return Ok(entry.descriptor());
            }
        }

        let table = self.loader().await?.load_table_schema(name).await?.map(Arc::new);
        if self.config.schema_cache_enabled {
            let entry = match &table {
                Some(t) => CachedTable::Found(Arc::clone(t)),
                None => CachedTable::NotFound,
            };
            self.cache.put_table(&key, entry);
        }
        Ok(table)
    }

    /// Drop cached metadata for a table and load it again.
    pub async fn refresh_table_schema(&self, name: &str) -> TsqlResult<Option<Arc<TableDescriptor>>> {
        self.cache.invalidate(&self.cache_key(name).await?);
        self.get_table_schema(name).await
    }

    async fn require_table_schema(&self, name: &str) -> TsqlResult<Arc<TableDescriptor>> {
        self.get_table_schema(name)
            .await?
            .ok_or_else(|| TsqlError::invalid_argument(format!("Table not found: {name}")))
    }

    /// Primary key, unique, check, default and foreign key constraints.
    pub async fn table_constraints(&self, name: &str) -> TsqlResult<Arc<TableConstraints>> {
        let key = self.cache_key(name).await?;
        if self.config.schema_cache_enabled {
            if let Some(constraints) = self.cache.get_constraints(&key) {
                return Ok(constraints);
            }
        }
        let constraints = Arc::new(self.loader().await?.load_table_constraints(name).await?);
        if self.config.schema_cache_enabled {
            self.cache.put_constraints(&key, Arc::clone(&constraints));
        }
        Ok(constraints)
    }

    /// Constraints of one kind; indexes are loaded on every call.
    pub async fn get_table_constraints(
        &self,
        name: &str,
        kind: ConstraintKind,
    ) -> TsqlResult<Vec<Constraint>> {
        if kind == ConstraintKind::Index {
            let indexes = self.table_indexes(name).await?;
            return Ok(indexes.into_iter().map(Constraint::Index).collect());
        }
        Ok(self.table_constraints(name).await?.of_kind(kind))
    }

    pub async fn table_indexes(&self, name: &str) -> TsqlResult<Vec<IndexConstraint>> {
        self.loader().await?.load_table_indexes(name).await
    }

    pub async fn table_names(&self, schema: Option<&str>) -> TsqlResult<Vec<String>> {
        self.loader().await?.find_table_names(schema).await
    }

    pub async fn view_names(&self, schema: Option<&str>) -> TsqlResult<Vec<String>> {
        self.loader().await?.find_view_names(schema).await
    }

    pub async fn schema_names(&self) -> TsqlResult<Vec<String>> {
        self.loader().await?.find_schema_names().await
    }

    pub async fn table_comment(&self, name: &str) -> TsqlResult<Option<String>> {
        self.loader().await?.find_table_comment(name).await
    }

    // ==================== Schema-aware builders ====================

    pub async fn build_select(&self, query: &SelectQb) -> TsqlResult<Statement> {
        self.query_builder().await?.build_select(query)
    }

    pub async fn build_insert(&self, insert: &InsertQb) -> TsqlResult<Statement> {
        let table = self.get_table_schema(insert.table()).await?;
        self.query_builder().await?.build_insert(insert, table.as_deref())
    }

    pub async fn build_batch_insert(&self, batch: &BatchInsertQb) -> TsqlResult<Statement> {
        let table = self.get_table_schema(batch.table()).await?;
        self.query_builder()
            .await?
            .build_batch_insert(batch, table.as_deref())
    }

    pub async fn build_update(&self, update: &UpdateQb) -> TsqlResult<Statement> {
        let table = self.get_table_schema(update.table()).await?;
        self.query_builder().await?.build_update(update, table.as_deref())
    }

    pub async fn build_delete(&self, delete: &DeleteQb) -> TsqlResult<Statement> {
        self.query_builder().await?.build_delete(delete)
    }

    pub async fn build_upsert(&self, insert: &InsertQb, update: &UpsertUpdate) -> TsqlResult<Statement> {
        let table = self.get_table_schema(insert.table()).await?;
        let constraints = self.table_constraints(insert.table()).await?;
        self.query_builder()
            .await?
            .build_upsert(insert, update, table.as_deref(), &constraints)
    }

    pub async fn build_insert_returning(
        &self,
        insert: &InsertQb,
        returning: &[&str],
    ) -> TsqlResult<Statement> {
        let table = self.get_table_schema(insert.table()).await?;
        self.query_builder()
            .await?
            .build_insert_returning(insert, table.as_deref(), returning)
    }

    pub async fn build_upsert_returning(
        &self,
        insert: &InsertQb,
        update: &UpsertUpdate,
        returning: &[&str],
    ) -> TsqlResult<Statement> {
        let table = self.get_table_schema(insert.table()).await?;
        let constraints = self.table_constraints(insert.table()).await?;
        self.query_builder().await?.build_upsert_returning(
            insert,
            update,
            table.as_deref(),
            &constraints,
            returning,
        )
    }

    pub async fn build_add_comment_on_table(&self, table: &str, comment: &str) -> TsqlResult<Statement> {
        let descriptor = self.get_table_schema(table).await?;
        self.query_builder()
            .await?
            .add_comment_on_table(table, descriptor.as_deref(), comment)
    }

    pub async fn build_add_comment_on_column(
        &self,
        table: &str,
        column: &str,
        comment: &str,
    ) -> TsqlResult<Statement> {
        let descriptor = self.get_table_schema(table).await?;
        self.query_builder()
            .await?
            .add_comment_on_column(table, descriptor.as_deref(), column, comment)
    }

    pub async fn build_drop_comment_from_table(&self, table: &str) -> TsqlResult<Statement> {
        let descriptor = self.get_table_schema(table).await?;
        self.query_builder()
            .await?
            .drop_comment_from_table(table, descriptor.as_deref())
    }

    pub async fn build_drop_comment_from_column(&self, table: &str, column: &str) -> TsqlResult<Statement> {
        let descriptor = self.get_table_schema(table).await?;
        self.query_builder()
            .await?
            .drop_comment_from_column(table, descriptor.as_deref(), column)
    }

    /// `ADD CONSTRAINT ... DEFAULT ... FOR ...` after checking that the
    /// table and column exist.
    pub async fn build_add_default_value(
        &self,
        name: &str,
        table: &str,
        column: &str,
        value: &DefaultValue,
    ) -> TsqlResult<Statement> {
        let descriptor = self.require_table_schema(table).await?;
        if descriptor.column(column).is_none() {
            return Err(TsqlError::invalid_argument(format!(
                "Column not found: {}.{column}",
                descriptor.name
            )));
        }
        Ok(self
            .query_builder()
            .await?
            .add_default_value(name, table, column, value))
    }

    /// Toggle constraint checking on every base table of `schema`.
    pub async fn build_check_integrity(&self, check: bool, schema: Option<&str>) -> TsqlResult<Statement> {
        let qb = self.query_builder().await?;
        let schema = schema.unwrap_or(qb.default_schema()).to_string();
        let tables = self.table_names(Some(&schema)).await?;
        Ok(qb.check_integrity(check, Some(&schema), &tables))
    }

    pub async fn build_reset_sequence(&self, table: &str, value: Option<i64>) -> TsqlResult<Statement> {
        let descriptor = self.get_table_schema(table).await?;
        self.query_builder()
            .await?
            .reset_sequence(table, descriptor.as_deref(), value)
    }

    // ==================== Execution ====================

    fn log_statement(&self, op: &'static str, stmt: &Statement) {
        if self.config.logging_enabled {
            tracing::debug!(
                target: "tsqlkit.sql",
                op,
                param_count = stmt.params.len(),
                sql = %truncate_sql(&stmt.sql, self.config.max_sql_length),
                "executing statement"
            );
        }
    }

    pub async fn execute(&self, stmt: &Statement) -> TsqlResult<u64> {
        self.log_statement("execute", stmt);
        self.executor.execute(&stmt.sql, &stmt.params).await
    }

    pub async fn query_all(&self, stmt: &Statement) -> TsqlResult<Vec<Row>> {
        self.log_statement("query_all", stmt);
        self.executor.query_all(&stmt.sql, &stmt.params).await
    }

    pub async fn query_one(&self, stmt: &Statement) -> TsqlResult<Option<Row>> {
        self.log_statement("query_one", stmt);
        self.executor.query_one(&stmt.sql, &stmt.params).await
    }

    pub async fn query_scalar(&self, stmt: &Statement) -> TsqlResult<Option<Value>> {
        self.log_statement("query_scalar", stmt);
        self.executor.query_scalar(&stmt.sql, &stmt.params).await
    }

    /// Insert one row and return its primary key as `(column, value)` pairs.
    ///
    /// An identity column always takes the value the server returned. Other
    /// key columns take the supplied value, then the column's literal
    /// default, then the returned value. Returns `None` when nothing was
    /// inserted; a table without a primary key yields an empty key.
    pub async fn insert(&self, insert: &InsertQb) -> TsqlResult<Option<Vec<(String, Value)>>> {
        let table = self.require_table_schema(insert.table()).await?;
        let qb = self.query_builder().await?;

        if table.primary_key.is_empty() {
            let stmt = qb.build_insert(insert, Some(table.as_ref()))?;
            let affected = self.execute(&stmt).await?;
            return Ok((affected > 0).then(Vec::new));
        }

        let key_columns: Vec<&str> = table.primary_key.iter().map(String::as_str).collect();
        let stmt = qb.build_insert_returning(insert, Some(table.as_ref()), &key_columns)?;
        let Some(returned) = self.query_one(&stmt).await? else {
            return Ok(None);
        };

        let mut key = Vec::with_capacity(key_columns.len());
        for column in table.primary_key_columns() {
            let from_server = || returned.get(&column.name).cloned().unwrap_or(Value::Null);
            let value = if column.auto_increment {
                from_server()
            } else if let Some(supplied) = insert.value_of(&column.name) {
                supplied.clone()
            } else if let Some(DefaultValue::Literal(default)) = &column.default_value {
                default.clone()
            } else {
                from_server()
            };
            key.push((column.name.clone(), value));
        }
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests;
