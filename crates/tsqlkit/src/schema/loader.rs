//! Catalog queries for SQL Server tables, constraints and indexes.

use crate::client::{Executor, Row};
use crate::error::{TsqlError, TsqlResult};
use crate::ident::{QualifiedName, quote_simple_name};
use crate::qb::{DEFAULT_SCHEMA, Params};
use crate::schema::column::ColumnDescriptor;
use crate::schema::constraint::{
    IndexConstraint, TableConstraints, group_indexes, group_table_constraints,
};
use crate::schema::table::{TableDescriptor, TableForeignKey};
use crate::value::FromValue;

const COLUMNS_SQL: &str = r#"
SELECT
  [t1].[column_name],
  [t1].[is_nullable],
  CASE WHEN [t1].[data_type] IN ('char', 'varchar', 'nchar', 'nvarchar', 'binary', 'varbinary') THEN
    CASE WHEN [t1].[character_maximum_length] IS NULL OR [t1].[character_maximum_length] = -1 THEN
      [t1].[data_type]
    ELSE
      [t1].[data_type] + '(' + LTRIM(RTRIM(CONVERT(CHAR, [t1].[character_maximum_length]))) + ')'
    END
  ELSE
    [t1].[data_type]
  END AS [data_type],
  [t1].[column_default],
  [t1].[numeric_precision],
  [t1].[numeric_scale],
  COLUMNPROPERTY(OBJECT_ID([t1].[table_schema] + '.' + [t1].[table_name]), [t1].[column_name], 'IsIdentity') AS [is_identity],
  COLUMNPROPERTY(OBJECT_ID([t1].[table_schema] + '.' + [t1].[table_name]), [t1].[column_name], 'IsComputed') AS [is_computed],
  (
    SELECT CONVERT(VARCHAR, [t2].[value])
    FROM [sys].[extended_properties] AS [t2]
    WHERE [t2].[class] = 1
      AND [t2].[class_desc] = 'OBJECT_OR_COLUMN'
      AND [t2].[name] = 'MS_Description'
      AND [t2].[major_id] = OBJECT_ID([t1].[table_schema] + '.' + [t1].[table_name])
      AND [t2].[minor_id] = COLUMNPROPERTY(OBJECT_ID([t1].[table_schema] + '.' + [t1].[table_name]), [t1].[column_name], 'ColumnID')
  ) AS [comment]
FROM {columns} AS [t1]
WHERE [t1].[table_name] = :tableName AND [t1].[table_schema] = :schemaName
ORDER BY [t1].[ordinal_position]
"#;

const PRIMARY_KEYS_SQL: &str = r#"
SELECT [kcu].[column_name] AS [field_name]
FROM {key_column_usage} AS [kcu]
LEFT JOIN {table_constraints} AS [tc]
  ON [kcu].[table_schema] = [tc].[table_schema]
  AND [kcu].[table_name] = [tc].[table_name]
  AND [kcu].[constraint_name] = [tc].[constraint_name]
WHERE [tc].[constraint_type] = 'PRIMARY KEY'
  AND [kcu].[table_name] = :tableName
  AND [kcu].[table_schema] = :schemaName
ORDER BY [kcu].[ordinal_position]
"#;

const FOREIGN_KEYS_SQL: &str = r#"
SELECT
  [fk].[name] AS [fk_name],
  [cp].[name] AS [fk_column_name],
  OBJECT_SCHEMA_NAME([fk].[referenced_object_id]) AS [uq_schema_name],
  OBJECT_NAME([fk].[referenced_object_id]) AS [uq_table_name],
  [cr].[name] AS [uq_column_name]
FROM [sys].[foreign_keys] AS [fk]
INNER JOIN [sys].[foreign_key_columns] AS [fkc]
  ON [fk].[object_id] = [fkc].[constraint_object_id]
INNER JOIN [sys].[columns] AS [cp]
  ON [fk].[parent_object_id] = [cp].[object_id] AND [fkc].[parent_column_id] = [cp].[column_id]
INNER JOIN [sys].[columns] AS [cr]
  ON [fk].[referenced_object_id] = [cr].[object_id] AND [fkc].[referenced_column_id] = [cr].[column_id]
WHERE [fk].[parent_object_id] = OBJECT_ID(:object)
ORDER BY [fk].[name], [fkc].[constraint_column_id]
"#;

const TABLE_CONSTRAINTS_SQL: &str = r#"
SELECT
  [o].[name] AS [name],
  COALESCE([ccol].[name], [dcol].[name], [fccol].[name], [kiccol].[name]) AS [column_name],
  RTRIM([o].[type]) AS [type],
  OBJECT_SCHEMA_NAME([f].[referenced_object_id]) AS [foreign_table_schema],
  OBJECT_NAME([f].[referenced_object_id]) AS [foreign_table_name],
  [ffccol].[name] AS [foreign_column_name],
  [f].[update_referential_action_desc] AS [on_update],
  [f].[delete_referential_action_desc] AS [on_delete],
  [c].[definition] AS [check_expr],
  [d].[definition] AS [default_expr]
FROM (SELECT OBJECT_ID(:fullName) AS [object_id]) AS [t]
INNER JOIN [sys].[objects] AS [o]
  ON [o].[parent_object_id] = [t].[object_id] AND [o].[type] IN ('PK', 'UQ', 'C', 'D', 'F')
LEFT JOIN [sys].[check_constraints] AS [c]
  ON [c].[object_id] = [o].[object_id]
LEFT JOIN [sys].[columns] AS [ccol]
  ON [ccol].[object_id] = [c].[parent_object_id] AND [ccol].[column_id] = [c].[parent_column_id]
LEFT JOIN [sys].[default_constraints] AS [d]
  ON [d].[object_id] = [o].[object_id]
LEFT JOIN [sys].[columns] AS [dcol]
  ON [dcol].[object_id] = [d].[parent_object_id] AND [dcol].[column_id] = [d].[parent_column_id]
LEFT JOIN [sys].[key_constraints] AS [k]
  ON [k].[object_id] = [o].[object_id]
LEFT JOIN [sys].[index_columns] AS [kic]
  ON [kic].[object_id] = [k].[parent_object_id] AND [kic].[index_id] = [k].[unique_index_id]
LEFT JOIN [sys].[columns] AS [kiccol]
  ON [kiccol].[object_id] = [kic].[object_id] AND [kiccol].[column_id] = [kic].[column_id]
LEFT JOIN [sys].[foreign_keys] AS [f]
  ON [f].[object_id] = [o].[object_id]
LEFT JOIN [sys].[foreign_key_columns] AS [fc]
  ON [fc].[constraint_object_id] = [o].[object_id]
LEFT JOIN [sys].[columns] AS [fccol]
  ON [fccol].[object_id] = [fc].[parent_object_id] AND [fccol].[column_id] = [fc].[parent_column_id]
LEFT JOIN [sys].[columns] AS [ffccol]
  ON [ffccol].[object_id] = [fc].[referenced_object_id] AND [ffccol].[column_id] = [fc].[referenced_column_id]
ORDER BY [kic].[key_ordinal] ASC, [fc].[constraint_column_id] ASC
"#;

const INDEXES_SQL: &str = r#"
SELECT
  [i].[name] AS [name],
  [iccol].[name] AS [column_name],
  [i].[is_unique] AS [index_is_unique],
  [i].[is_primary_key] AS [index_is_primary]
FROM [sys].[indexes] AS [i]
INNER JOIN [sys].[index_columns] AS [ic]
  ON [ic].[object_id] = [i].[object_id] AND [ic].[index_id] = [i].[index_id]
INNER JOIN [sys].[columns] AS [iccol]
  ON [iccol].[object_id] = [ic].[object_id] AND [iccol].[column_id] = [ic].[column_id]
WHERE [i].[object_id] = OBJECT_ID(:fullName)
ORDER BY [i].[name], [ic].[key_ordinal] ASC
"#;

const TABLE_NAMES_SQL: &str = r#"
SELECT [t].[table_name]
FROM [INFORMATION_SCHEMA].[TABLES] AS [t]
WHERE [t].[table_schema] = :schema AND [t].[table_type] = 'BASE TABLE'
ORDER BY [t].[table_name]
"#;

const VIEW_NAMES_SQL: &str = r#"
SELECT [t].[table_name]
FROM [INFORMATION_SCHEMA].[TABLES] AS [t]
WHERE [t].[table_schema] = :schema AND [t].[table_type] = 'VIEW'
ORDER BY [t].[table_name]
"#;

const SCHEMA_NAMES_SQL: &str = r#"
SELECT [s].[name]
FROM [sys].[schemas] AS [s]
INNER JOIN [sys].[database_principals] AS [p] ON [p].[principal_id] = [s].[principal_id]
WHERE [p].[is_fixed_role] = 0 AND [p].[sid] IS NOT NULL
ORDER BY [s].[name] ASC
"#;

const TABLE_COMMENT_SQL: &str = r#"
SELECT CONVERT(NVARCHAR(4000), [value]) AS [comment]
FROM [sys].[extended_properties]
WHERE [class] = 1
  AND [name] = 'MS_Description'
  AND [major_id] = OBJECT_ID(:fullName)
  AND [minor_id] = 0
"#;

/// Query for the session's default schema.
pub const DEFAULT_SCHEMA_SQL: &str = "SELECT SCHEMA_NAME()";

/// `INFORMATION_SCHEMA.<view>`, qualified by the table's catalog when it has one.
fn information_schema(name: &QualifiedName, view: &str) -> String {
    match name.catalog() {
        Some(catalog) => format!("{}.[INFORMATION_SCHEMA].[{view}]", quote_simple_name(catalog)),
        None => format!("[INFORMATION_SCHEMA].[{view}]"),
    }
}

fn first_column_strings(rows: Vec<Row>) -> TsqlResult<Vec<String>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(value) = row.values().first() {
            let column = row.columns().first().cloned().unwrap_or_default();
            out.push(String::from_value(value).map_err(|e| TsqlError::decode(column, e.to_string()))?);
        }
    }
    Ok(out)
}

/// Issues catalog queries through an [`Executor`] and assembles descriptors.
///
/// The loader holds no state besides the default schema and does not cache;
/// see [`SchemaCache`](crate::schema::SchemaCache).
pub struct SchemaLoader<'a, E: Executor> {
    executor: &'a E,
    default_schema: String,
}

impl<'a, E: Executor> SchemaLoader<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    /// Schema used for names without a schema part.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Resolve a raw table name against the default schema.
    pub fn resolve(&self, name: &str) -> QualifiedName {
        QualifiedName::parse(name).with_default_schema(&self.default_schema)
    }

    fn name_params(name: &QualifiedName) -> Params {
        let mut params = Params::new();
        params.push_named("tableName", name.name());
        params.push_named("schemaName", name.schema().unwrap_or(DEFAULT_SCHEMA));
        params
    }

    fn full_name_params(key: &str, name: &QualifiedName) -> Params {
        let mut params = Params::new();
        params.push_named(key, name.quoted());
        params
    }

    /// Load a table's descriptor. `None` when the table has no columns or
    /// when the column query fails.
    pub async fn load_table_schema(&self, name: &str) -> TsqlResult<Option<TableDescriptor>> {
        let name = self.resolve(name);
        tracing::debug!(table = %name, "loading table schema");

        let primary_key = match self.find_primary_keys(&name).await {
            Ok(pk) => pk,
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "primary key lookup failed; treating table as missing");
                return Ok(None);
            }
        };
        let columns = match self.find_columns(&name).await {
            Ok(columns) => columns,
            Err(e) => {
                tracing::warn!(table = %name, error = %e, "column lookup failed; treating table as missing");
                return Ok(None);
            }
        };
        if columns.is_empty() {
            tracing::debug!(table = %name, "table not found");
            return Ok(None);
        }

        let mut table = TableDescriptor::new(name);
        table.columns = columns;
        table.primary_key = primary_key;
        table.backfill_primary_key();
        table.foreign_keys = self.find_foreign_keys(&table.name).await?;
        Ok(Some(table))
    }

    /// One descriptor per column, in catalog order.
    pub async fn find_columns(&self, name: &QualifiedName) -> TsqlResult<Vec<ColumnDescriptor>> {
        let sql = COLUMNS_SQL.replace("{columns}", &information_schema(name, "COLUMNS"));
        let rows = self.executor.query_all(&sql, &Self::name_params(name)).await?;
        rows.iter().map(ColumnDescriptor::from_row).collect()
    }

    /// Primary-key column names in key order.
    pub async fn find_primary_keys(&self, name: &QualifiedName) -> TsqlResult<Vec<String>> {
        let sql = PRIMARY_KEYS_SQL
            .replace("{key_column_usage}", &information_schema(name, "KEY_COLUMN_USAGE"))
            .replace("{table_constraints}", &information_schema(name, "TABLE_CONSTRAINTS"));
        let rows = self.executor.query_all(&sql, &Self::name_params(name)).await?;
        rows.iter().map(|r| r.try_get_column("field_name")).collect()
    }

    /// Foreign keys grouped by constraint name; the first row of a group
    /// fixes the referenced table.
    pub async fn find_foreign_keys(&self, name: &QualifiedName) -> TsqlResult<Vec<TableForeignKey>> {
        let rows = self
            .executor
            .query_all(FOREIGN_KEYS_SQL, &Self::full_name_params("object", name))
            .await?;

        let mut keys: Vec<TableForeignKey> = Vec::new();
        for row in &rows {
            let fk_name: String = row.try_get_column("fk_name")?;
            let pair = (
                row.try_get_column::<String>("fk_column_name")?,
                row.try_get_column::<String>("uq_column_name")?,
            );
            match keys.iter_mut().find(|k| k.name == fk_name) {
                Some(key) => key.columns.push(pair),
                None => {
                    let table: String = row.try_get_column("uq_table_name")?;
                    let foreign_table = match row.get_opt::<String>("uq_schema_name")? {
                        Some(schema) => format!("{schema}.{table}"),
                        None => table,
                    };
                    keys.push(TableForeignKey {
                        name: fk_name,
                        foreign_table,
                        columns: vec![pair],
                    });
                }
            }
        }
        Ok(keys)
    }

    /// Primary key, uniques, checks, defaults and foreign keys in one query.
    pub async fn load_table_constraints(&self, name: &str) -> TsqlResult<TableConstraints> {
        let name = self.resolve(name);
        let rows = self
            .executor
            .query_all(TABLE_CONSTRAINTS_SQL, &Self::full_name_params("fullName", &name))
            .await?;
        tracing::debug!(table = %name, rows = rows.len(), "loaded table constraints");
        group_table_constraints(&rows)
    }

    pub async fn load_table_indexes(&self, name: &str) -> TsqlResult<Vec<IndexConstraint>> {
        let name = self.resolve(name);
        let rows = self
            .executor
            .query_all(INDEXES_SQL, &Self::full_name_params("fullName", &name))
            .await?;
        group_indexes(&rows)
    }

    /// Base tables (no views) of a schema, the default schema when `None`.
    pub async fn find_table_names(&self, schema: Option<&str>) -> TsqlResult<Vec<String>> {
        self.names_in_schema(TABLE_NAMES_SQL, schema).await
    }

    pub async fn find_view_names(&self, schema: Option<&str>) -> TsqlResult<Vec<String>> {
        self.names_in_schema(VIEW_NAMES_SQL, schema).await
    }

    async fn names_in_schema(&self, sql: &str, schema: Option<&str>) -> TsqlResult<Vec<String>> {
        let mut params = Params::new();
        params.push_named("schema", schema.unwrap_or(&self.default_schema));
        first_column_strings(self.executor.query_all(sql, &params).await?)
    }

    /// User schemas, excluding fixed database roles.
    pub async fn find_schema_names(&self) -> TsqlResult<Vec<String>> {
        first_column_strings(self.executor.query_all(SCHEMA_NAMES_SQL, &Params::new()).await?)
    }

    pub async fn find_table_comment(&self, name: &str) -> TsqlResult<Option<String>> {
        let name = self.resolve(name);
        let row = self
            .executor
            .query_one(TABLE_COMMENT_SQL, &Self::full_name_params("fullName", &name))
            .await?;
        match row {
            Some(row) => row.get_opt("comment"),
            None => Ok(None),
        }
    }

    /// The session's default schema as reported by the server.
    pub async fn query_default_schema(&self) -> TsqlResult<Option<String>> {
        match self.executor.query_scalar(DEFAULT_SCHEMA_SQL, &Params::new()).await? {
            Some(value) => Option::<String>::from_value(&value)
                .map(|s| s.filter(|s| !s.is_empty()))
                .map_err(|e| TsqlError::decode("SCHEMA_NAME()", e.to_string())),
            None => Ok(None),
        }
    }
}
