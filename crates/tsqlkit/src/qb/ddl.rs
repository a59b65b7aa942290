//! DDL statements: tables, columns, constraints, comments and integrity.

use crate::error::{TsqlError, TsqlResult};
use crate::ident::{quote_column_name, quote_simple_name, quote_table_name, split_qualified_name};
use crate::qb::column_type::{ColumnType, default_sql};
use crate::qb::{QueryBuilder, Statement};
use crate::schema::{DefaultValue, TableDescriptor};
use crate::value::quote_string;

/// Actions for `ON DELETE` / `ON UPDATE` of a foreign key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse catalog spellings such as `SET_NULL` or `NO ACTION`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().replace('_', " ").to_ascii_uppercase().as_str() {
            "NO ACTION" | "RESTRICT" => Some(ReferentialAction::NoAction),
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" => Some(ReferentialAction::SetDefault),
            _ => None,
        }
    }
}

fn quote_columns(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_column_name(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn n_string(s: &str) -> String {
    format!("N{}", quote_string(s))
}

fn require_table<'a>(name: &str, table: Option<&'a TableDescriptor>) -> TsqlResult<&'a TableDescriptor> {
    table.ok_or_else(|| TsqlError::invalid_argument(format!("Table not found: {name}")))
}

/// Constraint name stem for `DF_`/`CK_`/`UQ_` names: letters, digits, `_`.
fn constraint_base(table: &str, column: &str) -> String {
    format!("{table}_{column}")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Loop dropping every constraint attached to a column, optionally only of
/// one `sys.objects` type (`D` for defaults).
fn drop_constraints_for_column(table: &str, column: &str, kind: Option<&str>) -> String {
    let type_filter = kind
        .map(|k| format!(" WHERE so.[type]={}", quote_string(k)))
        .unwrap_or_default();
    format!(
        "DECLARE @tableName VARCHAR(MAX) = {table}
DECLARE @columnName VARCHAR(MAX) = {column}
WHILE 1=1 BEGIN
    DECLARE @constraintName NVARCHAR(128)
    SET @constraintName = (SELECT TOP 1 OBJECT_NAME(cons.[object_id])
        FROM (
            SELECT sc.[constid] object_id
            FROM [sys].[sysconstraints] sc
            JOIN [sys].[columns] c ON c.[object_id]=sc.[id] AND c.[column_id]=sc.[colid] AND c.[name]=@columnName
            WHERE sc.[id] = OBJECT_ID(@tableName)
            UNION
            SELECT object_id(i.[name]) FROM [sys].[indexes] i
            JOIN [sys].[columns] c ON c.[object_id]=i.[object_id] AND c.[name]=@columnName
            JOIN [sys].[index_columns] ic ON ic.[object_id]=i.[object_id] AND i.[index_id]=ic.[index_id] AND c.[column_id]=ic.[column_id]
            WHERE i.[is_unique_constraint]=1 and i.[object_id]=OBJECT_ID(@tableName)
        ) cons
        JOIN [sys].[objects] so ON so.[object_id]=cons.[object_id]{type_filter})
    IF @constraintName IS NULL BREAK
    EXEC (N'ALTER TABLE ' + @tableName + ' DROP CONSTRAINT [' + @constraintName + ']')
END",
        table = quote_string(&quote_table_name(table)),
        column = quote_string(column),
    )
}

/// `'SCHEMA', N'dbo', 'TABLE', N'users'[, 'COLUMN', N'name']` arguments for
/// `fn_listextendedproperty`.
fn property_lookup_args(table: &TableDescriptor, column: Option<&str>) -> String {
    let schema = table.name.schema().unwrap_or("dbo");
    let level2 = match column {
        Some(c) => format!("'COLUMN', {}", n_string(c)),
        None => "DEFAULT, DEFAULT".to_string(),
    };
    format!(
        "N'MS_description', 'SCHEMA', {}, 'TABLE', {}, {level2}",
        n_string(schema),
        n_string(table.name.name())
    )
}

fn property_level_params(table: &TableDescriptor, column: Option<&str>) -> String {
    let schema = table.name.schema().unwrap_or("dbo");
    let mut sql = format!(
        "@level0type = N'SCHEMA', @level0name = {}, @level1type = N'TABLE', @level1name = {}",
        n_string(schema),
        n_string(table.name.name())
    );
    if let Some(c) = column {
        sql.push_str(&format!(", @level2type = N'COLUMN', @level2name = {}", n_string(c)));
    }
    sql
}

impl QueryBuilder {
    /// `CREATE TABLE` with one line per column.
    pub fn create_table(
        &self,
        table: &str,
        columns: &[(&str, ColumnType)],
        options: Option<&str>,
    ) -> Statement {
        let cols: Vec<String> = columns
            .iter()
            .map(|(name, ty)| format!("\t{} {}", quote_column_name(name), ty.to_sql()))
            .collect();
        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            quote_table_name(table),
            cols.join(",\n")
        );
        if let Some(options) = options {
            sql.push(' ');
            sql.push_str(options);
        }
        Statement::raw(sql)
    }

    pub fn drop_table(&self, table: &str) -> Statement {
        Statement::raw(format!("DROP TABLE {}", quote_table_name(table)))
    }

    pub fn truncate_table(&self, table: &str) -> Statement {
        Statement::raw(format!("TRUNCATE TABLE {}", quote_table_name(table)))
    }

    /// `sp_rename [old], [new]`
    pub fn rename_table(&self, old_name: &str, new_name: &str) -> Statement {
        Statement::raw(format!(
            "sp_rename {}, {}",
            quote_table_name(old_name),
            quote_table_name(new_name)
        ))
    }

    /// `sp_rename '[t].[old]', [new], 'COLUMN'`
    pub fn rename_column(&self, table: &str, old_name: &str, new_name: &str) -> Statement {
        let old_path = format!("{}.{}", quote_table_name(table), quote_column_name(old_name));
        Statement::raw(format!(
            "sp_rename {}, {}, 'COLUMN'",
            quote_string(&old_path),
            quote_column_name(new_name)
        ))
    }

    pub fn add_column(&self, table: &str, column: &str, ty: &ColumnType) -> Statement {
        Statement::raw(format!(
            "ALTER TABLE {} ADD {} {}",
            quote_table_name(table),
            quote_column_name(column),
            ty.to_sql()
        ))
    }

    /// Drop a column after dropping every constraint that references it.
    pub fn drop_column(&self, table: &str, column: &str) -> Statement {
        Statement::raw(format!(
            "{}\nALTER TABLE {} DROP COLUMN {}",
            drop_constraints_for_column(table, column, None),
            quote_table_name(table),
            quote_column_name(column)
        ))
    }

    /// Change a column's type. Existing default constraints are dropped
    /// first; DEFAULT, CHECK and UNIQUE from `ty` are re-added as named
    /// `DF_`/`CK_`/`UQ_` constraints.
    pub fn alter_column(&self, table: &str, column: &str, ty: &ColumnType) -> Statement {
        let quoted_table = quote_table_name(table);
        let quoted_column = quote_column_name(column);
        let base = constraint_base(table, column);

        let mut parts = vec![
            drop_constraints_for_column(table, column, Some("D")),
            format!(
                "ALTER TABLE {quoted_table} ALTER COLUMN {quoted_column} {}",
                ty.to_alter_sql()
            ),
        ];
        if let Some(default) = ty.get_default() {
            parts.push(
                self.add_default_value(&format!("DF_{base}"), table, column, default)
                    .sql,
            );
        }
        if let Some(check) = ty.get_check() {
            parts.push(format!(
                "ALTER TABLE {quoted_table} ADD CONSTRAINT {} CHECK ({check})",
                quote_column_name(&format!("CK_{base}"))
            ));
        }
        if ty.is_unique() {
            parts.push(format!(
                "ALTER TABLE {quoted_table} ADD CONSTRAINT {} UNIQUE ({quoted_column})",
                quote_column_name(&format!("UQ_{base}"))
            ));
        }
        Statement::raw(parts.join("\n"))
    }

    /// `ALTER TABLE [t] ADD CONSTRAINT [n] DEFAULT <value> FOR [c]`
    pub fn add_default_value(
        &self,
        name: &str,
        table: &str,
        column: &str,
        value: &DefaultValue,
    ) -> Statement {
        Statement::raw(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} DEFAULT {} FOR {}",
            quote_table_name(table),
            quote_column_name(name),
            default_sql(value),
            quote_column_name(column)
        ))
    }

    pub fn drop_default_value(&self, name: &str, table: &str) -> Statement {
        self.drop_constraint(name, table)
    }

    pub fn drop_constraint(&self, name: &str, table: &str) -> Statement {
        Statement::raw(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            quote_table_name(table),
            quote_column_name(name)
        ))
    }

    pub fn add_primary_key(&self, name: &str, table: &str, columns: &[&str]) -> Statement {
        Statement::raw(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            quote_table_name(table),
            quote_column_name(name),
            quote_columns(columns)
        ))
    }

    pub fn drop_primary_key(&self, name: &str, table: &str) -> Statement {
        self.drop_constraint(name, table)
    }

    pub fn add_unique(&self, name: &str, table: &str, columns: &[&str]) -> Statement {
        Statement::raw(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            quote_table_name(table),
            quote_column_name(name),
            quote_columns(columns)
        ))
    }

    pub fn drop_unique(&self, name: &str, table: &str) -> Statement {
        self.drop_constraint(name, table)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_foreign_key(
        &self,
        name: &str,
        table: &str,
        columns: &[&str],
        ref_table: &str,
        ref_columns: &[&str],
        on_delete: Option<ReferentialAction>,
        on_update: Option<ReferentialAction>,
    ) -> Statement {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_table_name(table),
            quote_column_name(name),
            quote_columns(columns),
            quote_table_name(ref_table),
            quote_columns(ref_columns)
        );
        if let Some(action) = on_delete {
            sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = on_update {
            sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        Statement::raw(sql)
    }

    pub fn drop_foreign_key(&self, name: &str, table: &str) -> Statement {
        self.drop_constraint(name, table)
    }

    pub fn add_check(&self, name: &str, table: &str, expression: &str) -> Statement {
        Statement::raw(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({expression})",
            quote_table_name(table),
            quote_column_name(name)
        ))
    }

    pub fn drop_check(&self, name: &str, table: &str) -> Statement {
        self.drop_constraint(name, table)
    }

    pub fn create_index(&self, name: &str, table: &str, columns: &[&str], unique: bool) -> Statement {
        Statement::raw(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            quote_column_name(name),
            quote_table_name(table),
            quote_columns(columns)
        ))
    }

    /// `DROP INDEX [i] ON [t]`
    pub fn drop_index(&self, name: &str, table: &str) -> Statement {
        Statement::raw(format!(
            "DROP INDEX {} ON {}",
            quote_column_name(name),
            quote_table_name(table)
        ))
    }

    /// Add or update the `MS_Description` extended property of a table.
    pub fn add_comment_on_table(
        &self,
        table_name: &str,
        table: Option<&TableDescriptor>,
        comment: &str,
    ) -> TsqlResult<Statement> {
        let table = require_table(table_name, table)?;
        Ok(Statement::raw(build_add_comment(table, None, comment)))
    }

    /// Add or update the `MS_Description` extended property of a column.
    pub fn add_comment_on_column(
        &self,
        table_name: &str,
        table: Option<&TableDescriptor>,
        column: &str,
        comment: &str,
    ) -> TsqlResult<Statement> {
        let table = require_table(table_name, table)?;
        require_column(table, column)?;
        Ok(Statement::raw(build_add_comment(table, Some(column), comment)))
    }

    /// Drop a table's description if one exists.
    pub fn drop_comment_from_table(
        &self,
        table_name: &str,
        table: Option<&TableDescriptor>,
    ) -> TsqlResult<Statement> {
        let table = require_table(table_name, table)?;
        Ok(Statement::raw(build_drop_comment(table, None)))
    }

    /// Drop a column's description if one exists.
    pub fn drop_comment_from_column(
        &self,
        table_name: &str,
        table: Option<&TableDescriptor>,
        column: &str,
    ) -> TsqlResult<Statement> {
        let table = require_table(table_name, table)?;
        require_column(table, column)?;
        Ok(Statement::raw(build_drop_comment(table, Some(column))))
    }

    /// Enable or disable constraint checking on every listed base table of
    /// `schema` (the default schema when `None`).
    pub fn check_integrity(&self, check: bool, schema: Option<&str>, tables: &[String]) -> Statement {
        let schema = schema.unwrap_or(self.default_schema.as_str());
        let enable = if check { "CHECK" } else { "NOCHECK" };
        let sql: String = tables
            .iter()
            .map(|t| {
                let mut parts = split_qualified_name(schema);
                parts.push(t.clone());
                let name = parts
                    .iter()
                    .map(|p| quote_simple_name(p))
                    .collect::<Vec<_>>()
                    .join(".");
                format!("ALTER TABLE {name} {enable} CONSTRAINT ALL; ")
            })
            .collect();
        Statement::raw(sql)
    }

    /// Reseed the identity of a table. Without a value the identity is reset
    /// to follow the current maximum key.
    pub fn reset_sequence(
        &self,
        table_name: &str,
        table: Option<&TableDescriptor>,
        value: Option<i64>,
    ) -> TsqlResult<Statement> {
        let table = require_table(table_name, table)?;
        if table.sequence_name.is_none() {
            return Err(TsqlError::invalid_argument(format!(
                "There is no sequence associated with table '{table_name}'"
            )));
        }
        let quoted = quote_string(&table.name.quoted());
        let sql = match value {
            Some(v) => format!("DBCC CHECKIDENT ({quoted}, RESEED, {v})"),
            None => format!(
                "DBCC CHECKIDENT ({quoted}, RESEED, 0) WITH NO_INFOMSGS;DBCC CHECKIDENT ({quoted}, RESEED)"
            ),
        };
        Ok(Statement::raw(sql))
    }
}

fn require_column(table: &TableDescriptor, column: &str) -> TsqlResult<()> {
    if table.column(column).is_none() {
        return Err(TsqlError::invalid_argument(format!(
            "Column not found: {}.{column}",
            table.name
        )));
    }
    Ok(())
}

fn build_add_comment(table: &TableDescriptor, column: Option<&str>, comment: &str) -> String {
    let params = format!(
        "@name = N'MS_description', @value = {}, {};",
        n_string(comment),
        property_level_params(table, column)
    );
    format!(
        "IF NOT EXISTS (SELECT 1 FROM fn_listextendedproperty({})) \
         EXEC sys.sp_addextendedproperty {params} \
         ELSE EXEC sys.sp_updateextendedproperty {params}",
        property_lookup_args(table, column)
    )
}

fn build_drop_comment(table: &TableDescriptor, column: Option<&str>) -> String {
    format!(
        "IF EXISTS (SELECT 1 FROM fn_listextendedproperty({})) \
         EXEC sys.sp_dropextendedproperty @name = N'MS_description', {};",
        property_lookup_args(table, column),
        property_level_params(table, column)
    )
}
