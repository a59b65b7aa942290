//! INSERT / UPDATE / DELETE, MERGE-based upsert and OUTPUT-based returning.

use crate::condition::{Condition, Operand};
use crate::error::{TsqlError, TsqlResult};
use crate::ident::{quote_column_name, quote_table_name};
use crate::qb::condition::{build_condition, build_operand};
use crate::qb::param::Params;
use crate::qb::select::{SelectQb, build_select};
use crate::qb::{QueryBuilder, Statement};
use crate::schema::{ColumnDescriptor, TableConstraints, TableDescriptor};
use crate::value::Value;
use crate::version::ServerVersion;

/// Table variable receiving OUTPUT rows.
const TEMP_TABLE: &str = "@temporary_inserted";

// ==================== Models ====================

/// INSERT model: one row of `(column, operand)` pairs or a source query.
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: String,
    columns: Vec<String>,
    values: Vec<Operand>,
    query: Option<Box<SelectQb>>,
}

impl InsertQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
            query: None,
        }
    }

    /// Set a column to a bound value.
    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.set_operand(column, Operand::Value(value.into()))
    }

    /// Set a column to a raw SQL expression.
    pub fn set_expr(self, column: &str, sql: &str) -> Self {
        self.set_operand(column, Operand::Expr(sql.to_string()))
    }

    /// Set a column to any operand. A column set twice keeps the last value.
    pub fn set_operand(mut self, column: &str, operand: Operand) -> Self {
        match self.columns.iter().position(|c| c == column) {
            Some(i) => self.values[i] = operand,
            None => {
                self.columns.push(column.to_string());
                self.values.push(operand);
            }
        }
        self
    }

    /// `INSERT INTO t (columns) SELECT ...`
    pub fn from_query(mut self, columns: &[&str], query: SelectQb) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.values.clear();
        self.query = Some(Box::new(query));
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// The bound value supplied for a column, if any.
    pub fn value_of(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| match self.values.get(i) {
                Some(Operand::Value(v)) => Some(v),
                _ => None,
            })
    }
}

/// Multi-row INSERT with a fixed column list.
#[derive(Clone, Debug)]
pub struct BatchInsertQb {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl BatchInsertQb {
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// UPDATE model.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    table: String,
    sets: Vec<(String, Operand)>,
    where_: Vec<Condition>,
}

impl UpdateQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            sets: Vec::new(),
            where_: Vec::new(),
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.sets.push((column.to_string(), Operand::Value(value.into())));
        self
    }

    pub fn set_expr(mut self, column: &str, sql: &str) -> Self {
        self.sets.push((column.to_string(), Operand::Expr(sql.to_string())));
        self
    }

    pub fn and_where(mut self, cond: Condition) -> Self {
        self.where_.push(cond);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// DELETE model.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    table: String,
    where_: Vec<Condition>,
}

impl DeleteQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_: Vec::new(),
        }
    }

    pub fn and_where(mut self, cond: Condition) -> Self {
        self.where_.push(cond);
        self
    }
}

/// What an upsert does when the row already exists.
#[derive(Clone, Debug, Default)]
pub enum UpsertUpdate {
    /// Update every inserted column that is not part of a matching key.
    #[default]
    All,
    /// Leave the existing row untouched.
    None,
    /// Explicit assignments.
    Columns(Vec<(String, Operand)>),
}

// ==================== Rendering helpers ====================

fn base_type(db_type: &str) -> String {
    db_type
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Text or binary values aimed at a `varbinary` column become a hex literal
/// conversion and nulls become a bare `NULL`; the driver would otherwise send
/// them as nvarchar.
fn normalize_operand(table: Option<&TableDescriptor>, column: &str, operand: &Operand) -> Operand {
    let Some(col) = table.and_then(|t| t.column(column)) else {
        return operand.clone();
    };
    if base_type(&col.db_type) != "varbinary" {
        return operand.clone();
    }
    let bytes = match operand {
        Operand::Value(Value::Text(s)) => s.as_bytes(),
        Operand::Value(Value::Binary(b)) => b.as_slice(),
        Operand::Value(Value::Null) => return Operand::Expr("NULL".to_string()),
        other => return other.clone(),
    };
    Operand::Expr(format!("CONVERT(VARBINARY(MAX), 0x{})", hex::encode(bytes)))
}

fn quoted_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_column_name(c))
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_where_clause(
    conds: &[Condition],
    version: ServerVersion,
    params: &mut Params,
) -> TsqlResult<String> {
    let sql = match conds {
        [] => String::new(),
        [single] => build_condition(single, version, params)?,
        many => build_condition(&Condition::And(many.to_vec()), version, params)?,
    };
    Ok(if sql.is_empty() {
        sql
    } else {
        format!(" WHERE {sql}")
    })
}

/// The pieces of an INSERT, kept apart so an OUTPUT clause can be placed
/// between the column list and the row source.
struct InsertParts {
    table: String,
    columns: Vec<String>,
    /// `VALUES (...)`, a SELECT, or `DEFAULT VALUES`.
    source: String,
}

impl InsertParts {
    fn render(&self, output: Option<&str>) -> String {
        let mut sql = format!("INSERT INTO {}", self.table);
        if !self.columns.is_empty() {
            sql.push_str(&format!(" ({})", quoted_list(&self.columns)));
        }
        if let Some(output) = output {
            sql.push(' ');
            sql.push_str(output);
        }
        sql.push(' ');
        sql.push_str(&self.source);
        sql
    }
}

/// A MERGE split into its branches so returning variants can add to it.
struct MergeParts {
    head: String,
    matched: Option<String>,
    not_matched: String,
}

impl MergeParts {
    fn render(&self, output: Option<&str>) -> String {
        let mut sql = self.head.clone();
        if let Some(matched) = &self.matched {
            sql.push(' ');
            sql.push_str(matched);
        }
        sql.push(' ');
        sql.push_str(&self.not_matched);
        if let Some(output) = output {
            sql.push(' ');
            sql.push_str(output);
        }
        sql.push(';');
        sql
    }
}

enum UpsertParts {
    Insert(InsertParts),
    Merge(MergeParts),
}

fn declare_type(col: &ColumnDescriptor) -> String {
    let base = base_type(&col.db_type);
    match base.as_str() {
        "timestamp" | "rowversion" => {
            if col.allow_null {
                "varbinary(8)".to_string()
            } else {
                "binary(8)".to_string()
            }
        }
        "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary"
            if !col.db_type.contains('(') =>
        {
            format!("{}(MAX)", col.db_type)
        }
        "decimal" | "numeric" if !col.db_type.contains('(') => match col.precision {
            Some(p) => format!("{}({p},{})", col.db_type, col.scale.unwrap_or(0)),
            None => col.db_type.clone(),
        },
        _ => col.db_type.clone(),
    }
}

fn returning_columns<'a>(
    table: &'a TableDescriptor,
    requested: &[&str],
) -> TsqlResult<Vec<&'a ColumnDescriptor>> {
    if requested.is_empty() {
        let pk: Vec<&ColumnDescriptor> = table
            .primary_key
            .iter()
            .filter_map(|name| table.column(name))
            .collect();
        return Ok(if pk.is_empty() {
            table.columns.iter().collect()
        } else {
            pk
        });
    }
    requested
        .iter()
        .map(|name| {
            table.column(name).ok_or_else(|| {
                TsqlError::invalid_argument(format!("Column not found: {}.{name}", table.name))
            })
        })
        .collect()
}

/// `(declare, output)` halves of the returning wrapper.
fn returning_clauses(columns: &[&ColumnDescriptor]) -> (String, String) {
    let declare: Vec<String> = columns
        .iter()
        .map(|c| {
            format!(
                "{} {} {}",
                quote_column_name(&c.name),
                declare_type(c),
                if c.allow_null { "NULL" } else { "NOT NULL" }
            )
        })
        .collect();
    let output: Vec<String> = columns
        .iter()
        .map(|c| format!("INSERTED.{}", quote_column_name(&c.name)))
        .collect();
    (
        format!("SET NOCOUNT ON;DECLARE {TEMP_TABLE} TABLE ({});", declare.join(", ")),
        format!("OUTPUT {} INTO {TEMP_TABLE}", output.join(",")),
    )
}

fn require_table<'a>(name: &str, table: Option<&'a TableDescriptor>) -> TsqlResult<&'a TableDescriptor> {
    table.ok_or_else(|| TsqlError::invalid_argument(format!("Table not found: {name}")))
}

// ==================== Builders ====================

impl QueryBuilder {
    fn insert_parts(
        &self,
        insert: &InsertQb,
        table: Option<&TableDescriptor>,
        params: &mut Params,
    ) -> TsqlResult<InsertParts> {
        let quoted_table = quote_table_name(&insert.table);
        if let Some(query) = &insert.query {
            let select = build_select(query, self.version, params)?;
            return Ok(InsertParts {
                table: quoted_table,
                columns: insert.columns.clone(),
                source: select,
            });
        }
        if insert.columns.is_empty() {
            return Ok(InsertParts {
                table: quoted_table,
                columns: Vec::new(),
                source: "DEFAULT VALUES".to_string(),
            });
        }

        let mut placeholders = Vec::with_capacity(insert.values.len());
        for (column, operand) in insert.columns.iter().zip(&insert.values) {
            let operand = normalize_operand(table, column, operand);
            placeholders.push(build_operand(&operand, self.version, params)?);
        }
        Ok(InsertParts {
            table: quoted_table,
            columns: insert.columns.clone(),
            source: format!("VALUES ({})", placeholders.join(", ")),
        })
    }

    /// `INSERT INTO [t] ([a], [b]) VALUES (:qp0, :qp1)`
    ///
    /// `table` is used only to normalize values bound for `varbinary`
    /// columns; pass `None` to skip that step.
    pub fn build_insert(&self, insert: &InsertQb, table: Option<&TableDescriptor>) -> TsqlResult<Statement> {
        let mut params = Params::new();
        let parts = self.insert_parts(insert, table, &mut params)?;
        Ok(Statement::new(parts.render(None), params))
    }

    /// Multi-row `INSERT ... VALUES (...), (...)`.
    pub fn build_batch_insert(
        &self,
        batch: &BatchInsertQb,
        table: Option<&TableDescriptor>,
    ) -> TsqlResult<Statement> {
        if batch.rows.is_empty() {
            return Err(TsqlError::invalid_argument("batch insert requires at least one row"));
        }
        let mut params = Params::new();
        let mut rows = Vec::with_capacity(batch.rows.len());
        for (i, row) in batch.rows.iter().enumerate() {
            if row.len() != batch.columns.len() {
                return Err(TsqlError::invalid_argument(format!(
                    "batch insert row {i} has {} values for {} columns",
                    row.len(),
                    batch.columns.len()
                )));
            }
            let mut placeholders = Vec::with_capacity(row.len());
            for (column, value) in batch.columns.iter().zip(row) {
                let operand = normalize_operand(table, column, &Operand::Value(value.clone()));
                placeholders.push(build_operand(&operand, self.version, &mut params)?);
            }
            rows.push(format!("({})", placeholders.join(", ")));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_table_name(&batch.table),
            quoted_list(&batch.columns),
            rows.join(", ")
        );
        Ok(Statement::new(sql, params))
    }

    /// `UPDATE [t] SET [a]=:qp0 WHERE ...`
    pub fn build_update(&self, update: &UpdateQb, table: Option<&TableDescriptor>) -> TsqlResult<Statement> {
        if update.sets.is_empty() {
            return Err(TsqlError::invalid_argument("update requires at least one column"));
        }
        let mut params = Params::new();
        let mut sets = Vec::with_capacity(update.sets.len());
        for (column, operand) in &update.sets {
            let operand = normalize_operand(table, column, operand);
            let rhs = build_operand(&operand, self.version, &mut params)?;
            sets.push(format!("{}={rhs}", quote_column_name(column)));
        }
        let where_sql = build_where_clause(&update.where_, self.version, &mut params)?;
        let sql = format!(
            "UPDATE {} SET {}{where_sql}",
            quote_table_name(&update.table),
            sets.join(", ")
        );
        Ok(Statement::new(sql, params))
    }

    /// `DELETE FROM [t] WHERE ...`
    pub fn build_delete(&self, delete: &DeleteQb) -> TsqlResult<Statement> {
        let mut params = Params::new();
        let where_sql = build_where_clause(&delete.where_, self.version, &mut params)?;
        let sql = format!("DELETE FROM {}{where_sql}", quote_table_name(&delete.table));
        Ok(Statement::new(sql, params))
    }

    fn upsert_parts(
        &self,
        insert: &InsertQb,
        update: &UpsertUpdate,
        table: Option<&TableDescriptor>,
        constraints: &TableConstraints,
        params: &mut Params,
    ) -> TsqlResult<UpsertParts> {
        let covers = |cols: &[String]| {
            !cols.is_empty()
                && cols
                    .iter()
                    .all(|c| insert.columns.iter().any(|i| i.eq_ignore_ascii_case(c)))
        };
        let covering: Vec<&[String]> = constraints
            .primary_key
            .iter()
            .map(|pk| pk.column_names.as_slice())
            .chain(constraints.uniques.iter().map(|u| u.column_names.as_slice()))
            .filter(|&cols| covers(cols))
            .collect();

        let parts = self.insert_parts(insert, table, params)?;
        if covering.is_empty() {
            return Ok(UpsertParts::Insert(parts));
        }

        let quoted_table = quote_table_name(&insert.table);
        let on = Condition::Or(
            covering
                .iter()
                .map(|cols| {
                    Condition::And(
                        cols.iter()
                            .map(|c| {
                                let c = quote_column_name(c);
                                Condition::raw(format!("{quoted_table}.{c}=[EXCLUDED].{c}"))
                            })
                            .collect(),
                    )
                })
                .collect(),
        );
        let on = build_condition(&on, self.version, params)?;

        let source = &parts.source;
        let columns = quoted_list(&insert.columns);
        let head = format!(
            "MERGE {quoted_table} WITH (HOLDLOCK) USING ({source}) AS [EXCLUDED] ({columns}) ON ({on})"
        );

        let excluded: Vec<String> = insert
            .columns
            .iter()
            .map(|c| format!("[EXCLUDED].{}", quote_column_name(c)))
            .collect();
        let not_matched = format!(
            "WHEN NOT MATCHED THEN INSERT ({columns}) VALUES ({})",
            excluded.join(", ")
        );

        let sets: Vec<String> = match update {
            UpsertUpdate::None => Vec::new(),
            UpsertUpdate::All => insert
                .columns
                .iter()
                .filter(|c| {
                    !covering
                        .iter()
                        .any(|cols| cols.iter().any(|u| u.eq_ignore_ascii_case(c)))
                })
                .map(|c| {
                    let c = quote_column_name(c);
                    format!("{c}=[EXCLUDED].{c}")
                })
                .collect(),
            UpsertUpdate::Columns(assignments) => {
                let mut sets = Vec::with_capacity(assignments.len());
                for (column, operand) in assignments {
                    let operand = normalize_operand(table, column, operand);
                    let rhs = build_operand(&operand, self.version, params)?;
                    sets.push(format!("{}={rhs}", quote_column_name(column)));
                }
                sets
            }
        };
        let matched = (!sets.is_empty()).then(|| format!("WHEN MATCHED THEN UPDATE SET {}", sets.join(", ")));

        Ok(UpsertParts::Merge(MergeParts {
            head,
            matched,
            not_matched,
        }))
    }

    /// Insert-or-update through `MERGE ... WITH (HOLDLOCK)`.
    ///
    /// Rows match on every unique constraint (primary key included) whose
    /// columns are all being inserted. With no such constraint the result is
    /// exactly [`QueryBuilder::build_insert`].
    pub fn build_upsert(
        &self,
        insert: &InsertQb,
        update: &UpsertUpdate,
        table: Option<&TableDescriptor>,
        constraints: &TableConstraints,
    ) -> TsqlResult<Statement> {
        let mut params = Params::new();
        let sql = match self.upsert_parts(insert, update, table, constraints, &mut params)? {
            UpsertParts::Insert(parts) => parts.render(None),
            UpsertParts::Merge(parts) => parts.render(None),
        };
        Ok(Statement::new(sql, params))
    }

    /// INSERT that also returns column values (the primary key by default)
    /// by routing `OUTPUT INSERTED.*` into a table variable.
    pub fn build_insert_returning(
        &self,
        insert: &InsertQb,
        table: Option<&TableDescriptor>,
        returning: &[&str],
    ) -> TsqlResult<Statement> {
        let descriptor = require_table(&insert.table, table)?;
        let columns = returning_columns(descriptor, returning)?;
        let (declare, output) = returning_clauses(&columns);

        let mut params = Params::new();
        let parts = self.insert_parts(insert, table, &mut params)?;
        let sql = format!(
            "{declare}{};SELECT * FROM {TEMP_TABLE};",
            parts.render(Some(&output))
        );
        Ok(Statement::new(sql, params))
    }

    /// Upsert that returns column values of the inserted or updated row.
    ///
    /// OUTPUT only fires for a branch that exists, so a MERGE without an
    /// update branch gets a no-op `UPDATE SET @temp=1`.
    pub fn build_upsert_returning(
        &self,
        insert: &InsertQb,
        update: &UpsertUpdate,
        table: Option<&TableDescriptor>,
        constraints: &TableConstraints,
        returning: &[&str],
    ) -> TsqlResult<Statement> {
        let descriptor = require_table(&insert.table, table)?;
        let columns = returning_columns(descriptor, returning)?;
        let (declare, output) = returning_clauses(&columns);

        let mut params = Params::new();
        let sql = match self.upsert_parts(insert, update, table, constraints, &mut params)? {
            UpsertParts::Insert(parts) => format!(
                "{declare}{};SELECT * FROM {TEMP_TABLE};",
                parts.render(Some(&output))
            ),
            UpsertParts::Merge(mut parts) => {
                let mut prefix = String::new();
                if parts.matched.is_none() {
                    prefix.push_str("DECLARE @temp int;");
                    parts.matched = Some("WHEN MATCHED THEN UPDATE SET @temp=1".to_string());
                }
                format!(
                    "{declare}{prefix}{}SELECT * FROM {TEMP_TABLE};",
                    parts.render(Some(&output))
                )
            }
        };
        Ok(Statement::new(sql, params))
    }
}
