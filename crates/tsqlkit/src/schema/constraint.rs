use crate::client::Row;
use crate::error::TsqlResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which constraint list to return from a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    ForeignKey,
    Unique,
    Check,
    Default,
    Index,
}

/// Primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyConstraint {
    pub name: String,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub column_names: Vec<String>,
    pub foreign_schema_name: Option<String>,
    pub foreign_table_name: String,
    pub foreign_column_names: Vec<String>,
    /// `NO ACTION`, `CASCADE`, `SET NULL`, `SET DEFAULT`.
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub column_names: Vec<String>,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConstraint {
    pub name: String,
    pub column_names: Vec<String>,
    /// Definition text as stored in the catalog, e.g. `((0))`.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConstraint {
    pub name: String,
    pub column_names: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Any constraint attached to a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    PrimaryKey(KeyConstraint),
    ForeignKey(ForeignKeyConstraint),
    Unique(KeyConstraint),
    Check(CheckConstraint),
    Default(DefaultConstraint),
    Index(IndexConstraint),
}

impl Constraint {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::PrimaryKey(_) => ConstraintKind::PrimaryKey,
            Constraint::ForeignKey(_) => ConstraintKind::ForeignKey,
            Constraint::Unique(_) => ConstraintKind::Unique,
            Constraint::Check(_) => ConstraintKind::Check,
            Constraint::Default(_) => ConstraintKind::Default,
            Constraint::Index(_) => ConstraintKind::Index,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Constraint::PrimaryKey(c) | Constraint::Unique(c) => &c.name,
            Constraint::ForeignKey(c) => &c.name,
            Constraint::Check(c) => &c.name,
            Constraint::Default(c) => &c.name,
            Constraint::Index(c) => &c.name,
        }
    }

    pub fn column_names(&self) -> &[String] {
        match self {
            Constraint::PrimaryKey(c) | Constraint::Unique(c) => &c.column_names,
            Constraint::ForeignKey(c) => &c.column_names,
            Constraint::Check(c) => &c.column_names,
            Constraint::Default(c) => &c.column_names,
            Constraint::Index(c) => &c.column_names,
        }
    }
}

/// Every constraint of one table, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraints {
    pub primary_key: Option<KeyConstraint>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    pub uniques: Vec<KeyConstraint>,
    pub checks: Vec<CheckConstraint>,
    pub defaults: Vec<DefaultConstraint>,
}

impl TableConstraints {
    /// The constraints of one kind. Indexes are loaded separately and are
    /// never part of this set.
    pub fn of_kind(&self, kind: ConstraintKind) -> Vec<Constraint> {
        match kind {
            ConstraintKind::PrimaryKey => self
                .primary_key
                .iter()
                .cloned()
                .map(Constraint::PrimaryKey)
                .collect(),
            ConstraintKind::ForeignKey => self
                .foreign_keys
                .iter()
                .cloned()
                .map(Constraint::ForeignKey)
                .collect(),
            ConstraintKind::Unique => self.uniques.iter().cloned().map(Constraint::Unique).collect(),
            ConstraintKind::Check => self.checks.iter().cloned().map(Constraint::Check).collect(),
            ConstraintKind::Default => self.defaults.iter().cloned().map(Constraint::Default).collect(),
            ConstraintKind::Index => Vec::new(),
        }
    }
}

/// Rows sharing a key, kept in first-appearance order.
struct Grouped<'a> {
    order: Vec<(String, String)>,
    rows: HashMap<(String, String), Vec<&'a Row>>,
}

impl<'a> Grouped<'a> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }

    fn push(&mut self, key: (String, String), row: &'a Row) {
        let entry = self.rows.entry(key.clone()).or_default();
        if entry.is_empty() {
            self.order.push(key);
        }
        entry.push(row);
    }

    fn into_groups(mut self) -> impl Iterator<Item = ((String, String), Vec<&'a Row>)> {
        let order = std::mem::take(&mut self.order);
        order.into_iter().filter_map(move |key| {
            let rows = self.rows.remove(&key)?;
            Some((key, rows))
        })
    }
}

fn column_names(rows: &[&Row], column: &str) -> TsqlResult<Vec<String>> {
    let mut names = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(name) = row.get_opt::<String>(column)? {
            names.push(name);
        }
    }
    Ok(names)
}

fn referential_action(raw: Option<String>) -> Option<String> {
    raw.map(|a| a.replace('_', " "))
}

/// Collapse the denormalized rows of the combined constraint query into
/// typed lists. Rows are grouped by `(type, name)`; each group keeps the
/// row order of the query.
pub(crate) fn group_table_constraints(rows: &[Row]) -> TsqlResult<TableConstraints> {
    let mut grouped = Grouped::new();
    for row in rows {
        let kind: String = row.try_get_column("type")?;
        let name: String = row.try_get_column("name")?;
        grouped.push((kind.trim().to_ascii_uppercase(), name), row);
    }

    let mut constraints = TableConstraints::default();
    for ((kind, name), rows) in grouped.into_groups() {
        let first = rows[0];
        match kind.as_str() {
            "PK" => {
                constraints.primary_key = Some(KeyConstraint {
                    name,
                    column_names: column_names(&rows, "column_name")?,
                });
            }
            "UQ" => constraints.uniques.push(KeyConstraint {
                name,
                column_names: column_names(&rows, "column_name")?,
            }),
            "F" => constraints.foreign_keys.push(ForeignKeyConstraint {
                name,
                column_names: column_names(&rows, "column_name")?,
                foreign_schema_name: first.get_opt("foreign_table_schema")?,
                foreign_table_name: first.get_opt("foreign_table_name")?.unwrap_or_default(),
                foreign_column_names: column_names(&rows, "foreign_column_name")?,
                on_delete: referential_action(first.get_opt("on_delete")?),
                on_update: referential_action(first.get_opt("on_update")?),
            }),
            "C" => constraints.checks.push(CheckConstraint {
                name,
                column_names: column_names(&rows, "column_name")?,
                expression: first.get_opt("check_expr")?.unwrap_or_default(),
            }),
            "D" => constraints.defaults.push(DefaultConstraint {
                name,
                column_names: column_names(&rows, "column_name")?,
                value: first.get_opt("default_expr")?.unwrap_or_default(),
            }),
            other => {
                tracing::trace!(kind = other, name = %name, "skipping unknown constraint type");
            }
        }
    }
    Ok(constraints)
}

/// Collapse the index query rows into one constraint per index.
pub(crate) fn group_indexes(rows: &[Row]) -> TsqlResult<Vec<IndexConstraint>> {
    let mut grouped = Grouped::new();
    for row in rows {
        let name: String = row.try_get_column("name")?;
        grouped.push((String::new(), name), row);
    }

    let mut indexes = Vec::new();
    for ((_, name), rows) in grouped.into_groups() {
        let first = rows[0];
        indexes.push(IndexConstraint {
            name,
            column_names: column_names(&rows, "column_name")?,
            is_unique: first.get_opt::<bool>("index_is_unique")?.unwrap_or(false),
            is_primary: first.get_opt::<bool>("index_is_primary")?.unwrap_or(false),
        });
    }
    Ok(indexes)
}
