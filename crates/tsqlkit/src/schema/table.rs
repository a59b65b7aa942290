use crate::ident::QualifiedName;
use crate::schema::column::ColumnDescriptor;
use serde::{Deserialize, Serialize};

/// A foreign key as seen from the referencing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableForeignKey {
    pub name: String,
    /// Referenced table, schema-qualified when the catalog reports a schema.
    pub foreign_table: String,
    /// `(local column, referenced column)` pairs in key order.
    pub columns: Vec<(String, String)>,
}

/// Metadata of one table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: QualifiedName,
    /// Columns in catalog order.
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Vec<String>,
    /// `Some("")` when the primary key has an identity column.
    pub sequence_name: Option<String>,
    pub foreign_keys: Vec<TableForeignKey>,
    pub comment: Option<String>,
}

impl TableDescriptor {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            sequence_name: None,
            foreign_keys: Vec::new(),
            comment: None,
        }
    }

    /// Append a column (builder style, used when describing tables by hand).
    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Mark columns as the primary key and back-fill the column flags.
    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self.backfill_primary_key();
        self
    }

    /// Look up a column by name; an exact match wins over a case-insensitive one.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary-key columns in key order.
    pub fn primary_key_columns(&self) -> Vec<&ColumnDescriptor> {
        self.primary_key.iter().filter_map(|n| self.column(n)).collect()
    }

    /// Set `is_primary_key` on key columns and derive `sequence_name`.
    pub(crate) fn backfill_primary_key(&mut self) {
        let mut has_identity = false;
        for column in &mut self.columns {
            column.is_primary_key = self
                .primary_key
                .iter()
                .any(|pk| pk.eq_ignore_ascii_case(&column.name));
            if column.is_primary_key && column.auto_increment {
                has_identity = true;
            }
        }
        if has_identity {
            self.sequence_name = Some(String::new());
        }
    }
}
