use crate::schema::constraint::TableConstraints;
use crate::schema::table::TableDescriptor;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Memoized result of a table lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedTable {
    Found(Arc<TableDescriptor>),
    /// The table was looked up and does not exist.
    NotFound,
}

impl CachedTable {
    pub fn descriptor(&self) -> Option<Arc<TableDescriptor>> {
        match self {
            CachedTable::Found(table) => Some(Arc::clone(table)),
            CachedTable::NotFound => None,
        }
    }
}

/// Storage for loaded metadata, keyed by the resolved table name
/// (`schema.table`).
///
/// Implementations decide eviction and sharing; concurrent loads of the same
/// key are not deduplicated by the caller.
pub trait SchemaCache: Send + Sync {
    fn get_table(&self, key: &str) -> Option<CachedTable>;

    fn put_table(&self, key: &str, entry: CachedTable);

    fn get_constraints(&self, key: &str) -> Option<Arc<TableConstraints>>;

    fn put_constraints(&self, key: &str, constraints: Arc<TableConstraints>);

    /// Forget everything known about one table.
    fn invalidate(&self, key: &str);

    fn clear(&self);
}

/// In-process [`SchemaCache`] behind read/write locks.
#[derive(Debug, Default)]
pub struct MemorySchemaCache {
    tables: RwLock<HashMap<String, CachedTable>>,
    constraints: RwLock<HashMap<String, Arc<TableConstraints>>>,
}

impl MemorySchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached table entries, found or not.
    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaCache for MemorySchemaCache {
    fn get_table(&self, key: &str) -> Option<CachedTable> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let hit = tables.get(key).cloned();
        tracing::trace!(key, hit = hit.is_some(), "schema cache lookup");
        hit
    }

    fn put_table(&self, key: &str, entry: CachedTable) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    fn get_constraints(&self, key: &str) -> Option<Arc<TableConstraints>> {
        self.constraints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put_constraints(&self, key: &str, constraints: Arc<TableConstraints>) {
        self.constraints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), constraints);
    }

    fn invalidate(&self, key: &str) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        self.constraints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.tables.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.constraints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
