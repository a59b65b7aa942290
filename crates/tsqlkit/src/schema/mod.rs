//! Table metadata: descriptors, catalog loading and caching.

mod cache;
mod column;
mod constraint;
mod loader;
mod table;

pub use cache::{CachedTable, MemorySchemaCache, SchemaCache};
pub use column::{AbstractType, ColumnDescriptor, DefaultValue, parse_default};
pub use constraint::{
    CheckConstraint, Constraint, ConstraintKind, DefaultConstraint, ForeignKeyConstraint,
    IndexConstraint, KeyConstraint, TableConstraints,
};
pub use loader::{DEFAULT_SCHEMA_SQL, SchemaLoader};
pub use table::{TableDescriptor, TableForeignKey};
