//! Dialect-neutral relational schema management.
//!
//! `squill` models tables, columns, constraints, indexes and views as plain
//! Rust values and maps them to and from real databases:
//! - DDL synthesis is dialect-aware (SQLite, PostgreSQL, MySQL), with a
//!   per-dialect capability matrix deciding what can run as a direct
//!   `ALTER TABLE`
//! - Catalog introspection reads live structure back into the same model,
//!   so synthesized and introspected schemas compare and round-trip
//! - A structural parser recovers the model from stored `CREATE TABLE`
//!   text where no catalog exists (SQLite)
//! - Changes SQLite cannot `ALTER` are applied by rebuilding the table in
//!   place, preserving rows and indexes
//!
//! # Architecture
//!
//! - **model** - The dialect-neutral schema objects
//! - **types** - Logical types and per-dialect type maps
//! - **dialect** - Capability matrix, identifier handling and DDL synthesis
//! - **parser** - Structural `CREATE TABLE` parser
//! - **introspect** - Catalog readers per database
//! - **recreate** / **manager** - Applying changes to live SQLite databases
//!
//! # Example
//!
//! ```rust,ignore
//! use squill::prelude::*;
//!
//! let table = Table::new("users")
//!     .column(
//!         Column::new("users", "id", LogicalType::BigInt)
//!             .primary_key()
//!             .auto_increment(),
//!     )
//!     .column(Column::new("users", "email", LogicalType::Text).not_null().unique());
//!
//! let dialect = SqliteDialect::new();
//! for sql in dialect.create_table_statements(&table)? {
//!     println!("{sql}");
//! }
//! ```

pub mod dialect;
pub mod error;
pub mod introspect;
pub mod manager;
pub mod model;
pub mod parser;
pub mod recreate;
pub mod types;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{
        Dialect, MySqlDialect, PendingChanges, PostgresDialect, ServerVersion, SqliteDialect,
        TableChange, dialect_for, register_dialect,
    };
    pub use crate::error::{Result, SchemaError};
    pub use crate::introspect::{MySqlReader, PostgresReader, SqliteReader};
    pub use crate::manager::SchemaManager;
    pub use crate::model::{
        CheckConstraint, Column, ColumnReference, DefaultConstraint, ForeignKeyConstraint, Index,
        OrderedColumn, PrimaryKeyConstraint, ReferentialAction, SortOrder, Table, UniqueConstraint,
        View,
    };
    pub use crate::parser::parse_create_table;
    pub use crate::recreate::recreate_table;
    pub use crate::types::{LogicalType, SqlAffinity, TypeDescriptor, TypeMap};
}
