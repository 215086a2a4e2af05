//! Dialect abstraction: capability matrix, identifier normalization, and
//! DDL synthesis.
//!
//! One [`Dialect`] implementation exists per target engine. The trait
//! carries default statement-builder methods for everything standard SQL
//! expresses the same way; dialects override where their syntax or
//! capabilities diverge.
//!
//! Capability queries return plain booleans and never error. Attempting an
//! operation the dialect cannot express returns
//! [`SchemaError::Unsupported`](crate::error::SchemaError::Unsupported).

mod mysql;
mod pending;
mod postgres;
mod registry;
mod sqlite;

pub use mysql::MySqlDialect;
pub use pending::PendingChanges;
pub use postgres::PostgresDialect;
pub use registry::{dialect_for, register_dialect, reset_dialects};
pub use sqlite::SqliteDialect;

use crate::error::{Result, SchemaError};
use crate::model::{
    CheckConstraint, Column, ForeignKeyConstraint, Index, OrderedColumn, PrimaryKeyConstraint,
    Table, UniqueConstraint, View,
};
use crate::types::TypeMap;

/// A parsed server version, used for version-gated capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ServerVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl ServerVersion {
    /// Creates a version from its parts.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a server version string leniently.
    ///
    /// Accepts suffixed forms such as `"8.0.16-log"` or
    /// `"16.2 (Debian 16.2-1)"`; missing components read as zero.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut parts = text
            .trim()
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('.')
            .map(|part| {
                part.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse::<u32>()
                    .unwrap_or(0)
            });
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }

    /// Returns whether this version is at least the given one.
    #[must_use]
    pub fn at_least(self, major: u32, minor: u32, patch: u32) -> bool {
        self >= Self::new(major, minor, patch)
    }
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A requested structural change, used to decide whether a direct
/// `ALTER TABLE` suffices or the table must be recreated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableChange<'a> {
    /// Add the given column.
    AddColumn(&'a Column),
    /// Drop a column.
    DropColumn,
    /// Rename a column.
    RenameColumn,
    /// Rename the table.
    RenameTable,
    /// Change a column's type or nullability.
    AlterColumnType,
    /// Add a primary key constraint.
    AddPrimaryKey,
    /// Drop the primary key constraint.
    DropPrimaryKey,
    /// Add a unique constraint.
    AddUnique,
    /// Drop a named unique constraint.
    DropUnique,
    /// Add a check constraint.
    AddCheck,
    /// Drop a check constraint.
    DropCheck,
    /// Add a default constraint.
    AddDefault,
    /// Drop a default constraint.
    DropDefault,
    /// Add a foreign key constraint.
    AddForeignKey,
    /// Drop a foreign key constraint.
    DropForeignKey,
}

/// One target engine's capability matrix, identifier rules, type map, and
/// DDL synthesis.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    // --- capability matrix -------------------------------------------------

    /// Whether the dialect has schemas as a namespace distinct from the
    /// database.
    fn supports_schemas(&self) -> bool;

    /// Whether foreign key constraints can carry names.
    fn supports_named_foreign_keys(&self) -> bool {
        true
    }

    /// Whether constraint key columns honor ASC/DESC.
    ///
    /// When this is `false`, synthesis silently normalizes key directions to
    /// ascending.
    fn supports_ordered_keys(&self) -> bool;

    /// Whether check constraints are supported on the given server version.
    fn supports_check_constraints(&self, server: ServerVersion) -> bool {
        let _ = server;
        true
    }

    /// Whether the requested change can be expressed as a direct
    /// `ALTER TABLE` on the given server version. When `false` on the
    /// rewrite-only dialect, the recreate-table executor takes over.
    fn can_alter_directly(&self, change: &TableChange<'_>, server: ServerVersion) -> bool;

    /// The query returning the server's version string.
    fn version_query(&self) -> &'static str;

    // --- identifier normalizer / quoter (pure, no I/O) ---------------------

    /// Applies the dialect's casing rule for unquoted identifiers.
    fn normalize_case(&self, ident: &str) -> String {
        ident.to_string()
    }

    /// Returns the opening and closing identifier quote characters.
    fn quote_chars(&self) -> (char, char) {
        ('"', '"')
    }

    /// Quotes an identifier after normalizing its case.
    fn quote_identifier(&self, ident: &str) -> String {
        let (open, close) = self.quote_chars();
        format!("{open}{}{close}", self.normalize_case(ident))
    }

    /// Produces a schema-qualified, quoted name.
    fn qualified_name(&self, schema: Option<&str>, name: &str) -> String {
        match schema.filter(|_| self.supports_schemas()) {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(name)
            ),
            None => self.quote_identifier(name),
        }
    }

    // --- types -------------------------------------------------------------

    /// The dialect's ordered physical type list.
    fn type_map(&self) -> &TypeMap;

    /// Physical type override used for auto-increment columns, when the
    /// dialect expresses auto-increment as a type rather than a keyword.
    fn auto_increment_type(&self, column: &Column) -> Option<String> {
        let _ = column;
        None
    }

    /// The auto-increment keyword, empty when the dialect has none.
    fn auto_increment_sql(&self) -> &'static str;

    /// Renders the physical SQL type for a column, honoring any
    /// physical-type override on the column itself.
    fn column_type_sql(&self, column: &Column) -> String {
        if let Some(ref physical) = column.provider_type {
            return physical.clone();
        }
        if column.auto_increment {
            if let Some(physical) = self.auto_increment_type(column) {
                return physical;
            }
        }
        self.type_map()
            .to_physical(&column.type_desc, column.auto_increment)
    }

    // --- synthesis: key lists ----------------------------------------------

    /// Renders a constraint key column, honoring direction only when the
    /// dialect supports ordered keys.
    fn key_column_sql(&self, column: &OrderedColumn) -> String {
        use crate::model::SortOrder;
        if self.supports_ordered_keys() && column.order == SortOrder::Descending {
            format!("{} DESC", self.quote_identifier(&column.name))
        } else {
            self.quote_identifier(&column.name)
        }
    }

    /// Renders an index key column; indexes honor direction everywhere.
    fn index_column_sql(&self, column: &OrderedColumn) -> String {
        use crate::model::SortOrder;
        if column.order == SortOrder::Descending {
            format!("{} DESC", self.quote_identifier(&column.name))
        } else {
            self.quote_identifier(&column.name)
        }
    }

    fn key_list_sql(&self, columns: &[OrderedColumn]) -> String {
        columns
            .iter()
            .map(|c| self.key_column_sql(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // --- synthesis: table-level constraint clauses -------------------------

    /// Renders a table-level `PRIMARY KEY` clause.
    fn primary_key_clause(&self, pk: &PrimaryKeyConstraint) -> String {
        format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_identifier(&pk.name),
            self.key_list_sql(&pk.columns)
        )
    }

    /// Renders a table-level `UNIQUE` clause.
    fn unique_clause(&self, unique: &UniqueConstraint) -> String {
        format!(
            "CONSTRAINT {} UNIQUE ({})",
            self.quote_identifier(&unique.name),
            self.key_list_sql(&unique.columns)
        )
    }

    /// Renders a table-level `CHECK` clause.
    fn check_clause(&self, check: &CheckConstraint) -> String {
        format!(
            "CONSTRAINT {} CHECK ({})",
            self.quote_identifier(&check.name),
            check.expression
        )
    }

    /// Renders a table-level `FOREIGN KEY` clause.
    fn foreign_key_clause(&self, fk: &ForeignKeyConstraint) -> String {
        let mut sql = String::new();
        if self.supports_named_foreign_keys() {
            sql.push_str("CONSTRAINT ");
            sql.push_str(&self.quote_identifier(&fk.name));
            sql.push(' ');
        }
        sql.push_str("FOREIGN KEY (");
        sql.push_str(&self.key_list_sql(&fk.columns));
        sql.push_str(") REFERENCES ");
        sql.push_str(&self.quote_identifier(&fk.referenced_table));
        sql.push_str(" (");
        sql.push_str(&self.key_list_sql(&fk.referenced_columns));
        sql.push(')');
        if fk.on_delete != crate::model::ReferentialAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(fk.on_delete.as_sql());
        }
        if fk.on_update != crate::model::ReferentialAction::NoAction {
            sql.push_str(" ON UPDATE ");
            sql.push_str(fk.on_update.as_sql());
        }
        sql
    }

    // --- synthesis: column definitions -------------------------------------

    /// Renders one column definition.
    ///
    /// `inline_pk` marks the column whose single-column primary key is
    /// emitted inline. Flags a column definition cannot express inline
    /// (unique, indexed, foreign key, membership in a composite primary key)
    /// accumulate into `pending` for emission after the primary statement.
    fn column_definition_sql(
        &self,
        column: &Column,
        inline_pk: bool,
        pending: &mut PendingChanges,
    ) -> Result<String> {
        column.validate()?;

        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type_sql(column)
        );

        if inline_pk {
            sql.push_str(" PRIMARY KEY");
            if column.auto_increment && !self.auto_increment_sql().is_empty() {
                sql.push(' ');
                sql.push_str(self.auto_increment_sql());
            }
        } else {
            if column.primary_key {
                pending.note_primary_key_column(&column.table, &column.name);
            }
            if !column.nullable {
                sql.push_str(" NOT NULL");
            }
            if column.auto_increment && !self.auto_increment_sql().is_empty() {
                sql.push(' ');
                sql.push_str(self.auto_increment_sql());
            }
        }

        if let Some(ref default) = column.default_expr {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }

        if let Some(ref check) = column.check_expr {
            sql.push_str(&format!(" CHECK ({check})"));
        }

        if column.unique && !column.primary_key {
            pending.note_unique_column(&column.table, &column.name);
        }
        if column.indexed && !column.unique && !column.primary_key {
            pending.note_indexed_column(&column.table, &column.name);
        }
        if let Some(ref reference) = column.references {
            pending.note_foreign_key_column(&column.table, &column.name, reference);
        }

        Ok(sql)
    }

    // --- synthesis: tables -------------------------------------------------

    /// Builds the statements creating a table: one `CREATE TABLE` carrying
    /// columns and table-level constraints, followed by `CREATE INDEX`
    /// statements.
    fn create_table_statements(&self, table: &Table) -> Result<Vec<String>> {
        table.validate()?;

        let mut pending = PendingChanges::default();
        let pk_columns = table.primary_key_columns();
        let inline_pk_column = if pk_columns.len() == 1 {
            Some(pk_columns[0].name.clone())
        } else {
            None
        };

        let mut column_defs = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            // Apply a modeled default constraint to its column when the
            // column carries none itself.
            let mut column = column.clone();
            if column.default_expr.is_none() {
                if let Some(default) = table
                    .defaults
                    .iter()
                    .find(|d| crate::model::ident_eq(&d.column, &column.name))
                {
                    column.default_expr = Some(default.expression.clone());
                }
            }
            let inline_pk = inline_pk_column
                .as_deref()
                .is_some_and(|pk| crate::model::ident_eq(pk, &column.name));
            column_defs.push(self.column_definition_sql(&column, inline_pk, &mut pending)?);
        }

        // Table-level constraints in the fixed documented order, merging
        // the table's own lists with what column flags implied.
        let mut clauses = Vec::new();
        if inline_pk_column.is_none() {
            if let Some(pk) = table
                .primary_key
                .clone()
                .or_else(|| pending.take_primary_key())
            {
                clauses.push(self.primary_key_clause(&pk));
            }
        }
        for check in &table.checks {
            // Column-inline checks were already rendered on the column.
            if check
                .column
                .as_deref()
                .and_then(|c| table.get_column(c))
                .is_some_and(|c| c.check_expr.as_deref() == Some(check.expression.as_str()))
            {
                continue;
            }
            clauses.push(self.check_clause(check));
        }
        for unique in table.uniques.iter().chain(pending.uniques()) {
            clauses.push(self.unique_clause(unique));
        }
        for fk in table.foreign_keys.iter().chain(pending.foreign_keys()) {
            clauses.push(self.foreign_key_clause(fk));
        }

        let qualified = self.qualified_name(table.schema.as_deref(), &table.name);
        let mut sql = format!("CREATE TABLE {qualified} (\n  ");
        sql.push_str(&column_defs.join(",\n  "));
        for clause in &clauses {
            sql.push_str(",\n  ");
            sql.push_str(clause);
        }
        sql.push_str("\n)");

        let mut statements = vec![sql];
        for index in table.indexes.iter().chain(pending.indexes()) {
            statements.push(self.create_index_sql(table.schema.as_deref(), index));
        }
        Ok(statements)
    }

    /// Generates `DROP TABLE`.
    fn drop_table_sql(&self, schema: Option<&str>, table: &str) -> String {
        format!("DROP TABLE {}", self.qualified_name(schema, table))
    }

    /// Generates `ALTER TABLE ... RENAME TO`.
    fn rename_table_sql(&self, schema: Option<&str>, table: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.qualified_name(schema, table),
            self.quote_identifier(new_name)
        )
    }

    /// Generates the statement emptying a table.
    fn truncate_table_sql(&self, schema: Option<&str>, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.qualified_name(schema, table))
    }

    // --- synthesis: schemas ------------------------------------------------

    /// Generates `CREATE SCHEMA`; errors on dialects without schemas.
    fn create_schema_sql(&self, schema: &str) -> Result<String> {
        if !self.supports_schemas() {
            return Err(SchemaError::unsupported(self.name(), "CREATE SCHEMA"));
        }
        Ok(format!("CREATE SCHEMA {}", self.quote_identifier(schema)))
    }

    /// Generates `DROP SCHEMA`; errors on dialects without schemas.
    fn drop_schema_sql(&self, schema: &str) -> Result<String> {
        if !self.supports_schemas() {
            return Err(SchemaError::unsupported(self.name(), "DROP SCHEMA"));
        }
        Ok(format!(
            "DROP SCHEMA {} CASCADE",
            self.quote_identifier(schema)
        ))
    }

    // --- synthesis: columns ------------------------------------------------

    /// Builds the statements adding a column: the `ALTER TABLE ADD COLUMN`,
    /// then any constraints/indexes the column flags implied, in the fixed
    /// documented order.
    fn add_column_statements(&self, schema: Option<&str>, column: &Column) -> Result<Vec<String>> {
        let mut pending = PendingChanges::default();
        let definition = self.column_definition_sql(column, false, &mut pending)?;
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD COLUMN {definition}",
            self.qualified_name(schema, &column.table)
        )];
        statements.extend(pending.alter_statements(self, schema)?);
        Ok(statements)
    }

    /// Generates `ALTER TABLE ... DROP COLUMN`.
    fn drop_column_sql(&self, schema: Option<&str>, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.qualified_name(schema, table),
            self.quote_identifier(column)
        )
    }

    /// Generates `ALTER TABLE ... RENAME COLUMN`.
    fn rename_column_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        new_name: &str,
    ) -> String {
        format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.qualified_name(schema, table),
            self.quote_identifier(column),
            self.quote_identifier(new_name)
        )
    }

    // --- synthesis: constraints on existing tables -------------------------

    /// Generates `ALTER TABLE ... ADD CONSTRAINT ... PRIMARY KEY`.
    fn add_primary_key_sql(
        &self,
        schema: Option<&str>,
        pk: &PrimaryKeyConstraint,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.qualified_name(schema, &pk.table),
            self.primary_key_clause(pk)
        ))
    }

    /// Generates the statement dropping a primary key.
    fn drop_primary_key_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    /// Generates `ALTER TABLE ... ADD CONSTRAINT ... UNIQUE`.
    fn add_unique_sql(&self, schema: Option<&str>, unique: &UniqueConstraint) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.qualified_name(schema, &unique.table),
            self.unique_clause(unique)
        ))
    }

    /// Generates the statement dropping a unique constraint.
    fn drop_unique_sql(&self, schema: Option<&str>, table: &str, name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    /// Generates `ALTER TABLE ... ADD CONSTRAINT ... CHECK`.
    fn add_check_sql(&self, schema: Option<&str>, check: &CheckConstraint) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.qualified_name(schema, &check.table),
            self.check_clause(check)
        ))
    }

    /// Generates the statement dropping a check constraint.
    fn drop_check_sql(&self, schema: Option<&str>, table: &str, name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    /// Generates the statement attaching a column default.
    fn add_default_sql(
        &self,
        schema: Option<&str>,
        constraint: &crate::model::DefaultConstraint,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            self.qualified_name(schema, &constraint.table),
            self.quote_identifier(&constraint.column),
            constraint.expression
        ))
    }

    /// Generates the statement removing a column default.
    fn drop_default_sql(&self, schema: Option<&str>, table: &str, column: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            self.qualified_name(schema, table),
            self.quote_identifier(column)
        ))
    }

    /// Generates `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    fn add_foreign_key_sql(
        &self,
        schema: Option<&str>,
        fk: &ForeignKeyConstraint,
    ) -> Result<String> {
        fk.validate()?;
        Ok(format!(
            "ALTER TABLE {} ADD {}",
            self.qualified_name(schema, &fk.table),
            self.foreign_key_clause(fk)
        ))
    }

    /// Generates the statement dropping a foreign key.
    fn drop_foreign_key_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    // --- synthesis: indexes ------------------------------------------------

    /// Generates `CREATE [UNIQUE] INDEX`.
    fn create_index_sql(&self, schema: Option<&str>, index: &Index) -> String {
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.qualified_name(schema, &index.table));
        sql.push_str(" (");
        let cols: Vec<String> = index.columns.iter().map(|c| self.index_column_sql(c)).collect();
        sql.push_str(&cols.join(", "));
        sql.push(')');
        sql
    }

    /// Generates `DROP INDEX`.
    fn drop_index_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        let _ = table;
        format!("DROP INDEX {}", self.qualified_name(schema, name))
    }

    // --- synthesis: views --------------------------------------------------

    /// Generates `CREATE VIEW`.
    fn create_view_sql(&self, view: &View) -> String {
        format!(
            "CREATE VIEW {} AS {}",
            self.qualified_name(view.schema.as_deref(), &view.name),
            view.definition
        )
    }

    /// Generates `DROP VIEW`.
    fn drop_view_sql(&self, schema: Option<&str>, name: &str) -> String {
        format!("DROP VIEW {}", self.qualified_name(schema, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_version_parse() {
        assert_eq!(ServerVersion::parse("8.0.16-log"), ServerVersion::new(8, 0, 16));
        assert_eq!(
            ServerVersion::parse("16.2 (Debian 16.2-1)"),
            ServerVersion::new(16, 2, 0)
        );
        assert_eq!(ServerVersion::parse("3.45.1"), ServerVersion::new(3, 45, 1));
        assert_eq!(ServerVersion::parse("garbage"), ServerVersion::new(0, 0, 0));
    }

    #[test]
    fn test_server_version_at_least() {
        let v = ServerVersion::new(8, 0, 16);
        assert!(v.at_least(8, 0, 16));
        assert!(v.at_least(5, 7, 0));
        assert!(!v.at_least(8, 0, 17));
        assert!(!v.at_least(9, 0, 0));
    }

    #[test]
    fn test_table_change_comparisons() {
        let column = Column::new("t", "c", crate::types::LogicalType::Text);
        assert_eq!(
            TableChange::AddColumn(&column),
            TableChange::AddColumn(&column)
        );
        assert_ne!(TableChange::DropColumn, TableChange::RenameColumn);
    }
}
