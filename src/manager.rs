//! Schema manager: one call per schema operation, resolved against a live
//! SQLite connection.
//!
//! Every create operation checks existence first and returns `false`
//! without touching anything when the object is already there; every drop
//! returns `false` when the object is absent. Changes SQLite's
//! `ALTER TABLE` cannot express are routed through the recreate-table
//! executor. The manager never opens a transaction itself except inside
//! that executor; pass `external_transaction` when the connection is
//! already inside one so the executor leaves the boundary to the caller.

use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::dialect::{Dialect, ServerVersion, SqliteDialect, TableChange};
use crate::error::{Result, SchemaError};
use crate::introspect::SqliteReader;
use crate::model::{
    CheckConstraint, Column, DefaultConstraint, ForeignKeyConstraint, Index, OrderedColumn,
    PrimaryKeyConstraint, Table, UniqueConstraint, View, ident_eq,
};
use crate::recreate::recreate_table;

/// Converts `*`/`?` wildcards into a SQL `LIKE` pattern.
fn wildcard_to_like(pattern: &str) -> String {
    pattern.replace('*', "%").replace('?', "_")
}

/// Dialect-aware schema operations over one SQLite connection.
#[derive(Debug)]
pub struct SchemaManager<'c> {
    conn: &'c mut SqliteConnection,
    dialect: SqliteDialect,
    reader: SqliteReader,
    external_transaction: bool,
    server: Option<ServerVersion>,
}

impl<'c> SchemaManager<'c> {
    /// Creates a manager owning its statement sequencing; multi-statement
    /// changes that must be atomic run in their own transaction.
    #[must_use]
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self {
            conn,
            dialect: SqliteDialect::new(),
            reader: SqliteReader::new(),
            external_transaction: false,
            server: None,
        }
    }

    /// Marks the connection as already inside a caller-owned transaction;
    /// the manager will never commit or roll back.
    #[must_use]
    pub fn external_transaction(mut self) -> Self {
        self.external_transaction = true;
        self
    }

    /// The server version, queried once and memoized.
    pub async fn server_version(&mut self) -> Result<ServerVersion> {
        if let Some(version) = self.server {
            return Ok(version);
        }
        let version = self.reader.server_version(self.conn).await?;
        self.server = Some(version);
        Ok(version)
    }

    async fn execute_all(&mut self, statements: &[String]) -> Result<()> {
        for sql in statements {
            debug!(%sql, "executing");
            sqlx::query(sql).execute(&mut *self.conn).await?;
        }
        Ok(())
    }

    async fn require_table(&mut self, name: &str) -> Result<Table> {
        self.reader
            .read_table(self.conn, name)
            .await?
            .ok_or_else(|| SchemaError::InvalidArgument {
                name: "table",
                message: format!("table '{name}' does not exist"),
            })
    }

    async fn recreate_as(&mut self, desired: &Table) -> Result<()> {
        recreate_table(self.conn, desired, self.external_transaction).await
    }

    // --- tables ------------------------------------------------------------

    /// Returns whether a table exists.
    pub async fn table_exists(&mut self, name: &str) -> Result<bool> {
        self.reader.table_exists(self.conn, name).await
    }

    /// Reads one table, or `None` when it does not exist.
    pub async fn get_table(&mut self, name: &str) -> Result<Option<Table>> {
        self.reader.read_table(self.conn, name).await
    }

    /// Reads all tables whose name matches the `*`/`?` wildcard filter;
    /// `None` reads every table.
    pub async fn get_tables(&mut self, filter: Option<&str>) -> Result<Vec<Table>> {
        let like = filter.map(wildcard_to_like);
        let names = self
            .reader
            .list_table_names(self.conn, like.as_deref())
            .await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            if let Some(table) = self.reader.read_table(self.conn, &name).await? {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    /// Creates a table unless it already exists; returns whether anything
    /// was done.
    pub async fn create_table_if_not_exists(&mut self, table: &Table) -> Result<bool> {
        if self.table_exists(&table.name).await? {
            return Ok(false);
        }
        info!(table = %table.name, "creating table");
        let statements = self.dialect.create_table_statements(table)?;
        self.execute_all(&statements).await?;
        Ok(true)
    }

    /// Drops a table if it exists; returns whether anything was done.
    pub async fn drop_table_if_exists(&mut self, name: &str) -> Result<bool> {
        if !self.table_exists(name).await? {
            return Ok(false);
        }
        info!(table = name, "dropping table");
        let sql = self.dialect.drop_table_sql(None, name);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(true)
    }

    /// Renames a table.
    pub async fn rename_table(&mut self, name: &str, new_name: &str) -> Result<()> {
        let sql = self.dialect.rename_table_sql(None, name, new_name);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(())
    }

    /// Removes all rows from a table.
    pub async fn truncate_table(&mut self, name: &str) -> Result<()> {
        let sql = self.dialect.truncate_table_sql(None, name);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(())
    }

    // --- columns -----------------------------------------------------------

    /// Returns whether a column exists.
    pub async fn column_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .get_table(table)
            .await?
            .is_some_and(|t| t.get_column(column).is_some()))
    }

    /// Reads one column, or `None` when the table or column is absent.
    pub async fn get_column(&mut self, table: &str, column: &str) -> Result<Option<Column>> {
        Ok(self
            .get_table(table)
            .await?
            .and_then(|t| t.get_column(column).cloned()))
    }

    /// Adds a column unless it already exists; returns whether anything was
    /// done. Simple additions run as a direct `ALTER TABLE`; anything the
    /// engine cannot express that way rebuilds the table.
    pub async fn add_column_if_not_exists(&mut self, column: &Column) -> Result<bool> {
        let table = self.require_table(&column.table).await?;
        if table.get_column(&column.name).is_some() {
            return Ok(false);
        }
        let server = self.server_version().await?;
        if self
            .dialect
            .can_alter_directly(&TableChange::AddColumn(column), server)
        {
            info!(table = %column.table, column = %column.name, "adding column");
            let statements = self.dialect.add_column_statements(None, column)?;
            self.execute_all(&statements).await?;
        } else {
            info!(table = %column.table, column = %column.name, "adding column via rebuild");
            let mut desired = table;
            desired.columns.push(column.clone());
            self.recreate_as(&desired).await?;
        }
        Ok(true)
    }

    /// Drops a column if it exists; returns whether anything was done.
    /// SQLite rejects a direct `DROP COLUMN` for columns any key, index, or
    /// constraint depends on, so those go through the rebuild.
    pub async fn drop_column_if_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        let current = self.require_table(table).await?;
        if current.get_column(column).is_none() {
            return Ok(false);
        }
        let server = self.server_version().await?;
        if column_is_unconstrained(&current, column)
            && self
                .dialect
                .can_alter_directly(&TableChange::DropColumn, server)
        {
            info!(table, column, "dropping column");
            let sql = self.dialect.drop_column_sql(None, table, column);
            sqlx::query(&sql).execute(&mut *self.conn).await?;
        } else {
            info!(table, column, "dropping column via rebuild");
            let desired = without_column(current, column);
            self.recreate_as(&desired).await?;
        }
        Ok(true)
    }

    /// Renames a column.
    pub async fn rename_column(
        &mut self,
        table: &str,
        column: &str,
        new_name: &str,
    ) -> Result<()> {
        let sql = self.dialect.rename_column_sql(None, table, column, new_name);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(())
    }

    // --- primary keys ------------------------------------------------------

    /// Returns whether a table has a primary key.
    pub async fn primary_key_exists(&mut self, table: &str) -> Result<bool> {
        Ok(self
            .get_table(table)
            .await?
            .is_some_and(|t| !t.primary_key_columns().is_empty()))
    }

    /// Adds a primary key unless one exists; rebuilds the table.
    pub async fn add_primary_key_if_not_exists(
        &mut self,
        pk: &PrimaryKeyConstraint,
    ) -> Result<bool> {
        let table = self.require_table(&pk.table).await?;
        if !table.primary_key_columns().is_empty() {
            return Ok(false);
        }
        let mut desired = table;
        desired.primary_key = Some(pk.clone());
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    /// Drops the primary key if one exists; rebuilds the table.
    pub async fn drop_primary_key_if_exists(&mut self, table: &str) -> Result<bool> {
        let current = self.require_table(table).await?;
        if current.primary_key_columns().is_empty() {
            return Ok(false);
        }
        let mut desired = current;
        desired.primary_key = None;
        for column in &mut desired.columns {
            column.primary_key = false;
            column.auto_increment = false;
        }
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    // --- unique constraints ------------------------------------------------

    /// Returns whether a unique constraint with the given name exists.
    pub async fn unique_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        Ok(self.get_table(table).await?.is_some_and(|t| {
            t.uniques.iter().any(|u| ident_eq(&u.name, name))
                || t.columns.iter().any(|c| {
                    c.unique
                        && ident_eq(
                            &UniqueConstraint::default_name(
                                table,
                                &[OrderedColumn::new(c.name.clone())],
                            ),
                            name,
                        )
                })
        }))
    }

    /// Adds a unique constraint unless one with that name exists; rebuilds
    /// the table.
    pub async fn add_unique_if_not_exists(&mut self, unique: &UniqueConstraint) -> Result<bool> {
        if self.unique_exists(&unique.table, &unique.name).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(&unique.table).await?;
        desired.uniques.push(unique.clone());
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    /// Drops a unique constraint if it exists; rebuilds the table. SQLite
    /// cannot drop a named unique constraint directly.
    pub async fn drop_unique_if_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        if !self.unique_exists(table, name).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(table).await?;
        desired.uniques.retain(|u| !ident_eq(&u.name, name));
        for column in &mut desired.columns {
            if column.unique {
                let default = UniqueConstraint::default_name(
                    table,
                    &[OrderedColumn::new(column.name.clone())],
                );
                if ident_eq(&default, name) {
                    column.unique = false;
                }
            }
        }
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    // --- check constraints -------------------------------------------------

    /// Returns whether a check constraint with the given name exists.
    pub async fn check_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        Ok(self
            .get_table(table)
            .await?
            .is_some_and(|t| t.checks.iter().any(|c| ident_eq(&c.name, name))))
    }

    /// Adds a check constraint unless one with that name exists; rebuilds
    /// the table.
    pub async fn add_check_if_not_exists(&mut self, check: &CheckConstraint) -> Result<bool> {
        if self.check_exists(&check.table, &check.name).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(&check.table).await?;
        desired.checks.push(check.clone());
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    /// Drops a check constraint if it exists; rebuilds the table.
    pub async fn drop_check_if_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        if !self.check_exists(table, name).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(table).await?;
        desired.checks.retain(|c| !ident_eq(&c.name, name));
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    // --- default constraints -----------------------------------------------

    /// Returns whether a column has a default.
    pub async fn default_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        Ok(self
            .get_column(table, column)
            .await?
            .is_some_and(|c| c.default_expr.is_some()))
    }

    /// Attaches a column default unless one exists; rebuilds the table.
    pub async fn add_default_if_not_exists(
        &mut self,
        default: &DefaultConstraint,
    ) -> Result<bool> {
        if self.default_exists(&default.table, &default.column).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(&default.table).await?;
        let Some(column) = desired.get_column_mut(&default.column) else {
            return Err(SchemaError::InvalidArgument {
                name: "column",
                message: format!(
                    "column '{}' does not exist on table '{}'",
                    default.column, default.table
                ),
            });
        };
        column.default_expr = Some(default.expression.clone());
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    /// Removes a column default if one exists; rebuilds the table.
    pub async fn drop_default_if_exists(&mut self, table: &str, column: &str) -> Result<bool> {
        if !self.default_exists(table, column).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(table).await?;
        if let Some(col) = desired.get_column_mut(column) {
            col.default_expr = None;
        }
        desired.defaults.retain(|d| !ident_eq(&d.column, column));
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    // --- foreign keys ------------------------------------------------------

    /// Returns whether a foreign key with the given name exists.
    pub async fn foreign_key_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        Ok(self.get_table(table).await?.is_some_and(|t| {
            t.foreign_keys.iter().any(|fk| ident_eq(&fk.name, name))
                || t.columns.iter().any(|c| {
                    c.references.as_ref().is_some_and(|r| {
                        ident_eq(
                            &ForeignKeyConstraint::default_name(
                                table,
                                &[OrderedColumn::new(c.name.clone())],
                                &r.table,
                            ),
                            name,
                        )
                    })
                })
        }))
    }

    /// Adds a foreign key unless one with that name exists; rebuilds the
    /// table.
    pub async fn add_foreign_key_if_not_exists(
        &mut self,
        fk: &ForeignKeyConstraint,
    ) -> Result<bool> {
        fk.validate()?;
        if self.foreign_key_exists(&fk.table, &fk.name).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(&fk.table).await?;
        desired.foreign_keys.push(fk.clone());
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    /// Drops a foreign key if it exists; rebuilds the table.
    pub async fn drop_foreign_key_if_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        if !self.foreign_key_exists(table, name).await? {
            return Ok(false);
        }
        let mut desired = self.require_table(table).await?;
        desired.foreign_keys.retain(|fk| !ident_eq(&fk.name, name));
        for column in &mut desired.columns {
            let matches = column.references.as_ref().is_some_and(|r| {
                ident_eq(
                    &ForeignKeyConstraint::default_name(
                        table,
                        &[OrderedColumn::new(column.name.clone())],
                        &r.table,
                    ),
                    name,
                )
            });
            if matches {
                column.references = None;
            }
        }
        self.recreate_as(&desired).await?;
        Ok(true)
    }

    // --- indexes -----------------------------------------------------------

    /// Returns whether an index exists on a table.
    pub async fn index_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        let names = self.reader.list_index_names(self.conn, table).await?;
        Ok(names.iter().any(|n| ident_eq(n, name)))
    }

    /// Creates an index unless one with that name exists; returns whether
    /// anything was done.
    pub async fn create_index_if_not_exists(&mut self, index: &Index) -> Result<bool> {
        if self.index_exists(&index.table, &index.name).await? {
            return Ok(false);
        }
        info!(table = %index.table, index = %index.name, "creating index");
        let sql = self.dialect.create_index_sql(None, index);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(true)
    }

    /// Drops an index if it exists; returns whether anything was done.
    pub async fn drop_index_if_exists(&mut self, table: &str, name: &str) -> Result<bool> {
        if !self.index_exists(table, name).await? {
            return Ok(false);
        }
        let sql = self.dialect.drop_index_sql(None, table, name);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(true)
    }

    // --- views -------------------------------------------------------------

    /// Returns whether a view exists.
    pub async fn view_exists(&mut self, name: &str) -> Result<bool> {
        self.reader.view_exists(self.conn, name).await
    }

    /// Reads one view, or `None` when it does not exist.
    pub async fn get_view(&mut self, name: &str) -> Result<Option<View>> {
        self.reader.read_view(self.conn, name).await
    }

    /// Creates a view unless it already exists; returns whether anything
    /// was done.
    pub async fn create_view_if_not_exists(&mut self, view: &View) -> Result<bool> {
        if self.view_exists(&view.name).await? {
            return Ok(false);
        }
        info!(view = %view.name, "creating view");
        let sql = self.dialect.create_view_sql(view);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(true)
    }

    /// Drops a view if it exists; returns whether anything was done.
    pub async fn drop_view_if_exists(&mut self, name: &str) -> Result<bool> {
        if !self.view_exists(name).await? {
            return Ok(false);
        }
        let sql = self.dialect.drop_view_sql(None, name);
        sqlx::query(&sql).execute(&mut *self.conn).await?;
        Ok(true)
    }
}

/// Whether nothing else on the table depends on the column.
fn column_is_unconstrained(table: &Table, column: &str) -> bool {
    let Some(col) = table.get_column(column) else {
        return true;
    };
    if col.primary_key || col.unique || col.indexed || col.references.is_some() {
        return false;
    }
    let in_key = |cols: &[OrderedColumn]| cols.iter().any(|c| ident_eq(&c.name, column));
    table.primary_key.as_ref().is_none_or(|pk| !in_key(&pk.columns))
        && !table.uniques.iter().any(|u| in_key(&u.columns))
        && !table.foreign_keys.iter().any(|fk| fk.references_column(column))
        && !table.indexes.iter().any(|i| in_key(&i.columns))
}

/// Returns the table with the named column and everything referring to it
/// removed.
fn without_column(mut table: Table, column: &str) -> Table {
    table.columns.retain(|c| !ident_eq(&c.name, column));
    if let Some(ref pk) = table.primary_key {
        if pk.columns.iter().any(|c| ident_eq(&c.name, column)) {
            table.primary_key = None;
        }
    }
    table
        .checks
        .retain(|c| c.column.as_deref().is_none_or(|col| !ident_eq(col, column)));
    table.defaults.retain(|d| !ident_eq(&d.column, column));
    table
        .uniques
        .retain(|u| !u.columns.iter().any(|c| ident_eq(&c.name, column)));
    table.foreign_keys.retain(|fk| !fk.references_column(column));
    table
        .indexes
        .retain(|i| !i.columns.iter().any(|c| ident_eq(&c.name, column)));
    table
}
