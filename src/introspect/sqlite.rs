//! SQLite catalog reader.
//!
//! SQLite has no information-schema; the reader parses the stored
//! `CREATE TABLE` text out of `sqlite_master` with the structural parser
//! and supplements it with `PRAGMA index_list`/`index_xinfo` for indexes
//! the DDL text does not carry.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::dialect::{Dialect, ServerVersion, SqliteDialect};
use crate::error::Result;
use crate::model::{Table, View};
use crate::parser::parse_create_table;

use super::{RawIndexColumn, apply_index_rows, associate_check_column};

/// Reads schema objects from a SQLite connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteReader;

impl SqliteReader {
    /// Creates a new reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Queries the server version.
    pub async fn server_version(&self, conn: &mut SqliteConnection) -> Result<ServerVersion> {
        let (version,): (String,) = sqlx::query_as(SqliteDialect::new().version_query())
            .fetch_one(&mut *conn)
            .await?;
        Ok(ServerVersion::parse(&version))
    }

    /// Returns whether a table exists.
    pub async fn table_exists(&self, conn: &mut SqliteConnection, name: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.is_some())
    }

    /// Lists table names, optionally filtered with a `LIKE` pattern.
    /// Internal `sqlite_` tables are never reported.
    pub async fn list_table_names(
        &self,
        conn: &mut SqliteConnection,
        filter: Option<&str>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = match filter {
            Some(pattern) => {
                sqlx::query_as(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name LIKE ? \
                     ORDER BY name",
                )
                .bind(pattern)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )
                .fetch_all(&mut *conn)
                .await?
            }
        };
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Returns the stored `CREATE TABLE` text for a table.
    pub async fn table_ddl(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(sql,)| sql))
    }

    /// Reads one table, or `None` when it does not exist.
    pub async fn read_table(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Table>> {
        let Some(ddl) = self.table_ddl(conn, name).await? else {
            return Ok(None);
        };
        debug!(table = name, "parsing stored CREATE TABLE text");
        let mut table = parse_create_table(&ddl, SqliteDialect::new().type_map())?;

        let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        for check in &mut table.checks {
            if check.column.is_none() {
                check.column = associate_check_column(&check.expression, &column_names);
            }
        }

        let indexes = self.index_rows(conn, name).await?;
        apply_index_rows(&mut table, indexes);
        Ok(Some(table))
    }

    /// Reads the explicitly created (non-constraint-backing) indexes of a
    /// table via pragmas.
    async fn index_rows(
        &self,
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Vec<RawIndexColumn>> {
        let dialect = SqliteDialect::new();
        let list: Vec<(i64, String, i64, String, i64)> = sqlx::query_as(&format!(
            "PRAGMA index_list({})",
            dialect.quote_identifier(table)
        ))
        .fetch_all(&mut *conn)
        .await?;

        let mut rows = Vec::new();
        for (_, index_name, unique, origin, _) in list {
            // Origins 'pk' and 'u' back constraints already reported from
            // the DDL text; only 'c' indexes were created explicitly.
            if origin != "c" {
                continue;
            }
            let info: Vec<(i64, i64, Option<String>, i64, String, i64)> = sqlx::query_as(
                &format!("PRAGMA index_xinfo({})", dialect.quote_identifier(&index_name)),
            )
            .fetch_all(&mut *conn)
            .await?;
            for (_, _, column, descending, _, key) in info {
                // Trailing rowid/expression entries carry no column name.
                let Some(column) = column.filter(|_| key == 1) else {
                    continue;
                };
                rows.push(RawIndexColumn {
                    index: index_name.clone(),
                    column,
                    unique: unique != 0,
                    descending: descending != 0,
                });
            }
        }
        Ok(rows)
    }

    /// Returns the stored `CREATE INDEX` statements for a table, skipping
    /// auto-created constraint indexes (their `sql` is NULL).
    pub async fn index_statements(
        &self,
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT sql FROM sqlite_master \
             WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(sql,)| sql).collect())
    }

    /// Lists index names on a table.
    pub async fn list_index_names(
        &self,
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ? ORDER BY name",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Returns whether a view exists.
    pub async fn view_exists(&self, conn: &mut SqliteConnection, name: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = 'view' AND name = ?")
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.is_some())
    }

    /// Reads one view, or `None` when it does not exist.
    pub async fn read_view(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<View>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT sql FROM sqlite_master WHERE type = 'view' AND name = ?")
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(sql,)| View::new(name, sql)))
    }

    /// Lists view names, optionally filtered with a `LIKE` pattern.
    pub async fn list_view_names(
        &self,
        conn: &mut SqliteConnection,
        filter: Option<&str>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = match filter {
            Some(pattern) => {
                sqlx::query_as(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'view' AND name LIKE ? ORDER BY name",
                )
                .bind(pattern)
                .fetch_all(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'view' ORDER BY name")
                    .fetch_all(&mut *conn)
                    .await?
            }
        };
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}
