//! MySQL catalog reader.
//!
//! Everything comes from information-schema views scoped to the current
//! database (`DATABASE()`); MySQL has no separate schema namespace. Unique
//! constraints double as indexes in `statistics`, so index reporting
//! filters out rows whose index name matches a key constraint.

use sqlx::MySqlConnection;
use tracing::debug;

use crate::dialect::{Dialect, MySqlDialect, ServerVersion};
use crate::error::Result;
use crate::model::{Table, View, ident_eq};

use super::{RawCheck, RawColumn, RawForeignKeyColumn, RawIndexColumn, RawKeyColumn, assemble_table};

/// Reads schema objects from a MySQL connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlReader;

impl MySqlReader {
    /// Creates a new reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Queries the server version.
    pub async fn server_version(&self, conn: &mut MySqlConnection) -> Result<ServerVersion> {
        let (version,): (String,) = sqlx::query_as(MySqlDialect::new().version_query())
            .fetch_one(&mut *conn)
            .await?;
        Ok(ServerVersion::parse(&version))
    }

    /// Returns whether a table exists in the current database.
    pub async fn table_exists(&self, conn: &mut MySqlConnection, name: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ? AND table_type = 'BASE TABLE'",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Lists table names, optionally filtered with a `LIKE` pattern.
    pub async fn list_table_names(
        &self,
        conn: &mut MySqlConnection,
        filter: Option<&str>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' \
               AND table_name LIKE ? \
             ORDER BY table_name",
        )
        .bind(filter.unwrap_or("%"))
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Reads one table, or `None` when it does not exist.
    pub async fn read_table(
        &self,
        conn: &mut MySqlConnection,
        name: &str,
    ) -> Result<Option<Table>> {
        if !self.table_exists(conn, name).await? {
            return Ok(None);
        }
        debug!(table = name, "introspecting table");

        let columns = self.column_rows(conn, name).await?;
        let keys = self.key_rows(conn, name).await?;
        let foreign_keys = self.foreign_key_rows(conn, name).await?;
        let server = self.server_version(conn).await?;
        let checks = if MySqlDialect::new().supports_check_constraints(server) {
            self.check_rows(conn, name).await?
        } else {
            Vec::new()
        };
        let indexes = self.index_rows(conn, name, &keys).await?;

        Ok(Some(assemble_table(
            None,
            name,
            MySqlDialect::new().type_map(),
            columns,
            keys,
            foreign_keys,
            checks,
            indexes,
        )))
    }

    async fn column_rows(
        &self,
        conn: &mut MySqlConnection,
        table: &str,
    ) -> Result<Vec<RawColumn>> {
        let rows: Vec<(String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT column_name, column_type, is_nullable, column_default, extra \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, type_name, nullable, default_expr, extra)| RawColumn {
                name,
                type_name,
                nullable: nullable.eq_ignore_ascii_case("YES"),
                default_expr,
                primary_key: false,
                auto_increment: extra.to_ascii_lowercase().contains("auto_increment"),
            })
            .collect())
    }

    async fn key_rows(
        &self,
        conn: &mut MySqlConnection,
        table: &str,
    ) -> Result<Vec<RawKeyColumn>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT tc.constraint_name, tc.constraint_type, kcu.column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_schema = tc.constraint_schema \
              AND kcu.constraint_name = tc.constraint_name \
              AND kcu.table_name = tc.table_name \
             WHERE tc.table_schema = DATABASE() AND tc.table_name = ? \
               AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(constraint, kind, column)| RawKeyColumn {
                constraint,
                primary: kind == "PRIMARY KEY",
                column,
                descending: false,
            })
            .collect())
    }

    async fn foreign_key_rows(
        &self,
        conn: &mut MySqlConnection,
        table: &str,
    ) -> Result<Vec<RawForeignKeyColumn>> {
        let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT kcu.constraint_name, kcu.column_name, \
                    kcu.referenced_table_name, kcu.referenced_column_name, \
                    rc.delete_rule, rc.update_rule \
             FROM information_schema.key_column_usage kcu \
             JOIN information_schema.referential_constraints rc \
               ON rc.constraint_schema = kcu.constraint_schema \
              AND rc.constraint_name = kcu.constraint_name \
             WHERE kcu.table_schema = DATABASE() AND kcu.table_name = ? \
               AND kcu.referenced_table_name IS NOT NULL \
             ORDER BY kcu.constraint_name, kcu.ordinal_position",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(constraint, column, referenced_table, referenced_column, on_delete, on_update)| {
                    RawForeignKeyColumn {
                        constraint,
                        column,
                        referenced_table,
                        referenced_column,
                        on_delete,
                        on_update,
                    }
                },
            )
            .collect())
    }

    async fn check_rows(&self, conn: &mut MySqlConnection, table: &str) -> Result<Vec<RawCheck>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT cc.constraint_name, cc.check_clause \
             FROM information_schema.check_constraints cc \
             JOIN information_schema.table_constraints tc \
               ON tc.constraint_schema = cc.constraint_schema \
              AND tc.constraint_name = cc.constraint_name \
             WHERE tc.table_schema = DATABASE() AND tc.table_name = ? \
               AND tc.constraint_type = 'CHECK' \
             ORDER BY cc.constraint_name",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, expression)| RawCheck {
                name,
                column: None,
                // MySQL stores the clause parenthesized and with backticks.
                expression: expression
                    .trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .replace('`', ""),
            })
            .collect())
    }

    async fn index_rows(
        &self,
        conn: &mut MySqlConnection,
        table: &str,
        keys: &[RawKeyColumn],
    ) -> Result<Vec<RawIndexColumn>> {
        let rows: Vec<(String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT index_name, column_name, non_unique, collation \
             FROM information_schema.statistics \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY index_name, seq_in_index",
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(index, _, _, _)| {
                // PRIMARY and unique-constraint indexes are already reported
                // as constraints.
                index != "PRIMARY" && !keys.iter().any(|k| ident_eq(&k.constraint, index))
            })
            .map(|(index, column, non_unique, collation)| RawIndexColumn {
                index,
                column,
                unique: non_unique == 0,
                descending: collation.as_deref() == Some("D"),
            })
            .collect())
    }

    /// Returns whether a view exists.
    pub async fn view_exists(&self, conn: &mut MySqlConnection, name: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM information_schema.views \
             WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Reads one view, or `None` when it does not exist.
    pub async fn read_view(
        &self,
        conn: &mut MySqlConnection,
        name: &str,
    ) -> Result<Option<View>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT view_definition FROM information_schema.views \
             WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(|(definition,)| View::new(name, definition)))
    }
}
