//! PostgreSQL catalog reader.
//!
//! Columns, keys, foreign keys and checks come from information-schema
//! views; indexes come from `pg_index`, which also tells us which indexes
//! merely back a constraint. Every projected column carries an explicit
//! `::text`/`::int` cast so rows decode uniformly regardless of the
//! underlying catalog domain types.

use sqlx::PgConnection;
use tracing::debug;

use crate::dialect::{Dialect, PostgresDialect, ServerVersion};
use crate::error::Result;
use crate::model::{Table, View};

use super::{RawCheck, RawColumn, RawForeignKeyColumn, RawIndexColumn, RawKeyColumn, assemble_table};

const DEFAULT_SCHEMA: &str = "public";

/// Reads schema objects from a PostgreSQL connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresReader;

impl PostgresReader {
    /// Creates a new reader.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn schema(schema: Option<&str>) -> &str {
        schema.unwrap_or(DEFAULT_SCHEMA)
    }

    /// Queries the server version.
    pub async fn server_version(&self, conn: &mut PgConnection) -> Result<ServerVersion> {
        let (version,): (String,) = sqlx::query_as(PostgresDialect::new().version_query())
            .fetch_one(&mut *conn)
            .await?;
        Ok(ServerVersion::parse(&version))
    }

    /// Returns whether a schema exists.
    pub async fn schema_exists(&self, conn: &mut PgConnection, name: &str) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM information_schema.schemata WHERE schema_name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Lists schema names, skipping the system schemas.
    pub async fn list_schema_names(&self, conn: &mut PgConnection) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT schema_name::text FROM information_schema.schemata \
             WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast') \
             ORDER BY schema_name",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Returns whether a table exists.
    pub async fn table_exists(
        &self,
        conn: &mut PgConnection,
        schema: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2 AND table_type = 'BASE TABLE'",
        )
        .bind(Self::schema(schema))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Lists table names, optionally filtered with a `LIKE` pattern.
    pub async fn list_table_names(
        &self,
        conn: &mut PgConnection,
        schema: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
               AND table_name LIKE $2 \
             ORDER BY table_name",
        )
        .bind(Self::schema(schema))
        .bind(filter.unwrap_or("%"))
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Reads one table, or `None` when it does not exist.
    pub async fn read_table(
        &self,
        conn: &mut PgConnection,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<Table>> {
        if !self.table_exists(conn, schema, name).await? {
            return Ok(None);
        }
        let schema_name = Self::schema(schema);
        debug!(schema = schema_name, table = name, "introspecting table");

        let columns = self.column_rows(conn, schema_name, name).await?;
        let keys = self.key_rows(conn, schema_name, name).await?;
        let foreign_keys = self.foreign_key_rows(conn, schema_name, name).await?;
        let checks = self.check_rows(conn, schema_name, name).await?;
        let indexes = self.index_rows(conn, schema_name, name).await?;

        Ok(Some(assemble_table(
            schema,
            name,
            PostgresDialect::new().type_map(),
            columns,
            keys,
            foreign_keys,
            checks,
            indexes,
        )))
    }

    async fn column_rows(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawColumn>> {
        let rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            "SELECT column_name::text, data_type::text, is_nullable::text, column_default::text \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, type_name, nullable, default_expr)| {
                // Serial columns surface as a nextval() default.
                let auto_increment = default_expr
                    .as_deref()
                    .is_some_and(|d| d.starts_with("nextval("));
                RawColumn {
                    name,
                    type_name,
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                    default_expr: default_expr.filter(|_| !auto_increment),
                    primary_key: false,
                    auto_increment,
                }
            })
            .collect())
    }

    async fn key_rows(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawKeyColumn>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT tc.constraint_name::text, tc.constraint_type::text, kcu.column_name::text \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_schema = tc.constraint_schema \
              AND kcu.constraint_name = tc.constraint_name \
             WHERE tc.table_schema = $1 AND tc.table_name = $2 \
               AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE') \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
        )
        .bind(schema)
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
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawForeignKeyColumn>> {
        let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT tc.constraint_name::text, kcu.column_name::text, \
                    ccu.table_name::text, ccu.column_name::text, \
                    rc.delete_rule::text, rc.update_rule::text \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_schema = tc.constraint_schema \
              AND kcu.constraint_name = tc.constraint_name \
             JOIN information_schema.referential_constraints rc \
               ON rc.constraint_schema = tc.constraint_schema \
              AND rc.constraint_name = tc.constraint_name \
             JOIN information_schema.constraint_column_usage ccu \
               ON ccu.constraint_schema = rc.unique_constraint_schema \
              AND ccu.constraint_name = rc.unique_constraint_name \
             WHERE tc.table_schema = $1 AND tc.table_name = $2 \
               AND tc.constraint_type = 'FOREIGN KEY' \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
        )
        .bind(schema)
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

    async fn check_rows(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawCheck>> {
        // NOT NULL surfaces as a synthesized IS NOT NULL check; those are
        // already captured as column nullability.
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT cc.constraint_name::text, cc.check_clause::text \
             FROM information_schema.check_constraints cc \
             JOIN information_schema.table_constraints tc \
               ON tc.constraint_schema = cc.constraint_schema \
              AND tc.constraint_name = cc.constraint_name \
             WHERE tc.table_schema = $1 AND tc.table_name = $2 \
               AND tc.constraint_type = 'CHECK' \
               AND cc.check_clause NOT ILIKE '%IS NOT NULL%' \
             ORDER BY cc.constraint_name",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, expression)| RawCheck {
                name,
                column: None,
                expression: strip_outer_parens(&expression),
            })
            .collect())
    }

    async fn index_rows(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        table: &str,
    ) -> Result<Vec<RawIndexColumn>> {
        // pg_constraint's conindid marks indexes that back a constraint.
        let rows: Vec<(String, String, bool, bool)> = sqlx::query_as(
            "SELECT ic.relname::text, a.attname::text, ix.indisunique, \
                    (ix.indoption[k.ord - 1] & 1) = 1 AS descending \
             FROM pg_class t \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             JOIN pg_index ix ON ix.indrelid = t.oid \
             JOIN pg_class ic ON ic.oid = ix.indexrelid \
             CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
             WHERE n.nspname = $1 AND t.relname = $2 \
               AND NOT ix.indisprimary \
               AND ix.indexrelid NOT IN (SELECT conindid FROM pg_constraint WHERE conindid <> 0) \
             ORDER BY ic.relname, k.ord",
        )
        .bind(schema)
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(index, column, unique, descending)| RawIndexColumn {
                index,
                column,
                unique,
                descending,
            })
            .collect())
    }

    /// Returns whether a view exists.
    pub async fn view_exists(
        &self,
        conn: &mut PgConnection,
        schema: Option<&str>,
        name: &str,
    ) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM information_schema.views \
             WHERE table_schema = $1 AND table_name = $2",
        )
        .bind(Self::schema(schema))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Reads one view, or `None` when it does not exist.
    pub async fn read_view(
        &self,
        conn: &mut PgConnection,
        schema: Option<&str>,
        name: &str,
    ) -> Result<Option<View>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT view_definition::text FROM information_schema.views \
             WHERE table_schema = $1 AND table_name = $2",
        )
        .bind(Self::schema(schema))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(|(definition,)| {
            let mut view = View::new(name, definition);
            view.schema = schema.map(str::to_string);
            view
        }))
    }
}

/// Strips one level of surrounding parentheses; catalogs store check
/// clauses as `(expr)`.
fn strip_outer_parens(expression: &str) -> String {
    let trimmed = expression.trim();
    if let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        // Only strip when the parens actually pair with each other.
        let mut depth = 0_i32;
        for (i, c) in inner.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth < 0 && i < inner.len() - 1 {
                return trimmed.to_string();
            }
        }
        if depth == 0 {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}
