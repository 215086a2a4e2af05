//! Recreate-table executor for SQLite.
//!
//! SQLite's `ALTER TABLE` cannot express most structural changes, so those
//! are applied by rebuilding the table: synthesize a replacement table with
//! the change folded in, copy the rows across, swap the tables, and restore
//! the indexes. Referential integrity enforcement is suspended for the
//! duration; the `foreign_keys` pragma is a no-op inside a transaction, so
//! it is toggled before and after the transactional part.

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::dialect::{Dialect, SqliteDialect};
use crate::error::{Result, SchemaError};
use crate::introspect::SqliteReader;
use crate::model::{Table, ident_eq};

/// Rebuilds `desired.name` so its structure matches `desired`, preserving
/// all rows in columns common to the old and new structure.
///
/// When `external_transaction` is `true` the caller owns the transaction
/// boundary and the executor never commits or rolls back; otherwise it
/// opens its own transaction, commits on success and rolls back on any
/// failure. Either way referential integrity is re-enabled before an error
/// propagates.
pub async fn recreate_table(
    conn: &mut SqliteConnection,
    desired: &Table,
    external_transaction: bool,
) -> Result<()> {
    desired.validate()?;
    info!(table = %desired.name, "recreating table");

    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await?;

    let owns_transaction = !external_transaction;
    let result = rebuild(conn, desired, owns_transaction).await;

    if result.is_err() && owns_transaction {
        if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            warn!(error = %rollback, "rollback after failed table rebuild failed");
        }
    }
    if let Err(pragma) = sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await
    {
        warn!(error = %pragma, "re-enabling foreign key enforcement failed");
        result?;
        return Err(pragma.into());
    }
    result
}

async fn rebuild(
    conn: &mut SqliteConnection,
    desired: &Table,
    owns_transaction: bool,
) -> Result<()> {
    let dialect = SqliteDialect::new();
    let reader = SqliteReader::new();

    let old = reader
        .read_table(conn, &desired.name)
        .await?
        .ok_or_else(|| SchemaError::InvalidArgument {
            name: "table",
            message: format!("table '{}' does not exist", desired.name),
        })?;

    // Captured before any mutation so they can be replayed at the end.
    let captured_indexes = captured_index_statements(conn, &desired.name).await?;

    if owns_transaction {
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    }

    let temp_name = format!("{}__new", desired.name);
    let mut replacement = desired.clone();
    replacement.name = temp_name.clone();
    // Index statements target the final name; they run after the swap.
    let mut statements = dialect.create_table_statements(&replacement)?.into_iter();
    let create_sql = statements
        .next()
        .ok_or_else(|| SchemaError::InvalidModel("synthesis produced no statements".to_string()))?;
    let deferred_indexes: Vec<String> = statements.collect();

    debug!(sql = %create_sql, "creating replacement table");
    sqlx::query(&create_sql).execute(&mut *conn).await?;

    let copy_sql = copy_rows_sql(&dialect, &old, desired, &temp_name);
    debug!(sql = %copy_sql, "copying rows");
    sqlx::query(&copy_sql).execute(&mut *conn).await?;

    sqlx::query(&dialect.drop_table_sql(None, &desired.name))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&dialect.rename_table_sql(None, &temp_name, &desired.name))
        .execute(&mut *conn)
        .await?;

    // Pre-existing indexes come back first; indexes the desired structure
    // adds on top follow, skipping any name the replay already covered.
    // Captured indexes on columns the desired structure no longer has stay
    // dropped with the old table.
    let survivors: Vec<&CapturedIndex> = captured_indexes
        .iter()
        .filter(|index| covers_existing_columns(desired, &index.columns))
        .collect();
    let replayed: Vec<&str> = survivors.iter().map(|index| index.name.as_str()).collect();
    for index in &survivors {
        debug!(index = %index.name, "replaying captured index");
        sqlx::query(&index.sql).execute(&mut *conn).await?;
    }
    for sql in &deferred_indexes {
        if replayed.iter().any(|name| contains_ident(sql, name)) {
            continue;
        }
        debug!(sql = %sql, "creating index");
        sqlx::query(sql).execute(&mut *conn).await?;
    }

    if owns_transaction {
        sqlx::query("COMMIT").execute(&mut *conn).await?;
    }
    Ok(())
}

/// A pre-existing explicit index: its name, stored `CREATE INDEX` text, and
/// the column names it covers.
struct CapturedIndex {
    name: String,
    sql: String,
    columns: Vec<String>,
}

/// Captures the stored `CREATE INDEX` statements for a table, paired with
/// the columns each index covers. Auto-created constraint indexes carry no
/// SQL and are recreated by the replacement table's own constraints.
async fn captured_index_statements(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<Vec<CapturedIndex>> {
    let dialect = SqliteDialect::new();
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT name, sql FROM sqlite_master \
         WHERE type = 'index' AND tbl_name = ? AND sql IS NOT NULL",
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    let mut captured = Vec::with_capacity(rows.len());
    for (name, sql) in rows {
        let info: Vec<(i64, i64, Option<String>)> = sqlx::query_as(&format!(
            "PRAGMA index_info({})",
            dialect.quote_identifier(&name)
        ))
        .fetch_all(&mut *conn)
        .await?;
        // Expression entries carry no column name and cannot be checked.
        let columns = info.into_iter().filter_map(|(_, _, column)| column).collect();
        captured.push(CapturedIndex { name, sql, columns });
    }
    Ok(captured)
}

/// Whether every named column of a captured index still exists in the
/// desired table structure.
fn covers_existing_columns(desired: &Table, columns: &[String]) -> bool {
    columns.iter().all(|c| desired.get_column(c).is_some())
}

/// Builds the row-copy statement. When old and new column lists are
/// identical a plain `SELECT *` suffices; otherwise only the intersection
/// of columns is copied, by name.
fn copy_rows_sql(dialect: &SqliteDialect, old: &Table, desired: &Table, temp_name: &str) -> String {
    let identical = old.columns.len() == desired.columns.len()
        && old
            .columns
            .iter()
            .zip(&desired.columns)
            .all(|(a, b)| ident_eq(&a.name, &b.name));
    if identical {
        return format!(
            "INSERT INTO {} SELECT * FROM {}",
            dialect.quote_identifier(temp_name),
            dialect.quote_identifier(&old.name)
        );
    }

    let shared: Vec<String> = desired
        .columns
        .iter()
        .filter(|c| old.get_column(&c.name).is_some())
        .map(|c| dialect.quote_identifier(&c.name))
        .collect();
    let list = shared.join(", ");
    format!(
        "INSERT INTO {} ({list}) SELECT {list} FROM {}",
        dialect.quote_identifier(temp_name),
        dialect.quote_identifier(&old.name)
    )
}

/// Whether a statement mentions the given identifier, quoted or bare.
fn contains_ident(sql: &str, ident: &str) -> bool {
    let lower = sql.to_ascii_lowercase();
    lower.contains(&ident.to_ascii_lowercase())
}
