//! Extraction stage: walks the clause tree of a `CREATE TABLE` statement
//! and rebuilds a [`Table`].
//!
//! Columns are fully populated before table constraints are processed,
//! matching the engine's own rule that column definitions precede table
//! constraints. Single-column constraints carrying their deterministic
//! default name are canonicalized onto the column's flags instead of being
//! stored as table-level entries, so re-synthesizing the parsed model emits
//! the same DDL.

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::model::{
    CheckConstraint, Column, ColumnReference, DefaultConstraint, ForeignKeyConstraint,
    OrderedColumn, PrimaryKeyConstraint, ReferentialAction, SortOrder, Table, UniqueConstraint,
};
use crate::types::{LogicalType, TypeMap};

use super::clause::{Clause, Node};

/// Keywords that end a column's type-name run.
const COLUMN_KEYWORDS: &[&str] = &[
    "NOT NULL",
    "NULL",
    "PRIMARY KEY",
    "AUTOINCREMENT",
    "UNIQUE",
    "CHECK",
    "DEFAULT",
    "REFERENCES",
    "CONSTRAINT",
    "COLLATE",
    "GENERATED",
    "ASC",
    "DESC",
];

/// Keywords that open a table-constraint clause.
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY KEY",
    "FOREIGN KEY",
    "UNIQUE",
    "CHECK",
    "DEFAULT",
];

/// Rebuilds a [`Table`] from the clause tree of one `CREATE TABLE`
/// statement. `sql` is carried only for error reporting.
pub fn extract_table(clauses: &[Clause], types: &TypeMap, sql: &str) -> Result<Table> {
    let statement = clauses
        .first()
        .filter(|_| clauses.len() == 1)
        .ok_or_else(|| SchemaError::parse(sql, "expected exactly one statement"))?;

    let mut cursor = 0;
    expect_keyword(statement, &mut cursor, "CREATE", sql)?;
    // TEMP/TEMPORARY tables parse the same.
    if statement
        .word_at(cursor)
        .is_some_and(|t| t.is_any_keyword(&["TEMP", "TEMPORARY"]))
    {
        cursor += 1;
    }
    expect_keyword(statement, &mut cursor, "TABLE", sql)?;
    if statement.word_at(cursor).is_some_and(|t| t.is_keyword("IF")) {
        // IF NOT EXISTS (NOT does not glue with EXISTS).
        cursor += 3;
    }
    let name = statement
        .word_at(cursor)
        .ok_or_else(|| SchemaError::parse(sql, "missing table name"))?
        .text
        .clone();
    cursor += 1;

    let body = statement
        .group_at(cursor)
        .ok_or_else(|| SchemaError::parse(sql, "missing column list"))?;

    let mut table = Table::new(&name);
    for clause in body {
        if !is_constraint_clause(clause) {
            extract_column(&mut table, clause, types, sql)?;
        }
    }
    for clause in body {
        if is_constraint_clause(clause) {
            extract_table_constraint(&mut table, clause, sql)?;
        }
    }
    Ok(table)
}

fn expect_keyword(clause: &Clause, cursor: &mut usize, keyword: &str, sql: &str) -> Result<()> {
    if clause.word_at(*cursor).is_some_and(|t| t.is_keyword(keyword)) {
        *cursor += 1;
        Ok(())
    } else {
        Err(SchemaError::parse(sql, format!("expected {keyword}")))
    }
}

fn is_constraint_clause(clause: &Clause) -> bool {
    clause
        .leading_word()
        .is_some_and(|t| t.is_any_keyword(CONSTRAINT_KEYWORDS))
}

/// Renders the inside of a parenthesized expression group.
fn expression_text(clauses: &[Clause]) -> String {
    clauses
        .iter()
        .map(Clause::render)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reads a parenthesized key list into ordered columns.
fn key_list(clauses: &[Clause], sql: &str) -> Result<Vec<OrderedColumn>> {
    let mut columns = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let name = clause
            .leading_word()
            .ok_or_else(|| SchemaError::parse(sql, "expected column name in key list"))?
            .text
            .clone();
        let order = match clause.word_at(1) {
            Some(t) if t.is_keyword("DESC") => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };
        columns.push(OrderedColumn { name, order });
    }
    Ok(columns)
}

/// Parses one column definition clause, pushing the column onto the table.
///
/// An inline `CONSTRAINT <name>` is captured and attached to the next
/// recognized constraint keyword. Constraints carrying their deterministic
/// default name (or none) fold onto the column's flags; custom-named ones
/// become table-level entries so the name survives re-synthesis.
fn extract_column(table: &mut Table, clause: &Clause, types: &TypeMap, sql: &str) -> Result<()> {
    let table_name = table.name.clone();
    let name = clause
        .leading_word()
        .ok_or_else(|| SchemaError::parse(sql, "expected column name"))?
        .text
        .clone();

    // The type name runs until the first recognized keyword; an immediately
    // following group carries its parameters.
    let mut cursor = 1;
    let mut type_text = String::new();
    while let Some(token) = clause.word_at(cursor) {
        if token.quoted || token.is_any_keyword(COLUMN_KEYWORDS) {
            break;
        }
        if !type_text.is_empty() {
            type_text.push(' ');
        }
        type_text.push_str(&token.text);
        cursor += 1;
    }
    if let Some(params) = clause.group_at(cursor) {
        type_text.push('(');
        type_text.push_str(&expression_text(params));
        type_text.push(')');
        cursor += 1;
    }

    let mut column = Column::new(&table_name, &name, LogicalType::Object);
    if !type_text.is_empty() {
        column.type_desc = types.to_logical(&type_text);
    }

    let key = || vec![OrderedColumn::new(&name)];
    let mut pending_name: Option<String> = None;
    let mut named_pk: Option<String> = None;
    let mut named_unique: Option<String> = None;
    let mut named_check: Option<(String, String)> = None;
    let mut named_default: Option<(String, String)> = None;
    let mut named_fk: Option<(String, ColumnReference)> = None;

    while cursor < clause.nodes.len() {
        let Some(token) = clause.word_at(cursor) else {
            cursor += 1;
            continue;
        };
        if token.is_keyword("CONSTRAINT") {
            pending_name = clause.word_at(cursor + 1).map(|t| t.text.clone());
            cursor += 2;
        } else if token.is_keyword("NOT NULL") {
            // NOT NULL names have no model counterpart.
            pending_name = None;
            column.nullable = false;
            cursor += 1;
        } else if token.is_keyword("NULL") {
            pending_name = None;
            cursor += 1;
        } else if token.is_keyword("PRIMARY KEY") {
            column.primary_key = true;
            column.nullable = false;
            if let Some(given) = pending_name.take() {
                if given != PrimaryKeyConstraint::default_name(&table_name) {
                    named_pk = Some(given);
                }
            }
            cursor += 1;
            if clause
                .word_at(cursor)
                .is_some_and(|t| t.is_any_keyword(&["ASC", "DESC"]))
            {
                cursor += 1;
            }
        } else if token.is_keyword("AUTOINCREMENT") {
            column.auto_increment = true;
            column.nullable = false;
            cursor += 1;
        } else if token.is_keyword("UNIQUE") {
            match pending_name.take() {
                Some(given) if given != UniqueConstraint::default_name(&table_name, &key()) => {
                    named_unique = Some(given);
                }
                _ => column.unique = true,
            }
            cursor += 1;
        } else if token.is_keyword("CHECK") {
            let group = clause
                .group_at(cursor + 1)
                .ok_or_else(|| SchemaError::parse(sql, "CHECK without expression"))?;
            let expr = expression_text(group);
            match pending_name.take() {
                Some(given)
                    if given != CheckConstraint::default_name(&table_name, Some(name.as_str())) =>
                {
                    named_check = Some((given, expr));
                }
                _ => column.check_expr = Some(expr),
            }
            cursor += 2;
        } else if token.is_keyword("DEFAULT") {
            let expr = clause
                .nodes
                .get(cursor + 1)
                .map(Node::render)
                .ok_or_else(|| SchemaError::parse(sql, "DEFAULT without expression"))?;
            match pending_name.take() {
                Some(given) if given != DefaultConstraint::default_name(&table_name, &name) => {
                    named_default = Some((given, expr));
                }
                _ => column.default_expr = Some(expr),
            }
            cursor += 2;
        } else if token.is_keyword("REFERENCES") {
            let (reference, consumed) = extract_reference(clause, cursor + 1, &name, sql)?;
            let default_name =
                ForeignKeyConstraint::default_name(&table_name, &key(), &reference.table);
            match pending_name.take() {
                Some(given) if given != default_name => named_fk = Some((given, reference)),
                _ => column.references = Some(reference),
            }
            cursor = consumed;
        } else if token.is_keyword("COLLATE") {
            cursor += 2;
        } else {
            cursor += 1;
        }
    }

    debug!(table = %table_name, column = %name, "parsed column definition");
    table.columns.push(column);

    if let Some(given) = named_pk {
        let mut pk = PrimaryKeyConstraint::new(&table_name, key());
        pk.name = given;
        table.primary_key = Some(pk);
    }
    if let Some(given) = named_unique {
        let mut unique = UniqueConstraint::new(&table_name, key());
        unique.name = given;
        table.uniques.push(unique);
    }
    if let Some((given, expr)) = named_check {
        let mut check = CheckConstraint::new(&table_name, Some(name.clone()), expr);
        check.name = given;
        table.checks.push(check);
    }
    if let Some((given, expr)) = named_default {
        let mut default = DefaultConstraint::new(&table_name, &name, expr);
        default.name = given;
        table.defaults.push(default);
    }
    if let Some((given, reference)) = named_fk {
        let mut fk = ForeignKeyConstraint::new(
            &table_name,
            key(),
            &reference.table,
            vec![OrderedColumn::new(&reference.column)],
        )
        .on_delete(reference.on_delete)
        .on_update(reference.on_update);
        fk.name = given;
        table.foreign_keys.push(fk);
    }
    Ok(())
}

/// Reads `REFERENCES <table> [(<col>)] [ON DELETE ...] [ON UPDATE ...]`
/// starting at the token after `REFERENCES`; returns the reference and the
/// cursor past what was consumed.
fn extract_reference(
    clause: &Clause,
    mut cursor: usize,
    column: &str,
    sql: &str,
) -> Result<(ColumnReference, usize)> {
    let referenced_table = clause
        .word_at(cursor)
        .ok_or_else(|| SchemaError::parse(sql, "REFERENCES without table name"))?
        .text
        .clone();
    cursor += 1;

    // The referenced column defaults to the source column's own name when
    // the DDL leaves it implicit.
    let referenced_column = match clause.group_at(cursor) {
        Some(group) => {
            cursor += 1;
            group
                .first()
                .and_then(Clause::leading_word)
                .map(|t| t.text.clone())
                .ok_or_else(|| SchemaError::parse(sql, "empty REFERENCES column list"))?
        }
        None => column.to_string(),
    };

    let mut reference = ColumnReference::new(referenced_table, referenced_column);
    while let Some(token) = clause.word_at(cursor) {
        if token.is_keyword("ON DELETE") {
            if let Some(action) = clause.word_at(cursor + 1) {
                reference.on_delete = ReferentialAction::parse(&action.text);
            }
            cursor += 2;
        } else if token.is_keyword("ON UPDATE") {
            if let Some(action) = clause.word_at(cursor + 1) {
                reference.on_update = ReferentialAction::parse(&action.text);
            }
            cursor += 2;
        } else {
            break;
        }
    }
    Ok((reference, cursor))
}

fn extract_table_constraint(table: &mut Table, clause: &Clause, sql: &str) -> Result<()> {
    let mut cursor = 0;
    let mut explicit_name: Option<String> = None;
    if clause.word_at(0).is_some_and(|t| t.is_keyword("CONSTRAINT")) {
        explicit_name = clause.word_at(1).map(|t| t.text.clone());
        cursor = 2;
    }

    let keyword = clause
        .word_at(cursor)
        .cloned()
        .ok_or_else(|| SchemaError::parse(sql, "expected constraint keyword"))?;

    if keyword.is_keyword("PRIMARY KEY") {
        let columns = key_list(
            clause
                .group_at(cursor + 1)
                .ok_or_else(|| SchemaError::parse(sql, "PRIMARY KEY without column list"))?,
            sql,
        )?;
        for key in &columns {
            if let Some(column) = table.get_column_mut(&key.name) {
                column.primary_key = true;
                column.nullable = false;
            }
        }
        let default_name = PrimaryKeyConstraint::default_name(&table.name);
        if columns.len() > 1 || explicit_name.as_deref().is_some_and(|n| n != default_name) {
            let mut pk = PrimaryKeyConstraint::new(&table.name, columns);
            if let Some(name) = explicit_name {
                pk.name = name;
            }
            table.primary_key = Some(pk);
        }
    } else if keyword.is_keyword("UNIQUE") {
        let columns = key_list(
            clause
                .group_at(cursor + 1)
                .ok_or_else(|| SchemaError::parse(sql, "UNIQUE without column list"))?,
            sql,
        )?;
        let default_name = UniqueConstraint::default_name(&table.name, &columns);
        let canonical = columns.len() == 1
            && explicit_name.as_deref().is_none_or(|n| n == default_name);
        if canonical {
            if let Some(column) = table.get_column_mut(&columns[0].name) {
                column.unique = true;
                return Ok(());
            }
        }
        let mut unique = UniqueConstraint::new(&table.name, columns);
        if let Some(name) = explicit_name {
            unique.name = name;
        }
        table.uniques.push(unique);
    } else if keyword.is_keyword("CHECK") {
        let group = clause
            .group_at(cursor + 1)
            .ok_or_else(|| SchemaError::parse(sql, "CHECK without expression"))?;
        let mut check = CheckConstraint::new(&table.name, None, expression_text(group));
        if let Some(name) = explicit_name {
            check.name = name;
        }
        table.checks.push(check);
    } else if keyword.is_keyword("FOREIGN KEY") {
        extract_table_foreign_key(table, clause, cursor, explicit_name, sql)?;
    } else if keyword.is_keyword("DEFAULT") {
        // `DEFAULT <expr> FOR <column>` style table defaults.
        let expr = clause
            .nodes
            .get(cursor + 1)
            .map(Node::render)
            .ok_or_else(|| SchemaError::parse(sql, "DEFAULT without expression"))?;
        let column = clause
            .word_at(cursor + 2)
            .filter(|t| t.is_keyword("FOR"))
            .and_then(|_| clause.word_at(cursor + 3))
            .map(|t| t.text.clone())
            .ok_or_else(|| SchemaError::parse(sql, "table-level DEFAULT without FOR <column>"))?;
        if let Some(col) = table.get_column_mut(&column) {
            col.default_expr = Some(expr.clone());
        }
        let mut default = DefaultConstraint::new(&table.name, column, expr);
        if let Some(name) = explicit_name {
            default.name = name;
        }
        table.defaults.push(default);
    } else {
        return Err(SchemaError::parse(
            sql,
            format!("unrecognized table constraint '{}'", keyword.text),
        ));
    }
    Ok(())
}

fn extract_table_foreign_key(
    table: &mut Table,
    clause: &Clause,
    cursor: usize,
    explicit_name: Option<String>,
    sql: &str,
) -> Result<()> {
    let columns = key_list(
        clause
            .group_at(cursor + 1)
            .ok_or_else(|| SchemaError::parse(sql, "FOREIGN KEY without column list"))?,
        sql,
    )?;
    if !clause
        .word_at(cursor + 2)
        .is_some_and(|t| t.is_keyword("REFERENCES"))
    {
        return Err(SchemaError::parse(sql, "FOREIGN KEY without REFERENCES"));
    }
    let referenced_table = clause
        .word_at(cursor + 3)
        .ok_or_else(|| SchemaError::parse(sql, "REFERENCES without table name"))?
        .text
        .clone();
    let referenced_columns = key_list(
        clause
            .group_at(cursor + 4)
            .ok_or_else(|| SchemaError::parse(sql, "REFERENCES without column list"))?,
        sql,
    )?;

    let mut on_delete = ReferentialAction::NoAction;
    let mut on_update = ReferentialAction::NoAction;
    let mut rest = cursor + 5;
    while let Some(token) = clause.word_at(rest) {
        if token.is_keyword("ON DELETE") {
            if let Some(action) = clause.word_at(rest + 1) {
                on_delete = ReferentialAction::parse(&action.text);
            }
            rest += 2;
        } else if token.is_keyword("ON UPDATE") {
            if let Some(action) = clause.word_at(rest + 1) {
                on_update = ReferentialAction::parse(&action.text);
            }
            rest += 2;
        } else {
            rest += 1;
        }
    }

    let default_name =
        ForeignKeyConstraint::default_name(&table.name, &columns, &referenced_table);
    let canonical = columns.len() == 1
        && referenced_columns.len() == 1
        && explicit_name.as_deref().is_none_or(|n| n == default_name);
    if canonical {
        if let Some(column) = table.get_column_mut(&columns[0].name) {
            column.references = Some(
                ColumnReference::new(&referenced_table, &referenced_columns[0].name)
                    .on_delete(on_delete)
                    .on_update(on_update),
            );
            return Ok(());
        }
    }

    let mut fk = ForeignKeyConstraint::new(&table.name, columns, referenced_table, referenced_columns)
        .on_delete(on_delete)
        .on_update(on_update);
    if let Some(name) = explicit_name {
        fk.name = name;
    }
    fk.validate()?;
    table.foreign_keys.push(fk);
    Ok(())
}
