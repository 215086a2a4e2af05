//! Catalog introspection: reconstructs schema model entities from each
//! dialect's metadata surface.
//!
//! Each dialect reader issues a small fixed set of catalog queries and maps
//! the rows into the neutral raw-row types below; the correlation engine
//! then assembles nested [`Table`] values, matching by table/column name
//! case-insensitively. Indexes that merely back a constraint are excluded
//! so constraints are not reported twice.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlReader;
pub use postgres::PostgresReader;
pub use sqlite::SqliteReader;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{
    CheckConstraint, Column, ColumnReference, ForeignKeyConstraint, Index, OrderedColumn,
    PrimaryKeyConstraint, ReferentialAction, SortOrder, Table, UniqueConstraint, ident_eq,
};
use crate::types::TypeMap;

/// One catalog column row, before correlation.
#[derive(Debug, Clone)]
pub struct RawColumn {
    /// Column name.
    pub name: String,
    /// Physical type text as the catalog reports it.
    pub type_name: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default expression text, when present.
    pub default_expr: Option<String>,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
}

/// One primary-key/unique key column row, grouped by constraint name.
#[derive(Debug, Clone)]
pub struct RawKeyColumn {
    /// Constraint name.
    pub constraint: String,
    /// Whether the constraint is the primary key (else unique).
    pub primary: bool,
    /// Key column name.
    pub column: String,
    /// Whether the key column is descending.
    pub descending: bool,
}

/// One foreign key column row, grouped by constraint name.
#[derive(Debug, Clone)]
pub struct RawForeignKeyColumn {
    /// Constraint name.
    pub constraint: String,
    /// Referencing column name.
    pub column: String,
    /// Referenced table name.
    pub referenced_table: String,
    /// Referenced column name.
    pub referenced_column: String,
    /// Catalog text of the on-delete rule.
    pub on_delete: String,
    /// Catalog text of the on-update rule.
    pub on_update: String,
}

/// One check constraint row.
#[derive(Debug, Clone)]
pub struct RawCheck {
    /// Constraint name.
    pub name: String,
    /// Associated column when the catalog records one.
    pub column: Option<String>,
    /// Check expression text.
    pub expression: String,
}

/// One index column row, grouped by index name. Rows for constraint-backing
/// indexes must be filtered out by the reader.
#[derive(Debug, Clone)]
pub struct RawIndexColumn {
    /// Index name.
    pub index: String,
    /// Indexed column name.
    pub column: String,
    /// Whether the index is unique.
    pub unique: bool,
    /// Whether the column is indexed descending.
    pub descending: bool,
}

/// Assembles a [`Table`] from raw catalog rows.
///
/// Single-column constraints carrying their deterministic default name are
/// canonicalized onto column flags, mirroring the structural parser, so an
/// introspected table re-synthesizes to the same DDL.
pub fn assemble_table(
    schema: Option<&str>,
    name: &str,
    types: &TypeMap,
    columns: Vec<RawColumn>,
    keys: Vec<RawKeyColumn>,
    foreign_keys: Vec<RawForeignKeyColumn>,
    checks: Vec<RawCheck>,
    indexes: Vec<RawIndexColumn>,
) -> Table {
    let mut table = Table::new(name);
    table.schema = schema.map(str::to_string);

    for raw in columns {
        let desc = types.to_logical(&raw.type_name);
        let mut column = Column::new(name, &raw.name, desc.logical);
        column.schema = table.schema.clone();
        column.type_desc = desc;
        column.nullable = raw.nullable && !raw.primary_key;
        column.primary_key = raw.primary_key;
        column.auto_increment = raw.auto_increment;
        column.default_expr = raw.default_expr;
        table.columns.push(column);
    }

    for (constraint, group) in group_rows(keys, |k| k.constraint.clone()) {
        let ordered: Vec<OrderedColumn> = group
            .iter()
            .map(|k| OrderedColumn {
                name: k.column.clone(),
                order: if k.descending {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
            })
            .collect();
        if group[0].primary {
            for key in &ordered {
                if let Some(column) = table.get_column_mut(&key.name) {
                    column.primary_key = true;
                    column.nullable = false;
                }
            }
            let default = PrimaryKeyConstraint::default_name(name);
            if ordered.len() > 1 || !ident_eq(&constraint, &default) {
                let mut pk = PrimaryKeyConstraint::new(name, ordered);
                pk.name = constraint;
                table.primary_key = Some(pk);
            }
        } else {
            let default = UniqueConstraint::default_name(name, &ordered);
            if ordered.len() == 1 && ident_eq(&constraint, &default) {
                if let Some(column) = table.get_column_mut(&ordered[0].name) {
                    column.unique = true;
                    continue;
                }
            }
            let mut unique = UniqueConstraint::new(name, ordered);
            unique.name = constraint;
            table.uniques.push(unique);
        }
    }

    for (constraint, group) in group_rows(foreign_keys, |k| k.constraint.clone()) {
        let columns: Vec<OrderedColumn> = group
            .iter()
            .map(|k| OrderedColumn::new(k.column.clone()))
            .collect();
        let referenced: Vec<OrderedColumn> = group
            .iter()
            .map(|k| OrderedColumn::new(k.referenced_column.clone()))
            .collect();
        let on_delete = ReferentialAction::parse(&group[0].on_delete);
        let on_update = ReferentialAction::parse(&group[0].on_update);
        let referenced_table = group[0].referenced_table.clone();

        let default = ForeignKeyConstraint::default_name(name, &columns, &referenced_table);
        if columns.len() == 1 && ident_eq(&constraint, &default) {
            if let Some(column) = table.get_column_mut(&columns[0].name) {
                column.references = Some(
                    ColumnReference::new(&referenced_table, &referenced[0].name)
                        .on_delete(on_delete)
                        .on_update(on_update),
                );
                continue;
            }
        }
        let mut fk = ForeignKeyConstraint::new(name, columns, referenced_table, referenced)
            .on_delete(on_delete)
            .on_update(on_update);
        fk.name = constraint;
        table.foreign_keys.push(fk);
    }

    let column_names: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    for raw in checks {
        let column = raw
            .column
            .or_else(|| associate_check_column(&raw.expression, &column_names));
        let mut check = CheckConstraint::new(name, column, raw.expression);
        check.name = raw.name;
        table.checks.push(check);
    }

    apply_index_rows(&mut table, indexes);
    table
}

/// Folds index rows into a table, canonicalizing default-named single-column
/// non-unique indexes onto the column's indexed flag.
pub(crate) fn apply_index_rows(table: &mut Table, indexes: Vec<RawIndexColumn>) {
    let name = table.name.clone();
    for (index_name, group) in group_rows(indexes, |i| i.index.clone()) {
        let ordered: Vec<OrderedColumn> = group
            .iter()
            .map(|i| OrderedColumn {
                name: i.column.clone(),
                order: if i.descending {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
            })
            .collect();
        let unique = group[0].unique;
        let default = Index::default_name(&name, &ordered);
        if ordered.len() == 1 && !unique && ident_eq(&index_name, &default) {
            if let Some(column) = table.get_column_mut(&ordered[0].name) {
                column.indexed = true;
                continue;
            }
        }
        let mut index = Index::new(&name, ordered);
        index.name = index_name;
        index.unique = unique;
        table.indexes.push(index);
    }
}

/// Groups rows by key, preserving first-seen order.
fn group_rows<T, F>(rows: Vec<T>, key: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> String,
{
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for row in rows {
        let k = key(&row);
        match groups.iter_mut().find(|(name, _)| ident_eq(name, &k)) {
            Some((_, group)) => group.push(row),
            None => groups.push((k, vec![row])),
        }
    }
    groups
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Associates a check constraint with a column by scanning the expression
/// for whole-word column name matches; the association is made only when
/// exactly one column matches.
///
/// This is best-effort: an expression that coincidentally contains exactly
/// one column name (in a string literal, say) will be mis-associated.
pub fn associate_check_column(expression: &str, columns: &[String]) -> Option<String> {
    let normalized = WHITESPACE.replace_all(expression, " ");
    let mut matched: Option<&String> = None;
    for column in columns {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(column));
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        if re.is_match(&normalized) {
            if matched.is_some() {
                return None;
            }
            matched = Some(column);
        }
    }
    matched.cloned()
}
