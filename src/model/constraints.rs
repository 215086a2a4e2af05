//! Table constraint entities and their shared pieces.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

use super::ident_eq;

/// Sort direction for a key or index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// Ascending (the default everywhere).
    #[default]
    Ascending,
    /// Descending.
    Descending,
}

impl SortOrder {
    /// Returns the SQL keyword for this direction.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// A column name plus sort direction, as used in keys and indexes.
///
/// Direction is honored only when the dialect reports ordered-key support;
/// otherwise synthesis silently normalizes it to ascending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderedColumn {
    /// Column name.
    pub name: String,
    /// Sort direction.
    pub order: SortOrder,
}

impl OrderedColumn {
    /// Creates an ascending ordered column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Ascending,
        }
    }

    /// Creates a descending ordered column.
    #[must_use]
    pub fn descending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Behavior on delete/update of a referenced parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReferentialAction {
    /// Error if referencing rows exist.
    #[default]
    NoAction,
    /// Cascade the change to referencing rows.
    Cascade,
    /// Null out the referencing columns.
    SetNull,
}

impl ReferentialAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
        }
    }

    /// Parses a catalog or DDL action keyword; unknown text reads as
    /// `NO ACTION` (catalogs spell `RESTRICT` and absence that way too).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let upper = text.trim().to_ascii_uppercase();
        match upper.as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            _ => Self::NoAction,
        }
    }
}

/// A primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyConstraint {
    /// Owning table.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Key columns, in key order.
    pub columns: Vec<OrderedColumn>,
}

impl PrimaryKeyConstraint {
    /// Creates a primary key constraint with the deterministic default name.
    #[must_use]
    pub fn new(table: impl Into<String>, columns: Vec<OrderedColumn>) -> Self {
        let table = table.into();
        let name = Self::default_name(&table);
        Self {
            table,
            name,
            columns,
        }
    }

    /// Deterministic name used when none is supplied: `pk_<table>`.
    #[must_use]
    pub fn default_name(table: &str) -> String {
        format!("pk_{table}")
    }
}

/// A unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Owning table.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Constrained columns, in key order.
    pub columns: Vec<OrderedColumn>,
}

impl UniqueConstraint {
    /// Creates a unique constraint with the deterministic default name.
    #[must_use]
    pub fn new(table: impl Into<String>, columns: Vec<OrderedColumn>) -> Self {
        let table = table.into();
        let name = Self::default_name(&table, &columns);
        Self {
            table,
            name,
            columns,
        }
    }

    /// Deterministic name used when none is supplied: `uq_<table>_<cols>`.
    #[must_use]
    pub fn default_name(table: &str, columns: &[OrderedColumn]) -> String {
        format!("uq_{table}_{}", joined_names(columns))
    }
}

/// A check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Owning table.
    pub table: String,
    /// Column the check is associated with, when known.
    ///
    /// Introspection can only associate this heuristically; `None` means the
    /// constraint is table-level or the association was ambiguous.
    pub column: Option<String>,
    /// Constraint name.
    pub name: String,
    /// The check expression text, without the surrounding `CHECK (...)`.
    pub expression: String,
}

impl CheckConstraint {
    /// Creates a check constraint with the deterministic default name.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        column: Option<String>,
        expression: impl Into<String>,
    ) -> Self {
        let table = table.into();
        let name = Self::default_name(&table, column.as_deref());
        Self {
            table,
            column,
            name,
            expression: expression.into(),
        }
    }

    /// Deterministic name used when none is supplied: `ck_<table>[_<column>]`.
    #[must_use]
    pub fn default_name(table: &str, column: Option<&str>) -> String {
        match column {
            Some(column) => format!("ck_{table}_{column}"),
            None => format!("ck_{table}"),
        }
    }
}

/// A default constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultConstraint {
    /// Owning table.
    pub table: String,
    /// Column the default applies to.
    pub column: String,
    /// Constraint name.
    pub name: String,
    /// The default expression text.
    pub expression: String,
}

impl DefaultConstraint {
    /// Creates a default constraint with the deterministic default name.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        let table = table.into();
        let column = column.into();
        let name = Self::default_name(&table, &column);
        Self {
            table,
            column,
            name,
            expression: expression.into(),
        }
    }

    /// Deterministic name used when none is supplied: `df_<table>_<column>`.
    #[must_use]
    pub fn default_name(table: &str, column: &str) -> String {
        format!("df_{table}_{column}")
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    /// Owning (referencing) table.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// Referencing columns, in key order.
    pub columns: Vec<OrderedColumn>,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns, positionally matching `columns`.
    pub referenced_columns: Vec<OrderedColumn>,
    /// Action on parent delete.
    pub on_delete: ReferentialAction,
    /// Action on parent update.
    pub on_update: ReferentialAction,
}

impl ForeignKeyConstraint {
    /// Creates a foreign key constraint with the deterministic default name.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        columns: Vec<OrderedColumn>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<OrderedColumn>,
    ) -> Self {
        let table = table.into();
        let referenced_table = referenced_table.into();
        let name = Self::default_name(&table, &columns, &referenced_table);
        Self {
            table,
            name,
            columns,
            referenced_table,
            referenced_columns,
            on_delete: ReferentialAction::NoAction,
            on_update: ReferentialAction::NoAction,
        }
    }

    /// Sets the on-delete action.
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the on-update action.
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Deterministic name used when none is supplied:
    /// `fk_<table>_<cols>_<referenced table>`.
    #[must_use]
    pub fn default_name(table: &str, columns: &[OrderedColumn], referenced_table: &str) -> String {
        format!("fk_{table}_{}_{referenced_table}", joined_names(columns))
    }

    /// Checks the positional 1:1 pairing of source and referenced columns.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(SchemaError::empty_identifier("foreign key columns"));
        }
        if self.columns.len() != self.referenced_columns.len() {
            return Err(SchemaError::InvalidModel(format!(
                "foreign key '{}' has {} source columns but {} referenced columns",
                self.name,
                self.columns.len(),
                self.referenced_columns.len()
            )));
        }
        Ok(())
    }

    /// Returns whether this constraint references the given column.
    #[must_use]
    pub fn references_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| ident_eq(&c.name, column))
    }
}

fn joined_names(columns: &[OrderedColumn]) -> String {
    columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("_")
}
