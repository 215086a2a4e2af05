//! Column entity.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::types::{LogicalType, SqlAffinity, TypeDescriptor};

use super::ReferentialAction;

/// Inline foreign key target carried on a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReference {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// Action on parent delete.
    pub on_delete: ReferentialAction,
    /// Action on parent update.
    pub on_update: ReferentialAction,
}

impl ColumnReference {
    /// Creates a reference with `NO ACTION` on both events.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
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
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Schema name of the owning table, when the dialect has schemas.
    pub schema: Option<String>,
    /// Owning table name.
    pub table: String,
    /// Column name.
    pub name: String,
    /// Logical type plus width hints.
    pub type_desc: TypeDescriptor,
    /// Dialect-specific physical type override; bypasses the type map.
    pub provider_type: Option<String>,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Whether the column carries a single-column unique constraint.
    pub unique: bool,
    /// Whether the column carries a single-column index.
    pub indexed: bool,
    /// Inline foreign key target, when the column is a foreign key.
    pub references: Option<ColumnReference>,
    /// Default expression text, when the column has a default.
    pub default_expr: Option<String>,
    /// Check expression text, when the column has a check.
    pub check_expr: Option<String>,
}

impl Column {
    /// Creates a nullable column with no flags set.
    #[must_use]
    pub fn new(table: impl Into<String>, name: impl Into<String>, logical: LogicalType) -> Self {
        Self {
            schema: None,
            table: table.into(),
            name: name.into(),
            type_desc: TypeDescriptor::new(logical),
            provider_type: None,
            nullable: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            indexed: false,
            references: None,
            default_expr: None,
            check_expr: None,
        }
    }

    /// Sets the schema name.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Replaces the type descriptor.
    #[must_use]
    pub fn type_desc(mut self, desc: TypeDescriptor) -> Self {
        self.type_desc = desc;
        self
    }

    /// Sets the maximum length hint.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.type_desc.length = Some(length);
        self
    }

    /// Sets precision and scale hints.
    #[must_use]
    pub fn precision_scale(mut self, precision: u8, scale: u8) -> Self {
        self.type_desc.precision = Some(precision);
        self.type_desc.scale = Some(scale);
        self
    }

    /// Sets a dialect-specific physical type override.
    #[must_use]
    pub fn provider_type(mut self, physical: impl Into<String>) -> Self {
        self.provider_type = Some(physical.into());
        self
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as (part of) the primary key. Primary key columns
    /// are never nullable.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the column auto-increment (implies NOT NULL).
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }

    /// Marks the column unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Marks the column indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Marks the column as a foreign key to the given target.
    #[must_use]
    pub fn references(mut self, reference: ColumnReference) -> Self {
        self.references = Some(reference);
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expression: impl Into<String>) -> Self {
        self.default_expr = Some(expression.into());
        self
    }

    /// Sets the check expression.
    #[must_use]
    pub fn check_expr(mut self, expression: impl Into<String>) -> Self {
        self.check_expr = Some(expression.into());
        self
    }

    /// Returns whether the column is flagged as a foreign key.
    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        self.references.is_some()
    }

    /// Checks the column invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::empty_identifier("column name"));
        }
        if self.auto_increment {
            if self.type_desc.affinity() != SqlAffinity::Integer {
                return Err(SchemaError::InvalidModel(format!(
                    "column '{}' is auto-increment but not integer-affine",
                    self.name
                )));
            }
            if self.nullable {
                return Err(SchemaError::InvalidModel(format!(
                    "column '{}' is auto-increment but nullable",
                    self.name
                )));
            }
        }
        if let Some(ref reference) = self.references {
            if reference.table.trim().is_empty() || reference.column.trim().is_empty() {
                return Err(SchemaError::InvalidModel(format!(
                    "column '{}' is a foreign key but the referenced table/column is empty",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
