//! Table entity.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

use super::{
    CheckConstraint, Column, DefaultConstraint, ForeignKeyConstraint, Index, OrderedColumn,
    PrimaryKeyConstraint, UniqueConstraint, ident_eq,
};

/// A table: columns plus every constraint and index attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Schema name, when the dialect has schemas.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
    /// Columns, in declaration order.
    pub columns: Vec<Column>,
    /// Primary key constraint, if any.
    pub primary_key: Option<PrimaryKeyConstraint>,
    /// Check constraints.
    pub checks: Vec<CheckConstraint>,
    /// Default constraints.
    pub defaults: Vec<DefaultConstraint>,
    /// Unique constraints.
    pub uniques: Vec<UniqueConstraint>,
    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    /// Indexes.
    pub indexes: Vec<Index>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            checks: Vec::new(),
            defaults: Vec::new(),
            uniques: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Sets the schema name.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key constraint.
    #[must_use]
    pub fn primary_key(mut self, pk: PrimaryKeyConstraint) -> Self {
        self.primary_key = Some(pk);
        self
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn check(mut self, check: CheckConstraint) -> Self {
        self.checks.push(check);
        self
    }

    /// Adds a default constraint.
    #[must_use]
    pub fn default_constraint(mut self, default: DefaultConstraint) -> Self {
        self.defaults.push(default);
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique(mut self, unique: UniqueConstraint) -> Self {
        self.uniques.push(unique);
        self
    }

    /// Adds a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyConstraint) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Gets a column by name, case-insensitively.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| ident_eq(&c.name, name))
    }

    /// Gets a mutable column by name, case-insensitively.
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| ident_eq(&c.name, name))
    }

    /// Returns the column names in declaration order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the primary key columns, whether declared as a table
    /// constraint or inline on columns.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<OrderedColumn> {
        if let Some(ref pk) = self.primary_key {
            return pk.columns.clone();
        }
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| OrderedColumn::new(c.name.clone()))
            .collect()
    }

    /// Checks the table invariants: non-empty name, at least one column,
    /// case-insensitively unique column names, valid columns and foreign
    /// keys.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::empty_identifier("table name"));
        }
        if self.columns.is_empty() {
            return Err(SchemaError::InvalidModel(format!(
                "table '{}' has no columns",
                self.name
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            column.validate()?;
            if self.columns[..i].iter().any(|c| ident_eq(&c.name, &column.name)) {
                return Err(SchemaError::InvalidModel(format!(
                    "table '{}' declares column '{}' more than once",
                    self.name, column.name
                )));
            }
        }
        for fk in &self.foreign_keys {
            fk.validate()?;
        }
        Ok(())
    }

    /// Serializes the table to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes a table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogicalType;

    fn users() -> Table {
        Table::new("users")
            .column(
                Column::new("users", "id", LogicalType::BigInt)
                    .primary_key()
                    .auto_increment(),
            )
            .column(Column::new("users", "email", LogicalType::Text).not_null())
    }

    #[test]
    fn test_validate_ok() {
        assert!(users().validate().is_ok());
    }

    #[test]
    fn test_duplicate_column_names_case_insensitive() {
        let table = users().column(Column::new("users", "EMAIL", LogicalType::Text));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_primary_key_columns_from_inline_flags() {
        let pk = users().primary_key_columns();
        assert_eq!(pk.len(), 1);
        assert_eq!(pk[0].name, "id");
    }

    #[test]
    fn test_json_round_trip() {
        let table = users();
        let json = table.to_json().unwrap();
        let back = Table::from_json(&json).unwrap();
        assert_eq!(table, back);
    }
}
