//! Index entity.

use serde::{Deserialize, Serialize};

use super::OrderedColumn;

/// A table index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Owning table.
    pub table: String,
    /// Index name.
    pub name: String,
    /// Indexed columns, in index order.
    pub columns: Vec<OrderedColumn>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl Index {
    /// Creates a non-unique index with the deterministic default name.
    #[must_use]
    pub fn new(table: impl Into<String>, columns: Vec<OrderedColumn>) -> Self {
        let table = table.into();
        let name = Self::default_name(&table, &columns);
        Self {
            table,
            name,
            columns,
            unique: false,
        }
    }

    /// Sets the index name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Deterministic name used when none is supplied: `ix_<table>_<cols>`.
    #[must_use]
    pub fn default_name(table: &str, columns: &[OrderedColumn]) -> String {
        let cols = columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("_");
        format!("ix_{table}_{cols}")
    }
}
