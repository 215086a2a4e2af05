//! The "pending changes" accumulator used during column synthesis.
//!
//! Column definitions can imply constraints the definition itself cannot
//! express (a unique flag, an inline foreign key target, membership in a
//! composite primary key, an indexed flag). Synthesis threads one
//! [`PendingChanges`] value through a single call and emits the accumulated
//! constraints after the primary statement, in the fixed order: primary key,
//! check constraints, default constraints, unique constraints, foreign
//! keys, indexes.

use crate::error::Result;
use crate::model::{
    CheckConstraint, ColumnReference, DefaultConstraint, ForeignKeyConstraint, Index,
    OrderedColumn, PrimaryKeyConstraint, UniqueConstraint,
};

use super::Dialect;

/// Constraints and indexes implied by column flags during one synthesis
/// call. Never aliased or stored; built, drained, dropped.
#[derive(Debug, Default)]
pub struct PendingChanges {
    primary_key: Option<PrimaryKeyConstraint>,
    checks: Vec<CheckConstraint>,
    defaults: Vec<DefaultConstraint>,
    uniques: Vec<UniqueConstraint>,
    foreign_keys: Vec<ForeignKeyConstraint>,
    indexes: Vec<Index>,
}

impl PendingChanges {
    /// Returns whether nothing accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary_key.is_none()
            && self.checks.is_empty()
            && self.defaults.is_empty()
            && self.uniques.is_empty()
            && self.foreign_keys.is_empty()
            && self.indexes.is_empty()
    }

    /// Notes that a column is part of the (not-inline) primary key.
    pub fn note_primary_key_column(&mut self, table: &str, column: &str) {
        let ordered = OrderedColumn::new(column);
        match self.primary_key {
            Some(ref mut pk) => pk.columns.push(ordered),
            None => self.primary_key = Some(PrimaryKeyConstraint::new(table, vec![ordered])),
        }
    }

    /// Notes a single-column unique constraint implied by a column flag.
    pub fn note_unique_column(&mut self, table: &str, column: &str) {
        self.uniques
            .push(UniqueConstraint::new(table, vec![OrderedColumn::new(column)]));
    }

    /// Notes a single-column index implied by a column flag.
    pub fn note_indexed_column(&mut self, table: &str, column: &str) {
        self.indexes
            .push(Index::new(table, vec![OrderedColumn::new(column)]));
    }

    /// Notes a single-column foreign key implied by an inline reference.
    pub fn note_foreign_key_column(
        &mut self,
        table: &str,
        column: &str,
        reference: &ColumnReference,
    ) {
        self.foreign_keys.push(
            ForeignKeyConstraint::new(
                table,
                vec![OrderedColumn::new(column)],
                reference.table.clone(),
                vec![OrderedColumn::new(reference.column.clone())],
            )
            .on_delete(reference.on_delete)
            .on_update(reference.on_update),
        );
    }

    /// Notes a check constraint.
    pub fn note_check(&mut self, check: CheckConstraint) {
        self.checks.push(check);
    }

    /// Notes a default constraint.
    pub fn note_default(&mut self, default: DefaultConstraint) {
        self.defaults.push(default);
    }

    /// Takes the accumulated primary key, if any.
    pub fn take_primary_key(&mut self) -> Option<PrimaryKeyConstraint> {
        self.primary_key.take()
    }

    /// Accumulated unique constraints.
    pub fn uniques(&self) -> impl Iterator<Item = &UniqueConstraint> {
        self.uniques.iter()
    }

    /// Accumulated foreign keys.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyConstraint> {
        self.foreign_keys.iter()
    }

    /// Accumulated indexes.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter()
    }

    /// Renders the accumulated constraints as `ALTER TABLE`/`CREATE INDEX`
    /// statements in the fixed documented order.
    pub fn alter_statements(
        &self,
        dialect: &(impl Dialect + ?Sized),
        schema: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        if let Some(ref pk) = self.primary_key {
            statements.push(dialect.add_primary_key_sql(schema, pk)?);
        }
        for check in &self.checks {
            statements.push(dialect.add_check_sql(schema, check)?);
        }
        for default in &self.defaults {
            statements.push(dialect.add_default_sql(schema, default)?);
        }
        for unique in &self.uniques {
            statements.push(dialect.add_unique_sql(schema, unique)?);
        }
        for fk in &self.foreign_keys {
            statements.push(dialect.add_foreign_key_sql(schema, fk)?);
        }
        for index in &self.indexes {
            statements.push(dialect.create_index_sql(schema, index));
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgresDialect;
    use crate::model::ReferentialAction;

    #[test]
    fn test_fixed_emission_order() {
        let mut pending = PendingChanges::default();
        pending.note_foreign_key_column(
            "orders",
            "customer_id",
            &ColumnReference::new("customers", "id").on_delete(ReferentialAction::Cascade),
        );
        pending.note_indexed_column("orders", "placed_at");
        pending.note_unique_column("orders", "number");
        pending.note_primary_key_column("orders", "id");

        let statements = pending
            .alter_statements(&PostgresDialect::new(), None)
            .unwrap();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].contains("PRIMARY KEY"));
        assert!(statements[1].contains("UNIQUE"));
        assert!(statements[2].contains("FOREIGN KEY"));
        assert!(statements[3].starts_with("CREATE INDEX"));
    }

    #[test]
    fn test_composite_primary_key_accumulates() {
        let mut pending = PendingChanges::default();
        pending.note_primary_key_column("t", "a");
        pending.note_primary_key_column("t", "b");
        let pk = pending.take_primary_key().unwrap();
        assert_eq!(pk.columns.len(), 2);
        assert!(pending.is_empty());
    }
}
