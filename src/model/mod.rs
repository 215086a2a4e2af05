//! The dialect-neutral schema model.
//!
//! These entities describe schemas, tables, columns, constraints, indexes,
//! and views independently of any SQL engine. They are produced either by a
//! caller describing the schema it wants, or by the introspection readers
//! reconstructing what a database already has.

mod column;
mod constraints;
mod index;
mod table;
mod view;

pub use column::{Column, ColumnReference};
pub use constraints::{
    CheckConstraint, DefaultConstraint, ForeignKeyConstraint, OrderedColumn,
    PrimaryKeyConstraint, ReferentialAction, SortOrder, UniqueConstraint,
};
pub use index::Index;
pub use table::Table;
pub use view::View;

/// Case-insensitive identifier equality, the correlation rule used across
/// the model and the introspection readers.
#[must_use]
pub fn ident_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_eq() {
        assert!(ident_eq("Widgets", "widgets"));
        assert!(!ident_eq("widgets", "gadgets"));
    }
}
