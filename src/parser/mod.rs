//! Structural `CREATE TABLE` parser.
//!
//! Rebuilds a [`Table`](crate::model::Table) from existing DDL text so the
//! recreate-table executor can fold a change into a replacement table. The
//! pipeline has three independently tested stages: tokenizer (comment
//! stripping, quote-aware splitting, multi-word keyword gluing), clause-tree
//! builder (stack-based nesting on parentheses and commas), and extraction
//! (classifying column definitions versus table constraints).

mod clause;
mod extract;
mod tokenizer;

pub use clause::{Clause, Node};
pub use tokenizer::Token;

use crate::error::Result;
use crate::model::Table;
use crate::types::TypeMap;

/// Parses one `CREATE TABLE` statement into a [`Table`], resolving physical
/// type names through the given dialect type map.
pub fn parse_create_table(sql: &str, types: &TypeMap) -> Result<Table> {
    let stripped = tokenizer::strip_comments(sql);
    let tokens = tokenizer::tokenize(&stripped)?;
    let clauses = clause::build_clauses(&tokens, sql)?;
    extract::extract_table(&clauses, types, sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Dialect, SqliteDialect};
    use crate::model::ReferentialAction;
    use crate::types::LogicalType;

    fn parse(sql: &str) -> Table {
        parse_create_table(sql, SqliteDialect::new().type_map()).unwrap()
    }

    #[test]
    fn test_basic_columns() {
        let table = parse(
            "CREATE TABLE widgets (\n  id integer PRIMARY KEY AUTOINCREMENT,\n  name varchar(100) NOT NULL,\n  sku varchar(50)\n)",
        );
        assert_eq!(table.name, "widgets");
        assert_eq!(table.column_names(), vec!["id", "name", "sku"]);

        let id = table.get_column("id").unwrap();
        assert!(id.primary_key);
        assert!(id.auto_increment);
        assert!(!id.nullable);

        let name = table.get_column("name").unwrap();
        assert_eq!(name.type_desc.logical, LogicalType::Text);
        assert_eq!(name.type_desc.length, Some(100));
        assert!(!name.nullable);

        assert!(table.get_column("sku").unwrap().nullable);
    }

    #[test]
    fn test_quoted_identifiers_and_comments() {
        let table = parse(
            "CREATE TABLE \"order items\" ( -- line comment\n  [id] integer, /* block */ `qty` int NOT NULL\n)",
        );
        assert_eq!(table.name, "order items");
        assert_eq!(table.column_names(), vec!["id", "qty"]);
        assert!(!table.get_column("qty").unwrap().nullable);
    }

    #[test]
    fn test_inline_default_check_and_references() {
        let table = parse(
            "CREATE TABLE t (\n  status text DEFAULT 'new',\n  price numeric CHECK (price > 0),\n  owner_id integer REFERENCES users (id) ON DELETE CASCADE ON UPDATE SET NULL\n)",
        );
        assert_eq!(
            table.get_column("status").unwrap().default_expr.as_deref(),
            Some("'new'")
        );
        assert_eq!(
            table.get_column("price").unwrap().check_expr.as_deref(),
            Some("price > 0")
        );
        let reference = table.get_column("owner_id").unwrap().references.clone().unwrap();
        assert_eq!(reference.table, "users");
        assert_eq!(reference.column, "id");
        assert_eq!(reference.on_delete, ReferentialAction::Cascade);
        assert_eq!(reference.on_update, ReferentialAction::SetNull);
    }

    #[test]
    fn test_table_constraints_back_annotate_columns() {
        let table = parse(
            "CREATE TABLE orders (\n  id integer,\n  number text,\n  customer_id integer,\n  CONSTRAINT \"pk_orders\" PRIMARY KEY (\"id\"),\n  CONSTRAINT \"uq_orders_number\" UNIQUE (\"number\"),\n  CONSTRAINT \"fk_orders_customer_id_customers\" FOREIGN KEY (\"customer_id\") REFERENCES \"customers\" (\"id\") ON DELETE CASCADE\n)",
        );
        // Default-named single-column constraints canonicalize onto flags.
        assert!(table.get_column("id").unwrap().primary_key);
        assert!(table.primary_key.is_none());
        assert!(table.get_column("number").unwrap().unique);
        assert!(table.uniques.is_empty());
        let reference = table
            .get_column("customer_id")
            .unwrap()
            .references
            .clone()
            .unwrap();
        assert_eq!(reference.table, "customers");
        assert_eq!(reference.on_delete, ReferentialAction::Cascade);
        assert!(table.foreign_keys.is_empty());
    }

    #[test]
    fn test_composite_constraints_stay_table_level() {
        let table = parse(
            "CREATE TABLE t (\n  a integer,\n  b integer,\n  PRIMARY KEY (a, b DESC),\n  UNIQUE (a, b)\n)",
        );
        let pk = table.primary_key.clone().unwrap();
        assert_eq!(pk.columns.len(), 2);
        assert_eq!(pk.columns[1].order, crate::model::SortOrder::Descending);
        assert!(table.get_column("a").unwrap().primary_key);
        assert!(table.get_column("b").unwrap().primary_key);
        assert_eq!(table.uniques.len(), 1);
    }

    #[test]
    fn test_named_check_constraint() {
        let table = parse(
            "CREATE TABLE people (\n  age integer,\n  CONSTRAINT ck_age CHECK (age > 0 AND age < 150)\n)",
        );
        assert_eq!(table.checks.len(), 1);
        assert_eq!(table.checks[0].name, "ck_age");
        assert_eq!(table.checks[0].expression, "age > 0 AND age < 150");
        assert!(table.checks[0].column.is_none());
    }

    #[test]
    fn test_check_expression_with_nested_parens() {
        let table = parse("CREATE TABLE t (a integer, CHECK ((a > 0) AND (a < 10)))");
        assert_eq!(table.checks[0].expression, "(a > 0) AND (a < 10)");
    }

    #[test]
    fn test_inline_constraint_names_are_kept() {
        let table = parse(
            "CREATE TABLE t (\n  a integer CONSTRAINT uniq_a UNIQUE,\n  b integer CONSTRAINT positive_b CHECK (b > 0),\n  c integer CONSTRAINT owner_link REFERENCES users (id) ON DELETE CASCADE\n)",
        );
        // Custom names survive as table-level entries instead of flags.
        assert!(!table.get_column("a").unwrap().unique);
        assert_eq!(table.uniques.len(), 1);
        assert_eq!(table.uniques[0].name, "uniq_a");
        assert_eq!(table.uniques[0].columns[0].name, "a");

        assert!(table.get_column("b").unwrap().check_expr.is_none());
        assert_eq!(table.checks.len(), 1);
        assert_eq!(table.checks[0].name, "positive_b");
        assert_eq!(table.checks[0].column.as_deref(), Some("b"));
        assert_eq!(table.checks[0].expression, "b > 0");

        assert!(table.get_column("c").unwrap().references.is_none());
        assert_eq!(table.foreign_keys.len(), 1);
        assert_eq!(table.foreign_keys[0].name, "owner_link");
        assert_eq!(table.foreign_keys[0].referenced_table, "users");
        assert_eq!(
            table.foreign_keys[0].on_delete,
            ReferentialAction::Cascade
        );
    }

    #[test]
    fn test_inline_default_named_constraints_fold_to_flags() {
        let table = parse(
            "CREATE TABLE t (a integer CONSTRAINT uq_t_a UNIQUE, b integer CONSTRAINT ck_t_b CHECK (b > 0))",
        );
        assert!(table.get_column("a").unwrap().unique);
        assert!(table.uniques.is_empty());
        assert_eq!(
            table.get_column("b").unwrap().check_expr.as_deref(),
            Some("b > 0")
        );
        assert!(table.checks.is_empty());
    }

    #[test]
    fn test_explicitly_named_single_column_unique_is_kept() {
        let table = parse("CREATE TABLE t (a integer, CONSTRAINT my_unique UNIQUE (a))");
        assert_eq!(table.uniques.len(), 1);
        assert_eq!(table.uniques[0].name, "my_unique");
    }

    #[test]
    fn test_if_not_exists_and_typeless_columns() {
        let table = parse("CREATE TABLE IF NOT EXISTS t (a, b text)");
        assert_eq!(table.name, "t");
        assert_eq!(
            table.get_column("a").unwrap().type_desc.logical,
            LogicalType::Object
        );
    }

    #[test]
    fn test_rejects_non_create_table() {
        let types = SqliteDialect::new();
        assert!(parse_create_table("DROP TABLE t", types.type_map()).is_err());
        assert!(parse_create_table("CREATE TABLE t", types.type_map()).is_err());
    }
}
