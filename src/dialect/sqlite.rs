//! SQLite dialect.
//!
//! SQLite's `ALTER TABLE` covers only rename-table, rename-column,
//! add-column (with restrictions), and drop-column (3.35.0+). Everything
//! else goes through the recreate-table executor, which this dialect's
//! [`can_alter_directly`](Dialect::can_alter_directly) steers.

use once_cell::sync::Lazy;

use crate::types::{LogicalType, ProviderSqlType, SqlAffinity, TypeMap};

use super::{Dialect, ServerVersion, TableChange};

static TYPE_MAP: Lazy<TypeMap> = Lazy::new(|| {
    TypeMap::new(
        vec![
            // SQLite stores all integers as 64-bit INTEGER.
            ProviderSqlType::new("integer", SqlAffinity::Integer, LogicalType::BigInt)
                .max_value(i64::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("real", SqlAffinity::Real, LogicalType::Double),
            ProviderSqlType::new("numeric", SqlAffinity::Real, LogicalType::Decimal)
                .with_precision("numeric({p})", "numeric({p}, {s})"),
            ProviderSqlType::new("text", SqlAffinity::Text, LogicalType::Text).unicode(),
            ProviderSqlType::new("varchar", SqlAffinity::Text, LogicalType::Text)
                .with_length("varchar({len})")
                .unicode(),
            ProviderSqlType::new("char", SqlAffinity::Text, LogicalType::Text)
                .with_length("char({len})")
                .unicode()
                .fixed_length(),
            ProviderSqlType::new("blob", SqlAffinity::Binary, LogicalType::Binary),
            ProviderSqlType::new("boolean", SqlAffinity::Boolean, LogicalType::Boolean),
            ProviderSqlType::new("date", SqlAffinity::DateTime, LogicalType::Date).date_only(),
            ProviderSqlType::new("time", SqlAffinity::DateTime, LogicalType::Time).time_only(),
            ProviderSqlType::new("datetime", SqlAffinity::DateTime, LogicalType::DateTime),
        ],
        &[
            ("int", "integer"),
            ("bigint", "integer"),
            ("smallint", "integer"),
            ("tinyint", "integer"),
            ("mediumint", "integer"),
            ("double", "real"),
            ("float", "real"),
            ("decimal", "numeric"),
            ("nvarchar", "varchar"),
            ("character", "char"),
            ("nchar", "char"),
            ("clob", "text"),
            ("bool", "boolean"),
            ("timestamp", "datetime"),
        ],
        "text",
    )
});

/// The SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn supports_schemas(&self) -> bool {
        false
    }

    fn supports_ordered_keys(&self) -> bool {
        true
    }

    fn can_alter_directly(&self, change: &TableChange<'_>, server: ServerVersion) -> bool {
        match change {
            TableChange::AddColumn(column) => {
                // ADD COLUMN cannot introduce keys or constraints-by-flag,
                // and a NOT NULL column needs a default to backfill.
                !column.primary_key
                    && !column.unique
                    && !column.auto_increment
                    && column.references.is_none()
                    && (column.nullable || column.default_expr.is_some())
            }
            TableChange::RenameColumn | TableChange::RenameTable => true,
            TableChange::DropColumn => server.at_least(3, 35, 0),
            _ => false,
        }
    }

    fn version_query(&self) -> &'static str {
        "SELECT sqlite_version()"
    }

    fn type_map(&self) -> &TypeMap {
        &TYPE_MAP
    }

    fn auto_increment_sql(&self) -> &'static str {
        "AUTOINCREMENT"
    }

    fn truncate_table_sql(&self, schema: Option<&str>, table: &str) -> String {
        // SQLite has no TRUNCATE.
        format!("DELETE FROM {}", self.qualified_name(schema, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnReference, OrderedColumn, Table, UniqueConstraint};
    use crate::types::TypeDescriptor;

    fn dialect() -> SqliteDialect {
        SqliteDialect::new()
    }

    #[test]
    fn test_type_forward_mapping() {
        let d = dialect();
        let map = d.type_map();
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::BigInt), true),
            "integer"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Text).length(100), false),
            "varchar(100)"
        );
        assert_eq!(
            map.to_physical(
                &TypeDescriptor::new(LogicalType::Decimal).precision(10).scale(2),
                false
            ),
            "numeric(10, 2)"
        );
        // No geometry support: falls back to unbounded text.
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Geometry), false),
            "text"
        );
    }

    #[test]
    fn test_type_reverse_mapping_aliases() {
        let d = dialect();
        let map = d.type_map();
        assert_eq!(map.to_logical("BIGINT").logical, LogicalType::BigInt);
        assert_eq!(map.to_logical("TIMESTAMP").logical, LogicalType::DateTime);
        assert_eq!(map.to_logical("NVARCHAR(40)").length, Some(40));
    }

    #[test]
    fn test_create_table_with_inline_pk_and_unique() {
        let table = Table::new("widgets")
            .column(
                Column::new("widgets", "id", LogicalType::BigInt)
                    .primary_key()
                    .auto_increment(),
            )
            .column(
                Column::new("widgets", "name", LogicalType::Text)
                    .length(100)
                    .not_null(),
            )
            .column(
                Column::new("widgets", "sku", LogicalType::Text)
                    .length(50)
                    .unique(),
            );

        let statements = dialect().create_table_statements(&table).unwrap();
        assert_eq!(statements.len(), 1);
        let sql = &statements[0];
        assert!(sql.contains("\"id\" integer PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"name\" varchar(100) NOT NULL"));
        assert!(sql.contains("CONSTRAINT \"uq_widgets_sku\" UNIQUE (\"sku\")"));
    }

    #[test]
    fn test_create_table_with_foreign_key_clause() {
        let table = Table::new("orders")
            .column(Column::new("orders", "id", LogicalType::BigInt).primary_key())
            .column(
                Column::new("orders", "customer_id", LogicalType::BigInt)
                    .not_null()
                    .references(
                        ColumnReference::new("customers", "id")
                            .on_delete(crate::model::ReferentialAction::Cascade),
                    ),
            );

        let statements = dialect().create_table_statements(&table).unwrap();
        let sql = &statements[0];
        assert!(sql.contains(
            "CONSTRAINT \"fk_orders_customer_id_customers\" FOREIGN KEY (\"customer_id\") \
             REFERENCES \"customers\" (\"id\") ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_create_table_emits_indexes_after() {
        let table = Table::new("t")
            .column(Column::new("t", "id", LogicalType::BigInt).primary_key())
            .column(Column::new("t", "a", LogicalType::Text).indexed());

        let statements = dialect().create_table_statements(&table).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1], "CREATE INDEX \"ix_t_a\" ON \"t\" (\"a\")");
    }

    #[test]
    fn test_composite_unique_keeps_key_order() {
        let table = Table::new("t")
            .column(Column::new("t", "id", LogicalType::BigInt).primary_key())
            .column(Column::new("t", "a", LogicalType::Text))
            .column(Column::new("t", "b", LogicalType::Text))
            .unique(UniqueConstraint::new(
                "t",
                vec![OrderedColumn::new("b"), OrderedColumn::descending("a")],
            ));

        let statements = dialect().create_table_statements(&table).unwrap();
        assert!(statements[0].contains("UNIQUE (\"b\", \"a\" DESC)"));
    }

    #[test]
    fn test_direct_alter_decisions() {
        let d = dialect();
        let server = ServerVersion::new(3, 45, 0);
        let plain = Column::new("t", "c", LogicalType::Text);
        assert!(d.can_alter_directly(&TableChange::AddColumn(&plain), server));

        let unique = Column::new("t", "c", LogicalType::Text).unique();
        assert!(!d.can_alter_directly(&TableChange::AddColumn(&unique), server));

        let not_null = Column::new("t", "c", LogicalType::Text).not_null();
        assert!(!d.can_alter_directly(&TableChange::AddColumn(&not_null), server));

        assert!(d.can_alter_directly(&TableChange::DropColumn, server));
        assert!(!d.can_alter_directly(&TableChange::DropColumn, ServerVersion::new(3, 24, 0)));
        assert!(!d.can_alter_directly(&TableChange::AddCheck, server));
        assert!(!d.can_alter_directly(&TableChange::DropUnique, server));
    }

    #[test]
    fn test_truncate_is_delete_from() {
        assert_eq!(
            dialect().truncate_table_sql(None, "t"),
            "DELETE FROM \"t\""
        );
    }

    #[test]
    fn test_schema_ddl_unsupported() {
        assert!(dialect().create_schema_sql("s").is_err());
        assert!(dialect().drop_schema_sql("s").is_err());
    }
}
