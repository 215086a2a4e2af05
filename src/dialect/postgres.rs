//! PostgreSQL dialect.

use once_cell::sync::Lazy;

use crate::model::Column;
use crate::types::{LogicalType, ProviderSqlType, SqlAffinity, TypeMap};

use super::{Dialect, ServerVersion, TableChange};

static TYPE_MAP: Lazy<TypeMap> = Lazy::new(|| {
    TypeMap::new(
        vec![
            ProviderSqlType::new("smallint", SqlAffinity::Integer, LogicalType::SmallInt)
                .max_value(i16::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("integer", SqlAffinity::Integer, LogicalType::Integer)
                .max_value(i32::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("bigint", SqlAffinity::Integer, LogicalType::BigInt)
                .max_value(i64::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("real", SqlAffinity::Real, LogicalType::Real),
            ProviderSqlType::new("double precision", SqlAffinity::Real, LogicalType::Double),
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
            ProviderSqlType::new("uuid", SqlAffinity::Text, LogicalType::Uuid).unicode(),
            ProviderSqlType::new("jsonb", SqlAffinity::Text, LogicalType::Json).unicode(),
            ProviderSqlType::new("json", SqlAffinity::Text, LogicalType::Json).unicode(),
            ProviderSqlType::new("bytea", SqlAffinity::Binary, LogicalType::Binary),
            ProviderSqlType::new("boolean", SqlAffinity::Boolean, LogicalType::Boolean),
            ProviderSqlType::new("date", SqlAffinity::DateTime, LogicalType::Date).date_only(),
            ProviderSqlType::new("time", SqlAffinity::DateTime, LogicalType::Time).time_only(),
            ProviderSqlType::new("timestamp", SqlAffinity::DateTime, LogicalType::DateTime),
            ProviderSqlType::new("geometry", SqlAffinity::Geometry, LogicalType::Geometry),
        ],
        &[
            ("character varying", "varchar"),
            ("character", "char"),
            ("bpchar", "char"),
            ("int", "integer"),
            ("int2", "smallint"),
            ("int4", "integer"),
            ("int8", "bigint"),
            ("serial", "integer"),
            ("bigserial", "bigint"),
            ("smallserial", "smallint"),
            ("float4", "real"),
            ("float8", "double precision"),
            ("decimal", "numeric"),
            ("bool", "boolean"),
            ("timestamptz", "timestamp"),
            ("timestamp with time zone", "timestamp"),
            ("timestamp without time zone", "timestamp"),
            ("time without time zone", "time"),
        ],
        "text",
    )
});

/// The PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_schemas(&self) -> bool {
        true
    }

    fn supports_ordered_keys(&self) -> bool {
        // Constraint key columns take no direction; only indexes do.
        false
    }

    fn can_alter_directly(&self, change: &TableChange<'_>, server: ServerVersion) -> bool {
        let _ = (change, server);
        true
    }

    fn version_query(&self) -> &'static str {
        "SHOW server_version"
    }

    /// Unquoted identifiers fold to lowercase.
    fn normalize_case(&self, ident: &str) -> String {
        ident.to_ascii_lowercase()
    }

    fn type_map(&self) -> &TypeMap {
        &TYPE_MAP
    }

    /// Auto-increment is a pseudo-type, not a keyword.
    fn auto_increment_type(&self, column: &Column) -> Option<String> {
        let physical = match column.type_desc.logical {
            LogicalType::SmallInt => "smallserial",
            LogicalType::BigInt => "bigserial",
            _ => "serial",
        };
        Some(physical.to_string())
    }

    fn auto_increment_sql(&self) -> &'static str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OrderedColumn, Table, UniqueConstraint};
    use crate::types::TypeDescriptor;

    fn dialect() -> PostgresDialect {
        PostgresDialect::new()
    }

    #[test]
    fn test_identifiers_fold_lowercase() {
        assert_eq!(dialect().quote_identifier("Widgets"), "\"widgets\"");
        assert_eq!(
            dialect().qualified_name(Some("Sales"), "Orders"),
            "\"sales\".\"orders\""
        );
    }

    #[test]
    fn test_auto_increment_renders_serial() {
        let d = dialect();
        let small = Column::new("t", "id", LogicalType::SmallInt).auto_increment();
        assert_eq!(d.column_type_sql(&small), "smallserial");
        let medium = Column::new("t", "id", LogicalType::Integer).auto_increment();
        assert_eq!(d.column_type_sql(&medium), "serial");
        let big = Column::new("t", "id", LogicalType::BigInt).auto_increment();
        assert_eq!(d.column_type_sql(&big), "bigserial");
    }

    #[test]
    fn test_type_forward_mapping() {
        let d = dialect();
        let map = d.type_map();
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Uuid), false),
            "uuid"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Json), false),
            "jsonb"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Binary), false),
            "bytea"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Double), false),
            "double precision"
        );
    }

    #[test]
    fn test_type_reverse_mapping_aliases() {
        let d = dialect();
        let map = d.type_map();
        assert_eq!(
            map.to_logical("character varying(255)").logical,
            LogicalType::Text
        );
        assert_eq!(map.to_logical("int8").logical, LogicalType::BigInt);
        assert_eq!(
            map.to_logical("timestamp without time zone").logical,
            LogicalType::DateTime
        );
        assert_eq!(map.to_logical("bigserial").logical, LogicalType::BigInt);
    }

    #[test]
    fn test_unordered_keys_drop_direction() {
        let d = dialect();
        let unique = UniqueConstraint::new(
            "t",
            vec![OrderedColumn::new("a"), OrderedColumn::descending("b")],
        );
        let clause = d.unique_clause(&unique);
        assert!(clause.contains("(\"a\", \"b\")"));
        assert!(!clause.contains("DESC"));
    }

    #[test]
    fn test_index_keeps_direction() {
        let d = dialect();
        let index = crate::model::Index::new("t", vec![OrderedColumn::descending("a")]);
        assert_eq!(
            d.create_index_sql(None, &index),
            "CREATE INDEX \"ix_t_a\" ON \"t\" (\"a\" DESC)"
        );
    }

    #[test]
    fn test_schema_qualified_create_table() {
        let table = Table::new("orders")
            .schema("sales")
            .column(Column::new("orders", "id", LogicalType::BigInt).primary_key());
        let statements = dialect().create_table_statements(&table).unwrap();
        assert!(statements[0].starts_with("CREATE TABLE \"sales\".\"orders\""));
    }

    #[test]
    fn test_everything_alters_directly() {
        let d = dialect();
        let server = ServerVersion::new(16, 2, 0);
        assert!(d.can_alter_directly(&TableChange::AddCheck, server));
        assert!(d.can_alter_directly(&TableChange::DropPrimaryKey, server));
        assert!(d.can_alter_directly(&TableChange::AlterColumnType, server));
    }
}
