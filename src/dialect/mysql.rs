//! MySQL dialect.

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::types::{LogicalType, ProviderSqlType, SqlAffinity, TypeMap};

use super::{Dialect, ServerVersion, TableChange};

static TYPE_MAP: Lazy<TypeMap> = Lazy::new(|| {
    TypeMap::new(
        vec![
            ProviderSqlType::new("boolean", SqlAffinity::Boolean, LogicalType::Boolean),
            ProviderSqlType::new("smallint", SqlAffinity::Integer, LogicalType::SmallInt)
                .max_value(i16::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("int", SqlAffinity::Integer, LogicalType::Integer)
                .max_value(i32::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("bigint", SqlAffinity::Integer, LogicalType::BigInt)
                .max_value(i64::MAX as i128)
                .auto_increment(),
            ProviderSqlType::new("float", SqlAffinity::Real, LogicalType::Real),
            ProviderSqlType::new("double", SqlAffinity::Real, LogicalType::Double),
            ProviderSqlType::new("decimal", SqlAffinity::Real, LogicalType::Decimal)
                .with_precision("decimal({p})", "decimal({p}, {s})"),
            // Unbounded types come first; width-formatted entries only take
            // over when a length hint is present.
            ProviderSqlType::new("text", SqlAffinity::Text, LogicalType::Text).unicode(),
            ProviderSqlType::new("longtext", SqlAffinity::Text, LogicalType::Text).unicode(),
            ProviderSqlType::new("varchar", SqlAffinity::Text, LogicalType::Text)
                .with_length("varchar({len})")
                .unicode(),
            ProviderSqlType::new("char", SqlAffinity::Text, LogicalType::Text)
                .with_length("char({len})")
                .unicode()
                .fixed_length(),
            ProviderSqlType::new("json", SqlAffinity::Text, LogicalType::Json).unicode(),
            ProviderSqlType::new("blob", SqlAffinity::Binary, LogicalType::Binary),
            ProviderSqlType::new("longblob", SqlAffinity::Binary, LogicalType::Binary),
            ProviderSqlType::new("varbinary", SqlAffinity::Binary, LogicalType::Binary)
                .with_length("varbinary({len})"),
            ProviderSqlType::new("binary", SqlAffinity::Binary, LogicalType::Binary)
                .with_length("binary({len})")
                .fixed_length(),
            ProviderSqlType::new("date", SqlAffinity::DateTime, LogicalType::Date).date_only(),
            ProviderSqlType::new("time", SqlAffinity::DateTime, LogicalType::Time).time_only(),
            ProviderSqlType::new("datetime", SqlAffinity::DateTime, LogicalType::DateTime),
            ProviderSqlType::new("year", SqlAffinity::DateTime, LogicalType::Date).year_only(),
            ProviderSqlType::new("geometry", SqlAffinity::Geometry, LogicalType::Geometry),
        ],
        &[
            ("integer", "int"),
            ("mediumint", "int"),
            ("numeric", "decimal"),
            ("real", "double"),
            ("bool", "boolean"),
            // MySQL reports BOOLEAN columns back as tinyint(1).
            ("tinyint", "boolean"),
            ("timestamp", "datetime"),
            ("tinytext", "text"),
            ("mediumtext", "longtext"),
            ("tinyblob", "blob"),
            ("mediumblob", "longblob"),
            ("nvarchar", "varchar"),
            ("character", "char"),
        ],
        "longtext",
    )
});

/// The MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn supports_schemas(&self) -> bool {
        // A MySQL "schema" is the database; there is no second namespace.
        false
    }

    fn supports_named_foreign_keys(&self) -> bool {
        true
    }

    fn supports_ordered_keys(&self) -> bool {
        true
    }

    fn supports_check_constraints(&self, server: ServerVersion) -> bool {
        server.at_least(8, 0, 16)
    }

    fn can_alter_directly(&self, change: &TableChange<'_>, server: ServerVersion) -> bool {
        match change {
            TableChange::AddCheck | TableChange::DropCheck => {
                self.supports_check_constraints(server)
            }
            _ => true,
        }
    }

    fn version_query(&self) -> &'static str {
        "SELECT VERSION()"
    }

    fn quote_chars(&self) -> (char, char) {
        ('`', '`')
    }

    fn type_map(&self) -> &TypeMap {
        &TYPE_MAP
    }

    fn auto_increment_sql(&self) -> &'static str {
        "AUTO_INCREMENT"
    }

    fn drop_primary_key_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<String> {
        let _ = name;
        Ok(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.qualified_name(schema, table)
        ))
    }

    fn drop_unique_sql(&self, schema: Option<&str>, table: &str, name: &str) -> Result<String> {
        // Unique constraints are backed by indexes.
        Ok(format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    fn drop_check_sql(&self, schema: Option<&str>, table: &str, name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP CHECK {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    fn drop_foreign_key_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        name: &str,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.qualified_name(schema, table),
            self.quote_identifier(name)
        ))
    }

    fn drop_index_sql(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(name),
            self.qualified_name(schema, table)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Table};
    use crate::types::TypeDescriptor;

    fn dialect() -> MySqlDialect {
        MySqlDialect::new()
    }

    #[test]
    fn test_backtick_quoting() {
        assert_eq!(dialect().quote_identifier("widgets"), "`widgets`");
    }

    #[test]
    fn test_auto_increment_keyword() {
        let table = Table::new("t").column(
            Column::new("t", "id", LogicalType::BigInt)
                .primary_key()
                .auto_increment(),
        );
        let statements = dialect().create_table_statements(&table).unwrap();
        assert!(statements[0].contains("`id` bigint PRIMARY KEY AUTO_INCREMENT"));
    }

    #[test]
    fn test_type_forward_mapping() {
        let d = dialect();
        let map = d.type_map();
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Boolean), false),
            "boolean"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Text), false),
            "text"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Text).length(191), false),
            "varchar(191)"
        );
        // Unmapped logical types fall back to the unbounded text type.
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Uuid), false),
            "longtext"
        );
    }

    #[test]
    fn test_type_reverse_mapping_aliases() {
        let d = dialect();
        let map = d.type_map();
        assert_eq!(map.to_logical("tinyint(1)").logical, LogicalType::Boolean);
        assert_eq!(map.to_logical("TIMESTAMP").logical, LogicalType::DateTime);
        assert_eq!(map.to_logical("mediumtext").logical, LogicalType::Text);
    }

    #[test]
    fn test_check_constraints_version_gated() {
        let d = dialect();
        assert!(d.supports_check_constraints(ServerVersion::new(8, 0, 16)));
        assert!(!d.supports_check_constraints(ServerVersion::new(5, 7, 44)));
        assert!(!d.can_alter_directly(&TableChange::AddCheck, ServerVersion::new(8, 0, 15)));
        assert!(d.can_alter_directly(&TableChange::AddCheck, ServerVersion::new(8, 4, 0)));
    }

    #[test]
    fn test_constraint_drop_syntax() {
        let d = dialect();
        assert_eq!(
            d.drop_primary_key_sql(None, "t", "pk_t").unwrap(),
            "ALTER TABLE `t` DROP PRIMARY KEY"
        );
        assert_eq!(
            d.drop_unique_sql(None, "t", "uq_t_a").unwrap(),
            "ALTER TABLE `t` DROP INDEX `uq_t_a`"
        );
        assert_eq!(
            d.drop_foreign_key_sql(None, "t", "fk_t_a_u").unwrap(),
            "ALTER TABLE `t` DROP FOREIGN KEY `fk_t_a_u`"
        );
        assert_eq!(
            d.drop_check_sql(None, "t", "ck_t").unwrap(),
            "ALTER TABLE `t` DROP CHECK `ck_t`"
        );
        assert_eq!(
            d.drop_index_sql(None, "t", "ix_t_a"),
            "DROP INDEX `ix_t_a` ON `t`"
        );
    }
}
