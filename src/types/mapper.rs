//! The bidirectional logical ↔ physical type mapping engine.

use super::{LogicalType, SqlAffinity, TypeDescriptor};

/// A physical SQL type descriptor for one dialect.
///
/// Dialects declare these in an ordered list; within an affinity group the
/// forward mapping returns the **first** structurally compatible entry, so
/// preferred physical types must be declared earlier.
#[derive(Debug, Clone)]
pub struct ProviderSqlType {
    /// Base physical type name, lowercase (`"varchar"`, `"bigint"`).
    pub name: &'static str,
    /// Affinity group this type belongs to.
    pub affinity: SqlAffinity,
    /// Logical type the reverse mapping resolves this physical type to.
    pub logical: LogicalType,
    /// Render template when a length hint is present (`"varchar({len})"`).
    pub length_format: Option<&'static str>,
    /// Render template when only precision is present (`"decimal({p})"`).
    pub precision_format: Option<&'static str>,
    /// Render template when precision and scale are present.
    pub precision_scale_format: Option<&'static str>,
    /// Largest integer value the type can store, when integer-affine.
    pub max_value: Option<i128>,
    /// Whether the type can back an auto-increment column.
    pub auto_increment: bool,
    /// Whether the type stores unicode text natively.
    pub unicode: bool,
    /// Whether the type is fixed-length.
    pub fixed_length: bool,
    /// Whether the type stores a date with no time of day.
    pub date_only: bool,
    /// Whether the type stores a time of day with no date.
    pub time_only: bool,
    /// Whether the type stores a bare year.
    pub year_only: bool,
}

impl ProviderSqlType {
    /// Creates a descriptor with no width formats and all flags off.
    #[must_use]
    pub const fn new(name: &'static str, affinity: SqlAffinity, logical: LogicalType) -> Self {
        Self {
            name,
            affinity,
            logical,
            length_format: None,
            precision_format: None,
            precision_scale_format: None,
            max_value: None,
            auto_increment: false,
            unicode: false,
            fixed_length: false,
            date_only: false,
            time_only: false,
            year_only: false,
        }
    }

    /// Sets the length render template.
    #[must_use]
    pub const fn with_length(mut self, format: &'static str) -> Self {
        self.length_format = Some(format);
        self
    }

    /// Sets the precision and precision/scale render templates.
    #[must_use]
    pub const fn with_precision(
        mut self,
        precision: &'static str,
        precision_scale: &'static str,
    ) -> Self {
        self.precision_format = Some(precision);
        self.precision_scale_format = Some(precision_scale);
        self
    }

    /// Sets the integer capacity.
    #[must_use]
    pub const fn max_value(mut self, max: i128) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Marks the type as auto-increment capable.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Marks the type as unicode.
    #[must_use]
    pub const fn unicode(mut self) -> Self {
        self.unicode = true;
        self
    }

    /// Marks the type as fixed-length.
    #[must_use]
    pub const fn fixed_length(mut self) -> Self {
        self.fixed_length = true;
        self
    }

    /// Marks the type as date-only.
    #[must_use]
    pub const fn date_only(mut self) -> Self {
        self.date_only = true;
        self
    }

    /// Marks the type as time-only.
    #[must_use]
    pub const fn time_only(mut self) -> Self {
        self.time_only = true;
        self
    }

    /// Marks the type as year-only.
    #[must_use]
    pub const fn year_only(mut self) -> Self {
        self.year_only = true;
        self
    }

    /// Returns whether this physical type can represent the descriptor.
    fn is_compatible(&self, desc: &TypeDescriptor, needs_auto_increment: bool) -> bool {
        if self.affinity != desc.affinity() {
            return false;
        }
        if needs_auto_increment && !self.auto_increment {
            return false;
        }
        if let Some(required) = desc.logical.integer_max() {
            if self.max_value.is_some_and(|max| max < required) {
                return false;
            }
        }
        if desc.unicode && !self.unicode {
            return false;
        }
        if desc.fixed_length && !self.fixed_length {
            return false;
        }
        if desc.length.is_some() && self.length_format.is_none() {
            return false;
        }
        if desc.precision.is_some() && self.precision_format.is_none() {
            return false;
        }
        match desc.logical {
            LogicalType::Date => self.date_only,
            LogicalType::Time => self.time_only,
            LogicalType::DateTime => !self.date_only && !self.time_only && !self.year_only,
            _ => true,
        }
    }

    /// Renders the physical SQL type text for the given hints.
    #[must_use]
    pub fn render(&self, desc: &TypeDescriptor) -> String {
        if let (Some(p), Some(s), Some(format)) =
            (desc.precision, desc.scale, self.precision_scale_format)
        {
            return format
                .replace("{p}", &p.to_string())
                .replace("{s}", &s.to_string());
        }
        if let (Some(p), Some(format)) = (desc.precision, self.precision_format) {
            return format.replace("{p}", &p.to_string());
        }
        if let (Some(len), Some(format)) = (desc.length, self.length_format) {
            return format.replace("{len}", &len.to_string());
        }
        self.name.to_string()
    }
}

/// Per-dialect ordered type list with forward and reverse resolution.
///
/// Both directions are total: unknown inputs fall back instead of erroring.
#[derive(Debug)]
pub struct TypeMap {
    types: Vec<ProviderSqlType>,
    /// Dialect-specific alias pairs checked when the base-name lookup misses
    /// (`("numeric", "decimal")` resolves `numeric` as `decimal` would be).
    aliases: &'static [(&'static str, &'static str)],
    /// Base name of the unbounded fallback type for unmapped logical types.
    fallback: &'static str,
}

impl TypeMap {
    /// Creates a type map from an ordered descriptor list.
    #[must_use]
    pub fn new(
        types: Vec<ProviderSqlType>,
        aliases: &'static [(&'static str, &'static str)],
        fallback: &'static str,
    ) -> Self {
        Self {
            types,
            aliases,
            fallback,
        }
    }

    /// Returns the declared physical types in declaration order.
    #[must_use]
    pub fn provider_types(&self) -> &[ProviderSqlType] {
        &self.types
    }

    /// Forward mapping: logical descriptor to physical SQL type text.
    ///
    /// Scans the declaration-ordered list twice: first for a structurally
    /// compatible entry declared for the exact logical type, then for any
    /// structurally compatible entry in the same affinity group. Declaration
    /// order is the tie-break within each pass, so preferred physical types
    /// must come first. The affinity pass covers only the numeric and
    /// temporal groups (integer widening, missing float widths); text-affine
    /// logical types without a declared entry (uuid, json, object) render
    /// through the dialect's unbounded fallback type, as does anything else
    /// nothing matches. The mapping is total.
    #[must_use]
    pub fn to_physical(&self, desc: &TypeDescriptor, needs_auto_increment: bool) -> String {
        if let Some(provider) = self
            .types
            .iter()
            .find(|t| t.logical == desc.logical && t.is_compatible(desc, needs_auto_increment))
        {
            return provider.render(desc);
        }
        if desc.affinity() != SqlAffinity::Text {
            if let Some(provider) = self
                .types
                .iter()
                .find(|t| t.is_compatible(desc, needs_auto_increment))
            {
                return provider.render(desc);
            }
        }
        self.fallback_type().render(desc)
    }

    /// Reverse mapping: physical SQL type text to a logical descriptor.
    ///
    /// Strips any `(...)` parameter suffix, looks the base name up
    /// case-insensitively, then tries the dialect alias table; anything still
    /// unmatched resolves to [`LogicalType::Object`].
    #[must_use]
    pub fn to_logical(&self, physical: &str) -> TypeDescriptor {
        let (base, params) = split_type_params(physical);
        let base_lower = base.to_ascii_lowercase();

        let provider = self
            .lookup(&base_lower)
            .or_else(|| self.lookup_alias(&base_lower));

        let Some(provider) = provider else {
            return TypeDescriptor::new(LogicalType::Object);
        };

        let mut desc = TypeDescriptor::new(provider.logical);
        desc.unicode = provider.unicode;
        desc.fixed_length = provider.fixed_length;
        match (params.first(), params.get(1)) {
            (Some(&first), Some(&second)) => {
                desc.precision = u8::try_from(first).ok();
                desc.scale = u8::try_from(second).ok();
            }
            (Some(&first), None) => {
                // One parameter means length for text/binary, precision for
                // numerics.
                match provider.affinity {
                    SqlAffinity::Text | SqlAffinity::Binary => desc.length = Some(first),
                    _ => desc.precision = u8::try_from(first).ok(),
                }
            }
            _ => {}
        }
        desc
    }

    fn lookup(&self, base_lower: &str) -> Option<&ProviderSqlType> {
        self.types.iter().find(|t| t.name == base_lower)
    }

    fn lookup_alias(&self, base_lower: &str) -> Option<&ProviderSqlType> {
        let canonical = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == base_lower)
            .map(|(_, canonical)| *canonical)?;
        self.lookup(canonical)
    }

    fn fallback_type(&self) -> &ProviderSqlType {
        // The fallback names a declared entry; the first text type backs it
        // up if a dialect misdeclares.
        self.lookup(self.fallback)
            .or_else(|| self.types.iter().find(|t| t.affinity == SqlAffinity::Text))
            .unwrap_or(&self.types[0])
    }
}

/// Splits `"decimal(10, 2)"` into `("decimal", vec![10, 2])`.
///
/// Unparseable parameters are dropped rather than erroring; reverse mapping
/// is total.
fn split_type_params(physical: &str) -> (&str, Vec<u32>) {
    let trimmed = physical.trim();
    let Some(open) = trimmed.find('(') else {
        return (trimmed, Vec::new());
    };
    let base = trimmed[..open].trim();
    let inner = trimmed[open + 1..].trim_end_matches(')');
    let params = inner
        .split(',')
        .filter_map(|p| p.trim().parse::<u32>().ok())
        .collect();
    (base, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_map() -> TypeMap {
        TypeMap::new(
            vec![
                ProviderSqlType::new("integer", SqlAffinity::Integer, LogicalType::Integer)
                    .max_value(i32::MAX as i128)
                    .auto_increment(),
                ProviderSqlType::new("bigint", SqlAffinity::Integer, LogicalType::BigInt)
                    .max_value(i64::MAX as i128)
                    .auto_increment(),
                ProviderSqlType::new("varchar", SqlAffinity::Text, LogicalType::Text)
                    .with_length("varchar({len})"),
                ProviderSqlType::new("text", SqlAffinity::Text, LogicalType::Text),
                ProviderSqlType::new("decimal", SqlAffinity::Real, LogicalType::Decimal)
                    .with_precision("decimal({p})", "decimal({p}, {s})"),
            ],
            &[("numeric", "decimal")],
            "text",
        )
    }

    #[test]
    fn test_forward_first_match_wins() {
        let map = toy_map();
        let desc = TypeDescriptor::new(LogicalType::Integer);
        assert_eq!(map.to_physical(&desc, false), "integer");
    }

    #[test]
    fn test_forward_integer_capacity() {
        let map = toy_map();
        let desc = TypeDescriptor::new(LogicalType::BigInt);
        // integer is declared first but cannot hold a 64-bit value.
        assert_eq!(map.to_physical(&desc, false), "bigint");
    }

    #[test]
    fn test_forward_length_render() {
        let map = toy_map();
        let desc = TypeDescriptor::new(LogicalType::Text).length(100);
        assert_eq!(map.to_physical(&desc, false), "varchar(100)");
    }

    #[test]
    fn test_forward_precision_scale_render() {
        let map = toy_map();
        let desc = TypeDescriptor::new(LogicalType::Decimal).precision(10).scale(2);
        assert_eq!(map.to_physical(&desc, false), "decimal(10, 2)");
    }

    #[test]
    fn test_forward_unmapped_falls_back_to_text() {
        let map = toy_map();
        let desc = TypeDescriptor::new(LogicalType::Object);
        assert_eq!(map.to_physical(&desc, false), "text");
    }

    #[test]
    fn test_forward_unmapped_prefers_declared_fallback() {
        // The fallback wins even when earlier text entries are compatible.
        let map = TypeMap::new(
            vec![
                ProviderSqlType::new("text", SqlAffinity::Text, LogicalType::Text),
                ProviderSqlType::new("longtext", SqlAffinity::Text, LogicalType::Text),
            ],
            &[],
            "longtext",
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Uuid), false),
            "longtext"
        );
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Json), false),
            "longtext"
        );
        // Declared logical types still resolve by declaration order.
        assert_eq!(
            map.to_physical(&TypeDescriptor::new(LogicalType::Text), false),
            "text"
        );
    }

    #[test]
    fn test_forward_missing_width_widens_within_affinity() {
        let map = toy_map();
        // No smallint entry; the affinity scan lands on integer.
        let desc = TypeDescriptor::new(LogicalType::SmallInt);
        assert_eq!(map.to_physical(&desc, false), "integer");
    }

    #[test]
    fn test_reverse_strips_params() {
        let map = toy_map();
        let desc = map.to_logical("VARCHAR(50)");
        assert_eq!(desc.logical, LogicalType::Text);
        assert_eq!(desc.length, Some(50));
    }

    #[test]
    fn test_reverse_two_params_are_precision_scale() {
        let map = toy_map();
        let desc = map.to_logical("decimal(12, 4)");
        assert_eq!(desc.logical, LogicalType::Decimal);
        assert_eq!(desc.precision, Some(12));
        assert_eq!(desc.scale, Some(4));
    }

    #[test]
    fn test_reverse_alias_fallback() {
        let map = toy_map();
        let desc = map.to_logical("NUMERIC(8, 2)");
        assert_eq!(desc.logical, LogicalType::Decimal);
    }

    #[test]
    fn test_reverse_unknown_defaults_to_object() {
        let map = toy_map();
        let desc = map.to_logical("frobnicator(9000)");
        assert_eq!(desc.logical, LogicalType::Object);
    }

    #[test]
    fn test_split_type_params() {
        assert_eq!(split_type_params("text"), ("text", vec![]));
        assert_eq!(split_type_params(" char (8) "), ("char", vec![8]));
        assert_eq!(split_type_params("decimal(10,2)"), ("decimal", vec![10, 2]));
    }
}
