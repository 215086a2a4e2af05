//! Logical and physical SQL type descriptors.
//!
//! A [`LogicalType`] is the dialect-neutral notion of a column type; a
//! physical type is the SQL text a particular engine understands
//! (`VARCHAR(100)`, `NUMERIC(10, 2)`, ...). Each dialect carries an ordered
//! list of [`ProviderSqlType`] descriptors, and the [`TypeMap`] resolves in
//! both directions.

mod mapper;

pub use mapper::{ProviderSqlType, TypeMap};

use serde::{Deserialize, Serialize};

/// Coarse type category used to group interchangeable physical types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlAffinity {
    /// Whole numbers of any width.
    Integer,
    /// Floating point and fixed-point numerics.
    Real,
    /// Character data.
    Text,
    /// Raw byte data.
    Binary,
    /// True/false.
    Boolean,
    /// Dates, times, and timestamps.
    DateTime,
    /// Spatial data.
    Geometry,
}

/// Dialect-neutral column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// True/false.
    Boolean,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single-precision float.
    Real,
    /// Double-precision float.
    Double,
    /// Fixed-point numeric with precision and scale.
    Decimal,
    /// Character data.
    Text,
    /// UUID.
    Uuid,
    /// JSON document.
    Json,
    /// Raw bytes.
    Binary,
    /// Date without time of day.
    Date,
    /// Time of day without date.
    Time,
    /// Date and time.
    DateTime,
    /// Spatial value.
    Geometry,
    /// Anything the engine has no structured representation for.
    ///
    /// Unmapped composite or collection types resolve here; the forward
    /// mapping falls back to the dialect's unbounded text or JSON type.
    Object,
}

impl LogicalType {
    /// Returns the affinity group this logical type belongs to.
    #[must_use]
    pub fn affinity(self) -> SqlAffinity {
        match self {
            Self::Boolean => SqlAffinity::Boolean,
            Self::SmallInt | Self::Integer | Self::BigInt => SqlAffinity::Integer,
            Self::Real | Self::Double | Self::Decimal => SqlAffinity::Real,
            Self::Text | Self::Uuid | Self::Json | Self::Object => SqlAffinity::Text,
            Self::Binary => SqlAffinity::Binary,
            Self::Date | Self::Time | Self::DateTime => SqlAffinity::DateTime,
            Self::Geometry => SqlAffinity::Geometry,
        }
    }

    /// Returns the largest value an integer logical type must hold, if any.
    #[must_use]
    pub(crate) fn integer_max(self) -> Option<i128> {
        match self {
            Self::SmallInt => Some(i128::from(i16::MAX)),
            Self::Integer => Some(i128::from(i32::MAX)),
            Self::BigInt => Some(i128::from(i64::MAX)),
            _ => None,
        }
    }
}

/// A logical type plus the width/precision hints needed to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// The dialect-neutral type.
    pub logical: LogicalType,
    /// Maximum length for text/binary types.
    pub length: Option<u32>,
    /// Total digits for numeric types.
    pub precision: Option<u8>,
    /// Fractional digits for numeric types.
    pub scale: Option<u8>,
    /// Whether a text type must store unicode natively.
    pub unicode: bool,
    /// Whether a text/binary type is fixed-length.
    pub fixed_length: bool,
}

impl TypeDescriptor {
    /// Creates a descriptor with no width hints.
    #[must_use]
    pub fn new(logical: LogicalType) -> Self {
        Self {
            logical,
            length: None,
            precision: None,
            scale: None,
            unicode: false,
            fixed_length: false,
        }
    }

    /// Sets the maximum length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets precision (and clears any stale scale).
    #[must_use]
    pub fn precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets scale.
    #[must_use]
    pub fn scale(mut self, scale: u8) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Marks the type as unicode.
    #[must_use]
    pub fn unicode(mut self) -> Self {
        self.unicode = true;
        self
    }

    /// Marks the type as fixed-length.
    #[must_use]
    pub fn fixed_length(mut self) -> Self {
        self.fixed_length = true;
        self
    }

    /// Returns the affinity group of the underlying logical type.
    #[must_use]
    pub fn affinity(&self) -> SqlAffinity {
        self.logical.affinity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_groups() {
        assert_eq!(LogicalType::BigInt.affinity(), SqlAffinity::Integer);
        assert_eq!(LogicalType::Decimal.affinity(), SqlAffinity::Real);
        assert_eq!(LogicalType::Uuid.affinity(), SqlAffinity::Text);
        assert_eq!(LogicalType::Object.affinity(), SqlAffinity::Text);
        assert_eq!(LogicalType::DateTime.affinity(), SqlAffinity::DateTime);
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = TypeDescriptor::new(LogicalType::Decimal).precision(10).scale(2);
        assert_eq!(desc.precision, Some(10));
        assert_eq!(desc.scale, Some(2));
        assert_eq!(desc.affinity(), SqlAffinity::Real);
    }
}
