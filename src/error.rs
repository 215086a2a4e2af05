//! Error types for schema operations.

/// Errors that can occur while synthesizing, executing, or introspecting DDL.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A required identifier was missing or empty.
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument {
        /// The argument that was rejected.
        name: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// The dialect cannot express the requested operation.
    ///
    /// Capability queries never produce this error; it is returned only when
    /// an operation the dialect cannot express is actually attempted.
    #[error("{dialect} does not support {operation}")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// Description of the unsupported operation.
        operation: String,
    },

    /// A dialect method intentionally left unimplemented.
    ///
    /// Distinct from [`SchemaError::Unsupported`]: the engine could express
    /// the operation, but this crate does not implement it for the dialect.
    #[error("Not implemented for {dialect}: {operation}")]
    NotImplemented {
        /// Dialect name.
        dialect: &'static str,
        /// Description of the unimplemented operation.
        operation: String,
    },

    /// Existing DDL text could not be parsed into a schema model.
    #[error("Failed to parse DDL: {message}\n  offending SQL: {sql}")]
    Parse {
        /// The DDL text that could not be parsed.
        sql: String,
        /// What went wrong.
        message: String,
    },

    /// An invariant of the schema model was violated.
    #[error("Invalid schema model: {0}")]
    InvalidModel(String),

    /// Database error while executing a statement or query.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SchemaError {
    /// Creates an [`SchemaError::InvalidArgument`] for a missing identifier.
    pub(crate) fn empty_identifier(name: &'static str) -> Self {
        Self::InvalidArgument {
            name,
            message: "identifier must not be empty".to_string(),
        }
    }

    /// Creates an [`SchemaError::Unsupported`] error.
    pub(crate) fn unsupported(dialect: &'static str, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            operation: operation.into(),
        }
    }

    /// Creates an [`SchemaError::Parse`] error carrying the offending text.
    pub(crate) fn parse(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            sql: sql.into(),
            message: message.into(),
        }
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
