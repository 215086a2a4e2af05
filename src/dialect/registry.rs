//! Global dialect registry, keyed by sqlx connection type.
//!
//! The registry seeds itself with the built-in dialects and lets callers
//! swap in a customized implementation per connection type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use sqlx::mysql::MySqlConnection;
use sqlx::postgres::PgConnection;
use sqlx::sqlite::SqliteConnection;
use tracing::debug;

use crate::error::{Result, SchemaError};

use super::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};

type Registry = HashMap<TypeId, Arc<dyn Dialect>>;

static DIALECTS: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(defaults()));

fn defaults() -> Registry {
    let mut map: Registry = HashMap::new();
    map.insert(TypeId::of::<SqliteConnection>(), Arc::new(SqliteDialect::new()));
    map.insert(TypeId::of::<PgConnection>(), Arc::new(PostgresDialect::new()));
    map.insert(TypeId::of::<MySqlConnection>(), Arc::new(MySqlDialect::new()));
    map
}

/// Resolves the dialect registered for the given connection type.
pub fn dialect_for<C: Any>() -> Result<Arc<dyn Dialect>> {
    let registry = DIALECTS.read().unwrap_or_else(std::sync::PoisonError::into_inner);
    registry
        .get(&TypeId::of::<C>())
        .cloned()
        .ok_or_else(|| SchemaError::InvalidArgument {
            name: "connection",
            message: format!(
                "no dialect registered for connection type '{}'",
                std::any::type_name::<C>()
            ),
        })
}

/// Registers (or replaces) the dialect for a connection type.
pub fn register_dialect<C: Any>(dialect: Arc<dyn Dialect>) {
    debug!(dialect = dialect.name(), connection = std::any::type_name::<C>(), "registering dialect");
    let mut registry = DIALECTS
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    registry.insert(TypeId::of::<C>(), dialect);
}

/// Restores the built-in registrations. Intended for tests that replace a
/// dialect and must not leak it into other tests.
pub fn reset_dialects() {
    let mut registry = DIALECTS
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    *registry = defaults();
}
