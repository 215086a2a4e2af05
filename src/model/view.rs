//! View entity.

use serde::{Deserialize, Serialize};

/// A database view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Schema name, when the dialect has schemas.
    pub schema: Option<String>,
    /// View name.
    pub name: String,
    /// The view body: a `SELECT ...` with no leading `AS` or
    /// `CREATE VIEW` boilerplate.
    pub definition: String,
}

impl View {
    /// Creates a view, normalizing the definition text.
    #[must_use]
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            definition: normalize_definition(&definition.into()),
        }
    }

    /// Sets the schema name.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Strips `CREATE VIEW ... AS` boilerplate and a leading `AS` keyword so a
/// definition from any source reduces to the bare `SELECT`.
#[must_use]
pub fn normalize_definition(definition: &str) -> String {
    let trimmed = definition.trim().trim_end_matches(';').trim();
    let upper = trimmed.to_ascii_uppercase();

    if upper.starts_with("CREATE") {
        // Catalogs that store the full statement: cut at the first
        // top-level AS keyword.
        if let Some(pos) = find_keyword(&upper, "AS") {
            return trimmed[pos + 2..].trim().to_string();
        }
    }
    if upper.starts_with("AS") && upper[2..].starts_with(char::is_whitespace) {
        return trimmed[2..].trim().to_string();
    }
    trimmed.to_string()
}

/// Finds a whole-word keyword outside of quotes; returns its byte offset.
fn find_keyword(upper: &str, keyword: &str) -> Option<usize> {
    let bytes = upper.as_bytes();
    let mut in_quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = in_quote {
            if b == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        if b == b'\'' || b == b'"' || b == b'`' {
            in_quote = Some(b);
            i += 1;
            continue;
        }
        if upper[i..].starts_with(keyword) {
            let before_ok = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
            let after = i + keyword.len();
            let after_ok = after >= bytes.len() || !bytes[after].is_ascii_alphanumeric();
            if before_ok && after_ok {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}
