//! Request validation: turns an inbound request body into a [`GeocodeQuery`].
//!
//! Validation never touches the resolution engine, so a rejected request
//! costs nothing beyond parsing its body.

use serde_json::Value;
use thiserror::Error;

/// Longest address (in characters) accepted from a caller.
pub const MAX_ADDRESS_CHARS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The `address` field is absent, null, not a string, or blank.
    #[error("address is required")]
    MissingAddress,

    #[error("address exceeds {max} characters")]
    TooLong { max: usize },
}

/// A validated, normalized address query. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery(String);

impl GeocodeQuery {
    /// Validate a raw request body of the shape `{"address": "<string>"}`.
    ///
    /// Bodies that are not JSON objects are treated as objects without an
    /// `address` field.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the address is missing, blank, or too long.
    pub fn from_body(body: &[u8]) -> Result<Self, QueryError> {
        let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        match value.get("address") {
            Some(Value::String(address)) => Self::parse(address),
            _ => Err(QueryError::MissingAddress),
        }
    }

    /// Validate a bare address string.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the address is blank or too long.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let normalized = collapse_line_breaks(raw.trim());
        if normalized.is_empty() {
            return Err(QueryError::MissingAddress);
        }
        if normalized.chars().count() > MAX_ADDRESS_CHARS {
            return Err(QueryError::TooLong {
                max: MAX_ADDRESS_CHARS,
            });
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl std::fmt::Display for GeocodeQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// The engine reads one query per stdin line.
fn collapse_line_breaks(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_break = false;
    for c in s.chars() {
        if c == '\r' || c == '\n' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(c);
            in_break = false;
        }
    }
    out
}
