// src/core/escape.rs

//! Escaping of values for use as a single shell token.
//!
//! The result is meant to be placed between a pair of single quotes, e.g.
//! `--foo='RESULT'` or `-f 'RESULT'`. Strings are escaped as-is; every other value
//! is first encoded as compact JSON, so nested strings keep their double quotes.

use serde::Serialize;
use thiserror::Error;

/// Why a value could not be escaped.
#[derive(Error, Debug)]
pub enum EscapeError {
    /// The value has no JSON representation.
    #[error("The provided value could not be serialized into a JSON string: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Escapes any serializable value for substitution between single quotes.
///
/// A top-level string is used verbatim, which makes `escape(&4)` and `escape("4")`
/// produce the same result.
///
/// # Errors
/// Returns [`EscapeError::Serialization`] when the value cannot be encoded as JSON
/// (for instance a map with non-string keys, or a `Serialize` impl that refuses
/// a cyclic structure).
pub fn escape<T: Serialize + ?Sized>(value: &T) -> Result<String, EscapeError> {
    let raw = serde_json::to_string(value)?;
    if raw.starts_with('"') {
        let unquoted: String = serde_json::from_str(&raw)?;
        return Ok(escape_str(&unquoted));
    }
    Ok(escape_str(&raw))
}

/// Escapes a string: each `'` becomes `'\''` (close quote, escaped quote, reopen).
pub fn escape_str(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Like [`escape`], but also adds the surrounding single quotes.
pub fn quote<T: Serialize + ?Sized>(value: &T) -> Result<String, EscapeError> {
    escape(value).map(|escaped| format!("'{}'", escaped))
}
