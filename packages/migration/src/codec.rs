//! Structured-value codec: stores tree-shaped values as text in a single
//! column so the encoding behaves identically across database engines.
//!
//! `encode`/`decode` are the single source of truth. The migration layer
//! binds values through [`db_value`]/[`from_query_result`]; the ORM layer
//! wraps the same pair in its column-type adapter.

use sea_orm::sea_query::Value;
use sea_orm::{DbErr, QueryResult};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("malformed structured value: {source}")]
pub struct CodecError {
    #[from]
    source: serde_json::Error,
}

/// Encode a structured value for storage. Absence stays absent: `None` is
/// stored as SQL NULL, never as an encoded empty structure.
pub fn encode(value: Option<&JsonValue>) -> Option<String> {
    value.map(JsonValue::to_string)
}

/// Decode a stored column back into a structured value. `None` stays `None`;
/// malformed text is an error, not an empty value.
pub fn decode(text: Option<&str>) -> Result<Option<JsonValue>, CodecError> {
    match text {
        None => Ok(None),
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
    }
}

/// Bind adapter for raw statements in migration and seed code.
pub fn db_value(value: Option<&JsonValue>) -> Value {
    Value::String(encode(value).map(Box::new))
}

/// Read adapter for raw query results in migration and seed code.
pub fn from_query_result(res: &QueryResult, col: &str) -> Result<Option<JsonValue>, DbErr> {
    let raw: Option<String> = res.try_get("", col)?;
    decode(raw.as_deref()).map_err(|e| DbErr::TryIntoErr {
        from: "TEXT",
        into: "serde_json::Value",
        source: Box::new(e),
    })
}
