//! Request payload helpers
//!
//! Bodies are loose JSON objects; only key presence is checked.

use serde_json::{Map, Value};

use crate::error::{ServiceError, ServiceResult};

pub type Payload = Map<String, Value>;

/// Parse a body as a JSON object. Anything else counts as "no payload".
pub fn parse(body: &[u8]) -> Option<Payload> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// `null`, `false`, zero, and empty strings/arrays/objects are all "empty"
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Extract a non-empty `file` name plus the endpoint's second required field.
///
/// Checks run in order: `file` present and non-empty, then `field` present,
/// then `file` is a string. Each failure echoes what is known of `file`.
pub fn require_file_and<'a>(
    payload: Option<&'a Payload>,
    field: &str,
) -> ServiceResult<(&'a str, &'a Value)> {
    let file = payload
        .and_then(|p| p.get("file"))
        .filter(|v| is_truthy(v))
        .ok_or(ServiceError::InvalidFileInput { file: Value::Null })?;

    let invalid = || ServiceError::InvalidFileInput { file: file.clone() };

    let other = payload.and_then(|p| p.get(field)).ok_or_else(invalid)?;
    let name = file.as_str().ok_or_else(invalid)?;

    Ok((name, other))
}
