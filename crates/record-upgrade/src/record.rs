use serde_json::{Map, Value};

use crate::error::StepError;

/// The in-memory form of one persisted item: an ordered field → value map.
///
/// Type name and schema version travel beside the record, never inside it.
pub type Record = Map<String, Value>;

/// Name of a JSON value's kind, for diagnostics.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read a string field, treating absence as `None`.
///
/// A present field of any other kind is a malformed record for a step that
/// expects a string.
pub fn get_str<'a>(record: &'a Record, field: &str) -> Result<Option<&'a str>, StepError> {
    match record.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(StepError::UnexpectedType {
            field: field.to_string(),
            expected: "string",
            found: kind_of(other),
        }),
    }
}

/// Read an array field, treating absence as `None`.
pub fn get_array<'a>(record: &'a Record, field: &str) -> Result<Option<&'a Vec<Value>>, StepError> {
    match record.get(field) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(StepError::UnexpectedType {
            field: field.to_string(),
            expected: "array",
            found: kind_of(other),
        }),
    }
}
