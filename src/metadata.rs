//! Metadata normalization for loader output.
//!
//! Document loaders attach arbitrary metadata to the blocks they produce:
//! nested objects, arrays, nulls. Storage and indexing only handle flat
//! primitive values, so every value is reduced to a string, integer, float,
//! or boolean before it goes anywhere else.
//!
//! Transformation rules, applied per key independently:
//!
//! - string / integer / float / boolean pass through unchanged
//! - arrays become their string rendering
//! - nested objects are serialized to JSON text; if serialization fails the
//!   value degrades to its generic string rendering
//! - anything else (including null) becomes its generic string rendering
//!
//! This function never fails and never panics: a problem with one key
//! degrades that key's value to a string and leaves the rest of the map
//! untouched.

use serde_json::{Map, Value};

/// Reduce an arbitrary metadata mapping to flat primitive values.
pub fn normalize(input: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(input.len());
    for (key, value) in input {
        out.insert(key.clone(), normalize_value(value));
    }
    out
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => value.clone(),
        Value::Array(_) => Value::String(value.to_string()),
        Value::Object(_) => Value::String(
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string()),
        ),
        Value::Null => Value::String(value.to_string()),
    }
}
