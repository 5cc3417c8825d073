//! Best-effort numeric promotion of string scalars.
//!
//! Every exported field is text. Anything that reads as a finite number is
//! promoted, whole numbers narrow to integers, and everything else is left
//! exactly as it was.

use serde_json::{Map, Number, Value};

/// Promote a single scalar. Non-strings are returned unchanged.
pub fn coerce_scalar(value: &Value) -> Value {
    match value {
        Value::String(text) => parse_number(text)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// Promote every scalar in a tree of mappings and sequences.
pub fn coerce(value: Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(coerce_map(fields, &[])),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce).collect()),
        scalar => coerce_scalar(&scalar),
    }
}

/// Promote a record's fields, leaving the keys named in `skip` untouched.
pub fn coerce_map(fields: Map<String, Value>, skip: &[&str]) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            if skip.contains(&key.as_str()) {
                (key, value)
            } else {
                (key, coerce(value))
            }
        })
        .collect()
}

/// Read a value as an integer enumeration code.
pub fn as_code(value: &Value) -> Option<i64> {
    match coerce_scalar(value) {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<Number> {
    let parsed: f64 = text.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed.fract() == 0.0 && parsed >= i64::MIN as f64 && parsed < i64::MAX as f64 {
        return Some(Number::from(parsed as i64));
    }
    Number::from_f64(parsed)
}
