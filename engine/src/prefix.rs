//! Section key prefixes.
//!
//! Export fields carry a literal section prefix (`f_mh_` for mash header
//! fields, `f_h_` for hops, ...). These helpers strip it. Bad input is
//! reported as a `warn` event and otherwise ignored, so a malformed section
//! never stops a recipe, or a replay, from being processed.

use serde_json::{Map, Value};

/// Recipe top-level fields.
pub const RECIPE: &str = "f_r_";
/// Mash header fields.
pub const MASH: &str = "f_mh_";
/// Mash step fields.
pub const MASH_STEP: &str = "f_ms_";
pub const EQUIPMENT: &str = "f_e_";
pub const STYLE: &str = "f_s_";
pub const CARB: &str = "f_c_";
/// Base grain fields; shares the grain ingredient prefix.
pub const BASE_GRAIN: &str = "f_g_";
/// Fermentation profile fields.
pub const AGE: &str = "f_a_";
/// Fermentation reading fields.
pub const AGE_DATA: &str = "f_ad_";

/// Copy `node` into `into`, removing `prefix` from every key that has it.
///
/// Keys without the prefix are copied unchanged; later keys overwrite
/// earlier ones on collision. A non-mapping `node` leaves `into` untouched.
pub fn strip_into(prefix: &str, node: &Value, into: &mut Map<String, Value>) {
    match node {
        Value::Object(fields) => {
            for (key, value) in fields {
                let key = key.strip_prefix(prefix).unwrap_or(key);
                into.insert(key.to_string(), value.clone());
            }
        }
        other => {
            tracing::warn!(
                prefix,
                "cannot strip key prefixes from {} node",
                kind_of(other)
            );
        }
    }
}

/// Strip `prefix` from the keys of a section node into a fresh mapping.
pub fn strip(prefix: &str, node: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    strip_into(prefix, node, &mut out);
    out
}

/// Strip `prefix` from a mapping that is already known to be one.
pub fn strip_map(prefix: &str, fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| match key.strip_prefix(prefix) {
            Some(stripped) => (stripped.to_string(), value),
            None => (key, value),
        })
        .collect()
}

/// Re-key every element of a run of like records independently.
pub fn strip_each<I>(prefix: &str, records: I) -> Vec<Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    records
        .into_iter()
        .map(|record| Value::Object(strip_map(prefix, record)))
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
