use serde_json::{Map, Value};

/// Flatten a business `attributes` object into `(name, value)` leaves.
///
/// Nested objects (e.g. `BusinessParking`) contribute their own keys; the
/// parent key is dropped. Strings are returned unquoted, other scalars in
/// their JSON form, and `null` as an empty string.
pub fn flatten_attributes(attrs: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect(attrs, &mut out);
    out
}

fn collect(attrs: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in attrs {
        match value {
            Value::Object(inner) => collect(inner, out),
            Value::String(s) => out.push((key.clone(), s.clone())),
            Value::Null => out.push((key.clone(), String::new())),
            other => out.push((key.clone(), other.to_string())),
        }
    }
}
