//! Defaulting lookups over loosely-typed JSON.
//!
//! Each helper resolves one leaf independently: a missing step anywhere on the
//! path yields the field default instead of an error, so one absent field never
//! affects its siblings. `null` is treated as absent throughout.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Walks `path` through objects (and arrays, for numeric segments).
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// String/identity leaf. Numbers are rendered as text, empty strings are absent.
pub fn text(value: &Value, path: &[&str]) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-negative counter leaf, defaulting to 0. Numeric strings are accepted.
pub fn count(value: &Value, path: &[&str]) -> u64 {
    match lookup(value, path) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

/// Boolean leaf, defaulting to `false`. A numeric `1` counts as true.
pub fn flag(value: &Value, path: &[&str]) -> bool {
    match lookup(value, path) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// List of string leaves; non-string entries are skipped.
pub fn text_list(value: &Value, path: &[&str]) -> Vec<String> {
    match lookup(value, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// Array leaf as a slice; absent or non-array values give an empty slice.
pub fn items<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    match lookup(value, path) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Epoch-seconds leaf converted to ISO-8601 (`2024-01-02T03:04:05.000Z`).
///
/// Zero, negative or unparsable values are absent.
pub fn epoch_to_iso(value: &Value, path: &[&str]) -> Option<String> {
    let seconds = match lookup(value, path)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    if seconds <= 0 {
        return None;
    }
    let at: DateTime<Utc> = DateTime::from_timestamp(seconds, 0)?;
    Some(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn dotted(path: &[&str]) -> String {
    path.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_steps_fall_back_to_defaults() {
        let value = json!({"a": {"b": null, "n": 3}});
        assert_eq!(text(&value, &["a", "b"]), None);
        assert_eq!(text(&value, &["a", "x", "y"]), None);
        assert_eq!(count(&value, &["a", "missing"]), 0);
        assert!(!flag(&value, &["nope"]));
        assert_eq!(count(&value, &["a", "n"]), 3);
    }

    #[test]
    fn numeric_strings_and_numbers_are_interchangeable() {
        let value = json!({"id": 7263, "plays": "1200", "empty": ""});
        assert_eq!(text(&value, &["id"]).as_deref(), Some("7263"));
        assert_eq!(count(&value, &["plays"]), 1200);
        assert_eq!(text(&value, &["empty"]), None);
    }

    #[test]
    fn array_segments_are_indexed() {
        let value = json!({"list": [{"name": "first"}, {"name": "second"}]});
        assert_eq!(text(&value, &["list", "1", "name"]).as_deref(), Some("second"));
        assert_eq!(items(&value, &["list"]).len(), 2);
        assert!(items(&value, &["list", "0"]).is_empty());
    }

    #[test]
    fn epoch_seconds_render_as_iso() {
        let value = json!({"t": 1_700_000_000, "s": "1700000000", "zero": 0});
        assert_eq!(
            epoch_to_iso(&value, &["t"]).as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
        assert_eq!(epoch_to_iso(&value, &["s"]), epoch_to_iso(&value, &["t"]));
        assert_eq!(epoch_to_iso(&value, &["zero"]), None);
    }
}
