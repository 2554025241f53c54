//! Row access for the view engine
//!
//! The engine never assumes a fixed row shape. Everything it needs from a
//! row goes through [`Record`]: a field lookup by dot path, the values the
//! global search looks at, and a key used to recognise the same row again.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::cmp::Ordering;

/// Date formats accepted for date filters, tried in order after RFC 3339
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// A row the view engine can filter, sort and select
pub trait Record: Clone {
    /// Value at a dot-separated path (`address.city`).
    /// `None` means the field is absent on this row.
    fn field(&self, path: &str) -> Option<Value>;

    /// Values the global search matches against
    fn search_values(&self) -> Vec<Value>;

    /// Identity of the row inside a selection partition
    fn row_key(&self) -> String;
}

impl Record for Value {
    fn field(&self, path: &str) -> Option<Value> {
        path_value(self, path).cloned()
    }

    /// Every leaf of the record. Nested objects contribute their leaves
    /// rather than a serialized blob.
    fn search_values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        collect_leaves(self, &mut values);
        values
    }

    fn row_key(&self) -> String {
        self.to_string()
    }
}

fn collect_leaves(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            for child in map.values() {
                collect_leaves(child, out);
            }
        }
        other => out.push(other.clone()),
    }
}

/// Walk a dot path through nested objects
pub fn path_value<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(row, |current, key| current.as_object()?.get(key))
}

/// String form used by substring matching.
/// `null` has no string form and never matches.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(format_number(n)),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| display_value(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // Integral floats print without a trailing ".0"
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Equality where `1` and `1.0` are the same value
pub fn values_loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Total order over JSON values used to sort option lists.
/// Null < Bool < Number < String < Array < Object.
pub fn order_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Interpret a field value as a point in time.
///
/// Numbers are epoch milliseconds. Strings may be RFC 3339, ISO-like
/// date-times, or plain dates (`2024-03-01`, `03/01/2024`).
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

pub fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_value_walks_nested_objects() {
        let row = json!({"name": "Neon", "address": {"city": "Anytown", "zip": "12345"}});
        assert_eq!(path_value(&row, "address.city"), Some(&json!("Anytown")));
        assert_eq!(path_value(&row, "name"), Some(&json!("Neon")));
        assert_eq!(path_value(&row, "address.street"), None);
        assert_eq!(path_value(&row, "name.first"), None);
        assert_eq!(path_value(&row, ""), None);
    }

    #[test]
    fn test_display_value_formats_like_a_table_cell() {
        assert_eq!(display_value(&json!(12)), Some("12".to_string()));
        assert_eq!(display_value(&json!(4.0)), Some("4".to_string()));
        assert_eq!(display_value(&json!(1.0079)), Some("1.0079".to_string()));
        assert_eq!(display_value(&json!(true)), Some("true".to_string()));
        assert_eq!(display_value(&json!(["a", 1])), Some("a,1".to_string()));
        assert_eq!(display_value(&Value::Null), None);
    }

    #[test]
    fn test_search_values_flattens_nested_leaves() {
        let row = json!({"name": "Neon", "prefs": {"mail": {"email": true}}});
        let values = row.search_values();
        assert_eq!(values.len(), 2);
        assert!(values.contains(&json!("Neon")));
        assert!(values.contains(&json!(true)));
    }

    #[test]
    fn test_loose_equality_across_number_representations() {
        assert!(values_loosely_equal(&json!(1), &json!(1.0)));
        assert!(!values_loosely_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp(&json!("2025-03-01")), Some(expected));
        assert_eq!(parse_timestamp(&json!("03/01/2025")), Some(expected));
        assert_eq!(
            parse_timestamp(&json!("2025-03-01T00:00:00Z")),
            Some(expected)
        );
        assert!(parse_timestamp(&json!("not a date")).is_none());
        assert!(parse_timestamp(&json!(true)).is_none());
    }
}
