//! Key-bag accessors for loosely shaped source payloads
//!
//! The source renames fields between endpoints and versions. Every lookup
//! goes through a priority-ordered list of candidate keys (dotted for nested
//! objects) and the first populated value wins.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values above this are treated as milliseconds
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Resolves a dotted path such as `user.name`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

/// First candidate that holds a non-blank string
pub fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// First candidate usable as an identifier: a non-blank string or a number
pub fn first_id(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .find_map(id_from_value)
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate holding a non-negative count, numeric or numeric string
pub fn first_count(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .find_map(|v| match v {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

/// First candidate that parses as a timestamp; unparsable values are skipped
pub fn first_timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .find_map(parse_timestamp)
}

/// First candidate that is a non-empty array
pub fn first_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .filter_map(Value::as_array)
        .find(|items| !items.is_empty())
}

/// Parses RFC 3339 strings, epoch seconds and epoch milliseconds
///
/// Returns `None` rather than failing on anything else.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            s.parse::<i64>().ok().and_then(from_epoch)
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }
    if raw >= EPOCH_MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}
