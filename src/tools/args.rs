//! Tool argument extraction.
//!
//! Arguments arrive as a JSON object. Empty strings count as missing, the
//! same as absent keys and `null`.

use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Reads a ticker symbol: trimmed and upper-cased, `None` when missing or
/// blank.
pub fn symbol(arguments: &Map<String, Value>, key: &str) -> Option<String> {
    text(arguments, key)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
}

/// Reads a non-empty string.
pub fn text<'a>(arguments: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Reads a boolean flag, falling back to `default` when absent or `null`.
///
/// # Errors
///
/// Returns a message naming the key if the value is not a boolean.
pub fn flag(arguments: &Map<String, Value>, key: &str, default: bool) -> Result<bool, String> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(value)) => Ok(*value),
        Some(_) => Err(format!("'{key}' must be a boolean (true or false)")),
    }
}

/// Reads an integer in `min..=max`, falling back to `default` when absent or
/// `null`.
///
/// # Errors
///
/// Returns `message` if the value is not an integer or is out of range.
pub fn bounded_integer(
    arguments: &Map<String, Value>,
    key: &str,
    (min, max): (i64, i64),
    default: i64,
    message: &str,
) -> Result<i64, String> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_i64()
            .filter(|n| (min..=max).contains(n))
            .ok_or_else(|| message.to_string()),
    }
}

/// Parses a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns a message including the parser's complaint.
pub fn date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date format. Use YYYY-MM-DD format. Error: {e}"))
}
