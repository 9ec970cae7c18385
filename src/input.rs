//! Command line data items.
//!
//! Payloads are given as a list of items:
//!
//! | item | result |
//! |------|--------|
//! | `name=foo` | `{"name": "foo"}` (always a string) |
//! | `num:=2` | `{"num": 2}` (value parsed as JSON) |
//! | `'{"name": "foo"}'` | the object itself, only as the sole item |

use serde_json::{Map, Value};

use crate::error::InputError;
use crate::types::json_type_name;

/// Delimiters in matching order. `:=` goes first since it contains `=`.
const DELIMITERS: [&str; 2] = [":=", "="];

/// Find the delimiter of `item`, if any.
///
/// # Errors
///
/// Returns `InputError::DanglingDelimiter` when the delimiter starts or ends
/// the item and `InputError::RepeatedDelimiter` when it appears twice.
fn delimiter_of(item: &str) -> Result<Option<&'static str>, InputError> {
    for delimiter in DELIMITERS {
        if !item.contains(delimiter) {
            continue;
        }
        if item.starts_with(delimiter) || item.ends_with(delimiter) {
            return Err(InputError::DanglingDelimiter {
                delimiter: delimiter.to_string(),
                item: item.to_string(),
            });
        }
        if item.matches(delimiter).count() > 1 {
            return Err(InputError::RepeatedDelimiter {
                delimiter: delimiter.to_string(),
                item: item.to_string(),
            });
        }
        return Ok(Some(delimiter));
    }
    Ok(None)
}

fn parse_item(item: &str) -> Result<(String, Value), InputError> {
    let delimiter = delimiter_of(item)?.ok_or_else(|| InputError::MissingDelimiter {
        item: item.to_string(),
    })?;
    let (key, raw) = item
        .split_once(delimiter)
        .ok_or_else(|| InputError::MissingDelimiter {
            item: item.to_string(),
        })?;

    let value = if delimiter == "=" {
        Value::String(raw.to_string())
    } else {
        serde_json::from_str(raw).map_err(|source| InputError::InvalidJson {
            item: item.to_string(),
            source,
        })?
    };
    Ok((key.to_string(), value))
}

/// Parse a JSON object from text.
///
/// # Errors
///
/// Returns `InputError::InvalidJson` for malformed text and
/// `InputError::NotAnObject` for any other JSON value.
pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, InputError> {
    let value: Value = serde_json::from_str(text).map_err(|source| InputError::InvalidJson {
        item: text.to_string(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(InputError::NotAnObject {
            actual: json_type_name(&other).to_string(),
        }),
    }
}

/// Assemble data items into one JSON object. Later keys win.
pub fn parse_items<S: AsRef<str>>(items: &[S]) -> Result<Map<String, Value>, InputError> {
    if let [single] = items {
        let single = single.as_ref();
        if delimiter_of(single)?.is_none() {
            return parse_json_object(single);
        }
    }

    let mut data = Map::new();
    for item in items {
        let (key, value) = parse_item(item.as_ref())?;
        data.insert(key, value);
    }
    Ok(data)
}
