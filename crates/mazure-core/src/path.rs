//! Dotted-path lookup over JSON values.

use serde_json::Value;

/// Resolve `properties.storageProfile.osDisk` style paths.
///
/// Each segment must land on an object key; a missing key or a non-object
/// intermediate value yields `None`.
pub fn get_path<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Like [`get_path`], returning the value as a non-empty string.
pub fn get_str<'a>(value: &'a Value, dotted: &str) -> Option<&'a str> {
    get_path(value, dotted)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
