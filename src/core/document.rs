//! Generic YAML documents: parsing, deep merge and dot-path lookup.

use crate::error::{ConfigError, Result};
use serde_yaml::{Mapping, Value};

/// Parse one payload into a mapping.
///
/// An empty (or comment-only) payload is an empty mapping.
///
/// # Errors
///
/// [`ConfigError::ParseError`] if the text is not YAML or its top level is not a mapping.
pub fn parse_document(payload: &str) -> Result<Mapping> {
    let value: Value = serde_yaml::from_str(payload)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(ConfigError::ParseError(format!(
            "top level must be a mapping, found {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Merge `overlay` onto `base`, key by key.
///
/// Nested mappings merge recursively. Any other value present in `overlay`
/// replaces the one in `base` wholesale, so sequences are never concatenated.
/// Keys absent from `overlay` keep their value from `base`.
///
/// An explicit null clears a sequence or mapping in `base`, so the field
/// decodes to its empty default. A null over a scalar leaves the scalar alone.
pub fn merge_into(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match value {
            Value::Null => {
                if matches!(base.get(&key), Some(Value::Sequence(_) | Value::Mapping(_))) {
                    base.remove(&key);
                }
            }
            Value::Mapping(nested) => match base.get_mut(&key) {
                Some(Value::Mapping(existing)) => merge_into(existing, nested),
                _ => {
                    base.insert(key, Value::Mapping(nested));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Walk a dot-separated path through nested mappings.
///
/// Returns `None` as soon as a segment is missing or the value reached so
/// far is not a mapping.
pub fn lookup<'a>(doc: &'a Mapping, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;

    for segment in segments {
        match current {
            Value::Mapping(mapping) => current = mapping.get(segment)?,
            _ => return None,
        }
    }

    Some(current)
}
