//! Decoding fragments into typed values.
//!
//! [`decode_merged`] implements the multi-fragment cascade: every fragment is
//! parsed and deep-merged onto the previous ones in order, then the merged
//! tree is deserialized once. A field set by a later fragment wins; a field a
//! later fragment omits keeps its earlier value.

use super::document::{merge_into, parse_document};
use super::Options;
use crate::error::{ConfigError, Result};
use crate::sources::Content;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Merge `contents` in order and deserialize the result.
///
/// # Errors
///
/// [`ConfigError::ParseError`] naming the offending fragment, or naming the
/// target type when the merged tree does not fit it.
pub fn decode_merged<T>(contents: &[Content]) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut merged = Mapping::new();

    for content in contents {
        let fragment = parse_document(&content.payload).map_err(|e| {
            ConfigError::ParseError(format!("fragment '{}': {}", content.id, e))
        })?;
        merge_into(&mut merged, fragment);
    }

    serde_yaml::from_value(Value::Mapping(merged)).map_err(|e| {
        ConfigError::ParseError(format!(
            "merged configuration does not fit {}: {}",
            std::any::type_name::<T>(),
            e
        ))
    })
}

/// Run the cascade for [`Options`], then apply defaults.
pub fn decode_options(contents: &[Content]) -> Result<Options> {
    let mut options: Options = decode_merged(contents)?;
    options.apply_defaults();
    Ok(options)
}

/// Read and decode one YAML file.
///
/// An empty file decodes like an empty mapping.
///
/// # Errors
///
/// [`ConfigError::EmptyPath`], [`ConfigError::ReadError`] or [`ConfigError::ParseError`].
pub async fn load_file<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyPath);
    }

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

    let value: Value = serde_yaml::from_str(&text)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
    let value = match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };

    serde_yaml::from_value(value)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Load every `*.yaml` / `*.yml` file below `dir`, recursively.
///
/// Keys are bare file names, so a name seen twice in different directories
/// keeps whichever file was read last.
pub async fn load_dir(dir: impl AsRef<Path>) -> Result<BTreeMap<String, Mapping>> {
    let mut out = BTreeMap::new();
    let mut pending: Vec<PathBuf> = vec![dir.as_ref().to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", current.display(), e)))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
                continue;
            }
            if !is_yaml(&path) {
                continue;
            }

            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
            let document = parse_document(&text)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

            out.insert(entry.file_name().to_string_lossy().into_owned(), document);
        }
    }

    Ok(out)
}
