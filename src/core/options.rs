//! The typed application configuration.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Bind address used when no fragment sets `server.bind`.
pub const DEFAULT_BIND: &str = ":8080";

/// Typed configuration shape.
///
/// Every section defaults, so partial documents decode.
///
/// ```yaml
/// welcome:
///   title: Hello
///   messages: [first, second]
///   tail: bye
/// server:
///   bind: ":8080"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Greeting section.
    pub welcome: Welcome,
    /// Network section.
    pub server: Server,
}

/// Greeting section of [`Options`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Welcome {
    /// Title line.
    pub title: String,
    /// Message lines, replaced wholesale by later fragments.
    pub messages: Vec<String>,
    /// Closing line.
    pub tail: String,
}

/// Network section of [`Options`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    /// Listen address such as `:8080` or `0.0.0.0:9000`.
    pub bind: String,
}

impl Options {
    /// Fill fields still empty after the merge cascade.
    pub fn apply_defaults(&mut self) {
        if self.server.bind.is_empty() {
            self.server.bind = DEFAULT_BIND.to_string();
        }
    }

    /// Render as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to render options as JSON: {}", e)))
    }
}
