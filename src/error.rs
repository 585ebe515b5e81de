//! Error types for config-loader.

/// Result type alias for config-loader operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or watching configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No source path was configured.
    #[error("Configuration path is empty")]
    EmptyPath,

    /// Reading from the file system or the network failed.
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    /// The payload is not well-formed YAML or does not fit the target shape.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// The source was reachable but produced no configuration fragments.
    #[error("No configuration content from source '{0}'")]
    EmptyContent(String),

    /// The backend client could not be constructed.
    #[error("Failed to connect to configuration backend: {0}")]
    ConnectError(String),

    /// Setting up change notifications failed.
    #[error("Failed to register configuration watch: {0}")]
    WatchRegistration(String),

    /// A setting is outside the values the crate accepts.
    #[error("Invalid configuration setting: {0}")]
    ValidationError(String),

    /// Attempted to use a provider that was compiled out.
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(&'static str),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::ReadError(err.to_string())
    }
}
