//! Provider construction parameters read from environment variables.

use super::{FileProvider, Provider};
use crate::error::{ConfigError, Result};
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default file path for the file source.
pub const DEFAULT_FILE_PATH: &str = "./config.yaml";

/// Default etcd dial timeout in milliseconds.
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 5000;

const DEFAULT_NACOS_GROUP: &str = "DEFAULT_GROUP";

/// Which provider variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// Local YAML file.
    #[default]
    File,
    /// etcd key.
    Etcd,
    /// Nacos data id.
    Nacos,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "file" => Ok(Self::File),
            "etcd" => Ok(Self::Etcd),
            "nacos" => Ok(Self::Nacos),
            other => Err(ConfigError::ValidationError(format!(
                "unknown config source '{}' (expected file, etcd or nacos)",
                other
            ))),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Etcd => write!(f, "etcd"),
            Self::Nacos => write!(f, "nacos"),
        }
    }
}

/// File source parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSettings {
    /// Path to the YAML document.
    pub path: PathBuf,
}

/// etcd source parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdSettings {
    /// Endpoint addresses.
    pub endpoints: Vec<String>,
    /// Key holding the YAML document.
    pub key: String,
    /// Optional username.
    pub username: Option<String>,
    /// Optional password.
    pub password: Option<String>,
    /// Connect timeout.
    pub dial_timeout: Duration,
}

/// Nacos source parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NacosSettings {
    /// `host:port` server addresses.
    pub servers: Vec<String>,
    /// Namespace id, empty for the public namespace.
    pub namespace: String,
    /// Group of the data id.
    pub group: String,
    /// Data id holding the YAML document.
    pub data_id: String,
}

/// Everything needed to build a [`Provider`].
///
/// Read from environment variables with [`SourceSettings::from_env`]. With
/// prefix `APP` the recognised variables are:
///
/// | Variable | Default |
/// |---|---|
/// | `APP_SOURCE` | `file` |
/// | `APP_FILE__PATH` | `./config.yaml` |
/// | `APP_ETCD__ENDPOINTS` (comma separated) | empty |
/// | `APP_ETCD__KEY` | empty |
/// | `APP_ETCD__USERNAME` / `APP_ETCD__PASSWORD` | unset |
/// | `APP_ETCD__DIAL_TIMEOUT_MS` | `5000` |
/// | `APP_NACOS__SERVERS` (comma separated) | empty |
/// | `APP_NACOS__NAMESPACE` | empty |
/// | `APP_NACOS__GROUP` | `DEFAULT_GROUP` |
/// | `APP_NACOS__DATA_ID` | empty |
///
/// # Examples
///
/// ```rust,no_run
/// use config_loader::sources::SourceSettings;
///
/// # fn example() -> config_loader::error::Result<()> {
/// let provider = SourceSettings::from_env("APP")?.into_provider()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Selected variant.
    pub source: SourceKind,
    /// File parameters.
    pub file: FileSettings,
    /// etcd parameters.
    pub etcd: EtcdSettings,
    /// Nacos parameters.
    pub nacos: NacosSettings,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            source: SourceKind::File,
            file: FileSettings {
                path: PathBuf::from(DEFAULT_FILE_PATH),
            },
            etcd: EtcdSettings {
                endpoints: Vec::new(),
                key: String::new(),
                username: None,
                password: None,
                dial_timeout: Duration::from_millis(DEFAULT_DIAL_TIMEOUT_MS),
            },
            nacos: NacosSettings {
                servers: Vec::new(),
                namespace: String::new(),
                group: DEFAULT_NACOS_GROUP.to_string(),
                data_id: String::new(),
            },
        }
    }
}

// Shape of the variables as the `config` crate sees them; lists stay raw strings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    source: String,
    file: RawFile,
    etcd: RawEtcd,
    nacos: RawNacos,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFile {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEtcd {
    endpoints: String,
    key: String,
    username: Option<String>,
    password: Option<String>,
    dial_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNacos {
    servers: String,
    namespace: String,
    group: Option<String>,
    data_id: String,
}

impl SourceSettings {
    /// Read settings from the process environment.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_source(prefix, None)
    }

    /// Read settings from an explicit variable map instead of the process environment.
    pub fn from_vars(prefix: &str, vars: HashMap<String, String>) -> Result<Self> {
        Self::from_source(prefix, Some(vars))
    }

    fn from_source(prefix: &str, vars: Option<HashMap<String, String>>) -> Result<Self> {
        let env_source = Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
            .source(vars);

        let raw: RawSettings = Config::builder()
            .add_source(env_source)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Failed to read {}_* environment settings: {}",
                    prefix, e
                ))
            })?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            source: raw.source.parse()?,
            file: FileSettings {
                path: raw
                    .file
                    .path
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or(defaults.file.path),
            },
            etcd: EtcdSettings {
                endpoints: split_list(&raw.etcd.endpoints),
                key: raw.etcd.key,
                username: raw.etcd.username.filter(|s| !s.is_empty()),
                password: raw.etcd.password.filter(|s| !s.is_empty()),
                dial_timeout: raw
                    .etcd
                    .dial_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.etcd.dial_timeout),
            },
            nacos: NacosSettings {
                servers: split_list(&raw.nacos.servers),
                namespace: raw.nacos.namespace,
                group: raw
                    .nacos
                    .group
                    .filter(|g| !g.trim().is_empty())
                    .unwrap_or(defaults.nacos.group),
                data_id: raw.nacos.data_id,
            },
        })
    }

    /// Build the selected provider.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FeatureNotEnabled`] if the selected variant was compiled out.
    pub fn into_provider(self) -> Result<Arc<dyn Provider>> {
        match self.source {
            SourceKind::File => Ok(Arc::new(FileProvider::new(self.file.path))),
            SourceKind::Etcd => build_etcd(self.etcd),
            SourceKind::Nacos => build_nacos(self.nacos),
        }
    }
}

#[cfg(feature = "etcd")]
fn build_etcd(settings: EtcdSettings) -> Result<Arc<dyn Provider>> {
    let provider = super::EtcdProvider::new(settings.endpoints, settings.key)
        .with_credentials(
            settings.username.unwrap_or_default(),
            settings.password.unwrap_or_default(),
        )
        .with_dial_timeout(settings.dial_timeout);
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "etcd"))]
fn build_etcd(_settings: EtcdSettings) -> Result<Arc<dyn Provider>> {
    Err(ConfigError::FeatureNotEnabled("etcd"))
}

#[cfg(feature = "nacos")]
fn build_nacos(settings: NacosSettings) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(super::NacosProvider::new(
        settings.servers,
        settings.namespace,
        settings.group,
        settings.data_id,
    )))
}

#[cfg(not(feature = "nacos"))]
fn build_nacos(_settings: NacosSettings) -> Result<Arc<dyn Provider>> {
    Err(ConfigError::FeatureNotEnabled("nacos"))
}

/// Split a comma separated list, trimming items and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
