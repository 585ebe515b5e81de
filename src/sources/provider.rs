//! Configuration provider trait.

use crate::error::Result;
use crate::notify::ChangeStream;
use async_trait::async_trait;

/// One raw configuration fragment produced by a provider.
///
/// `id` is source specific (file path, etcd key, Nacos data id) and `group` is
/// a coarse namespace tag such as `"file"`, `"etcd"` or the Nacos group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    /// Source-specific identifier of the fragment.
    pub id: String,
    /// Namespace tag of the fragment.
    pub group: String,
    /// Raw YAML text.
    pub payload: String,
}

impl Content {
    /// Create a new content fragment.
    pub fn new(id: impl Into<String>, group: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
            payload: payload.into(),
        }
    }
}

/// Trait for configuration sources.
///
/// A provider fetches the current configuration fragments on demand and can
/// register for change notifications. The crate ships three variants:
/// [`FileProvider`](super::FileProvider), [`EtcdProvider`](super::EtcdProvider)
/// and [`NacosProvider`](super::NacosProvider).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fetch the current configuration fragments, in override order.
    ///
    /// Returns an empty vector when the source is reachable but holds no
    /// matching data.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached or read.
    async fn open(&self) -> Result<Vec<Content>>;

    /// Register interest in future changes.
    ///
    /// Returns once the registration is in place; change signals are then
    /// delivered through the returned stream for as long as it is alive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WatchRegistration`](crate::error::ConfigError::WatchRegistration)
    /// (or a connection error) if the subscription cannot be set up.
    async fn watch(&self) -> Result<ChangeStream>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}
