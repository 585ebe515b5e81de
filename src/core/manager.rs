//! Generic document snapshot manager.

use super::document::{lookup, parse_document};
use super::reload::spawn_reload;
use super::snapshot::Snapshot;
use crate::error::{ConfigError, Result};
use crate::notify::WatchHandle;
use crate::sources::Provider;
use serde_yaml::{Mapping, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// A schema-free configuration document with its provenance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generic {
    /// Id of the fragment the document came from.
    pub id: String,
    /// Group of the fragment the document came from.
    pub group: String,
    /// Parsed document tree.
    pub doc: Mapping,
}

/// Keeps a [`Generic`] document current for one provider.
///
/// Only the **first** fragment returned by the provider is decoded. Use
/// [`Loader`](super::Loader) when fragments should be merged.
///
/// Cloning is cheap and clones share the same snapshot.
///
/// # Examples
///
/// ```rust,no_run
/// use config_loader::prelude::*;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<()> {
/// let manager = Manager::new(Arc::new(FileProvider::new("config.yaml")));
/// manager.load().await?;
/// let handle = manager.watch().await?;
///
/// if let Some(title) = manager.lookup("welcome.title") {
///     println!("title: {:?}", title);
/// }
/// # handle.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Manager {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn Provider>,
    snapshot: Snapshot<Generic>,
}

impl Manager {
    /// Create a manager over `provider`; the snapshot starts as an empty document.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                snapshot: Snapshot::default(),
            }),
        }
    }

    /// Fetch from the provider and install the first fragment as the new snapshot.
    ///
    /// The update callback, if any, runs before this returns.
    ///
    /// # Errors
    ///
    /// Provider errors, [`ConfigError::EmptyContent`] when the provider has no
    /// fragments, and [`ConfigError::ParseError`] when the first fragment is not
    /// a YAML mapping. The current snapshot is untouched on error.
    pub async fn load(&self) -> Result<Arc<Generic>> {
        let provider = &self.inner.provider;
        let contents = provider.open().await?;

        let Some(first) = contents.into_iter().next() else {
            return Err(ConfigError::EmptyContent(provider.name()));
        };

        let doc = parse_document(&first.payload)
            .map_err(|e| ConfigError::ParseError(format!("fragment '{}': {}", first.id, e)))?;

        debug!(source = %provider.name(), id = %first.id, keys = doc.len(), "document snapshot installed");
        Ok(self.inner.snapshot.install(Generic {
            id: first.id,
            group: first.group,
            doc,
        }))
    }

    /// Watch the provider and reload on every change.
    ///
    /// # Errors
    ///
    /// Whatever the provider's `watch` returns; reload errors after this are
    /// only logged.
    pub async fn watch(&self) -> Result<WatchHandle> {
        let provider = &self.inner.provider;
        let changes = provider.watch().await?;
        info!(source = %provider.name(), "watching configuration");

        let manager = self.clone();
        Ok(spawn_reload(provider.name(), changes, move || {
            let manager = manager.clone();
            async move { manager.load().await.map(|_| ()) }
        }))
    }

    /// The current document.
    pub fn current(&self) -> Arc<Generic> {
        self.inner.snapshot.load()
    }

    /// Look up a dot-separated path in the current document.
    ///
    /// `None` means the path does not exist; a present null or zero is `Some`.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        lookup(&self.current().doc, path).cloned()
    }

    /// Set the callback run after each installed snapshot.
    pub fn set_on_update<F>(&self, callback: F)
    where
        F: Fn(&Generic) + Send + Sync + 'static,
    {
        self.inner.snapshot.set_on_update(Arc::new(callback));
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("source", &self.inner.provider.name())
            .field("current", &self.current())
            .finish()
    }
}
