//! Typed configuration loader.

use super::decode::decode_options;
use super::reload::spawn_reload;
use super::snapshot::Snapshot;
use super::Options;
use crate::error::{ConfigError, Result};
use crate::notify::WatchHandle;
use crate::sources::Provider;
use std::sync::Arc;
use tracing::{debug, info};

/// Keeps an [`Options`] snapshot current for one provider.
///
/// Unlike [`Manager`](super::Manager), every fragment the provider returns is
/// merged in order before decoding, then defaults apply.
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
/// let loader = Loader::new(Arc::new(FileProvider::new("config.yaml")));
/// let options = loader.load().await?;
/// println!("binding {}", options.server.bind);
///
/// loader.set_on_update(|options| println!("now binding {}", options.server.bind));
/// let _handle = loader.watch().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Loader {
    inner: Arc<Inner>,
}

struct Inner {
    provider: Arc<dyn Provider>,
    snapshot: Snapshot<Options>,
}

impl Loader {
    /// Create a loader over `provider`; the snapshot starts as `Options::default()`.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                snapshot: Snapshot::default(),
            }),
        }
    }

    /// Fetch, merge and install a new snapshot.
    ///
    /// # Errors
    ///
    /// Provider errors, [`ConfigError::EmptyContent`] and [`ConfigError::ParseError`].
    /// The current snapshot is untouched on error.
    pub async fn load(&self) -> Result<Arc<Options>> {
        let provider = &self.inner.provider;
        let contents = provider.open().await?;
        if contents.is_empty() {
            return Err(ConfigError::EmptyContent(provider.name()));
        }

        let options = decode_options(&contents)?;
        debug!(
            source = %provider.name(),
            fragments = contents.len(),
            bind = %options.server.bind,
            "options snapshot installed"
        );
        Ok(self.inner.snapshot.install(options))
    }

    /// Watch the provider and reload on every change.
    pub async fn watch(&self) -> Result<WatchHandle> {
        let provider = &self.inner.provider;
        let changes = provider.watch().await?;
        info!(source = %provider.name(), "watching configuration");

        let loader = self.clone();
        Ok(spawn_reload(provider.name(), changes, move || {
            let loader = loader.clone();
            async move { loader.load().await.map(|_| ()) }
        }))
    }

    /// The current options.
    pub fn current(&self) -> Arc<Options> {
        self.inner.snapshot.load()
    }

    /// Set the callback run after each installed snapshot.
    pub fn set_on_update<F>(&self, callback: F)
    where
        F: Fn(&Options) + Send + Sync + 'static,
    {
        self.inner.snapshot.set_on_update(Arc::new(callback));
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("source", &self.inner.provider.name())
            .field("bind", &self.current().server.bind)
            .finish()
    }
}
