//! File-based configuration provider.

use super::{Content, Provider};
use crate::error::{ConfigError, Result};
use crate::notify::ChangeStream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Group tag of fragments read from a file.
pub const FILE_GROUP: &str = "file";

/// File-based configuration provider.
///
/// Reads one YAML document from a local file and, with the `file-watch`
/// feature, watches the exact path for changes.
///
/// # Examples
///
/// ```rust,no_run
/// use config_loader::sources::{FileProvider, Provider};
///
/// # async fn example() -> config_loader::error::Result<()> {
/// let provider = FileProvider::new("config/app.yaml");
/// let contents = provider.open().await?;
/// assert_eq!(contents[0].group, "file");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
    debounce: Option<Duration>,
}

impl FileProvider {
    /// Create a new file provider.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: None,
        }
    }

    /// Override the debounce window used by [`Provider::watch`] (default 200ms).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = Some(debounce);
        self
    }

    /// The configured path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_path(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        Ok(())
    }

    #[cfg(feature = "file-watch")]
    fn start_watch(&self) -> Result<ChangeStream> {
        let mut watcher = crate::notify::FileWatcher::new(&self.path);
        if let Some(debounce) = self.debounce {
            watcher = watcher.with_debounce(debounce);
        }
        watcher.start()
    }

    #[cfg(not(feature = "file-watch"))]
    fn start_watch(&self) -> Result<ChangeStream> {
        Err(ConfigError::FeatureNotEnabled("file-watch"))
    }
}

#[async_trait]
impl Provider for FileProvider {
    async fn open(&self) -> Result<Vec<Content>> {
        self.ensure_path()?;

        let payload = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ConfigError::ReadError(format!("{}: {}", self.path.display(), e))
        })?;

        Ok(vec![Content::new(
            self.path.display().to_string(),
            FILE_GROUP,
            payload,
        )])
    }

    async fn watch(&self) -> Result<ChangeStream> {
        self.ensure_path()?;
        self.start_watch()
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
