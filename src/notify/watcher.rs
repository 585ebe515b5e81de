//! File watching for automatic configuration reloads.

use super::debounce::DEFAULT_DEBOUNCE;
use super::{ChangeStream, Debouncer};
use crate::error::{ConfigError, Result};
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Default grace delay before re-registering a removed or renamed path.
pub const DEFAULT_REWATCH_DELAY: Duration = Duration::from_millis(200);

/// What to do with a raw filesystem event.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    /// Content changed in place.
    Forward,
    /// The watched inode went away (deleted or renamed); watch the path again.
    Rewatch,
    Ignore,
}

fn classify(kind: &EventKind) -> Action {
    match kind {
        EventKind::Create(_) => Action::Forward,
        EventKind::Modify(ModifyKind::Name(_)) => Action::Rewatch,
        EventKind::Modify(ModifyKind::Metadata(_)) => Action::Ignore,
        EventKind::Modify(_) => Action::Forward,
        EventKind::Remove(_) => Action::Rewatch,
        _ => Action::Ignore,
    }
}

/// Watches a single configuration file and emits debounced change signals.
///
/// Uses the `notify` crate on the exact path (non-recursive). Bursts of events
/// are coalesced by a leading-edge [`Debouncer`]. When the file is removed or
/// renamed, as editors do for replace-on-save, the path is re-registered after
/// a short grace delay and one change is signalled if that succeeds.
///
/// # Examples
///
/// ```rust,no_run
/// use config_loader::notify::FileWatcher;
/// use std::time::Duration;
///
/// # async fn example() -> config_loader::error::Result<()> {
/// let mut changes = FileWatcher::new("/etc/app/config.yaml")
///     .with_debounce(Duration::from_millis(500))
///     .start()?;
///
/// while let Some(()) = changes.recv().await {
///     println!("config file changed");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileWatcher {
    path: PathBuf,
    debounce: Duration,
    rewatch_delay: Duration,
}

impl FileWatcher {
    /// Create a watcher for `path` with the default 200ms debounce and grace delay.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: DEFAULT_DEBOUNCE,
            rewatch_delay: DEFAULT_REWATCH_DELAY,
        }
    }

    /// Set the minimum spacing between forwarded change signals.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the delay before re-registering a removed path.
    pub fn with_rewatch_delay(mut self, delay: Duration) -> Self {
        self.rewatch_delay = delay;
        self
    }

    /// The watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register the watch and spawn the debouncing task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WatchRegistration`] if the watcher cannot be
    /// created or the path cannot be watched (e.g. it does not exist).
    pub fn start(&self) -> Result<ChangeStream> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            })
            .map_err(|e| {
                ConfigError::WatchRegistration(format!("Failed to create file watcher: {}", e))
            })?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                ConfigError::WatchRegistration(format!(
                    "Failed to watch {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        debug!(path = %self.path.display(), "file watch registered");

        let (sender, stream) = ChangeStream::channel();
        let path = self.path.clone();
        let debounce = self.debounce;
        let rewatch_delay = self.rewatch_delay;

        // The task owns the watcher; dropping it would end the event channel.
        let task = tokio::spawn(async move {
            let mut debouncer = Debouncer::new(debounce);

            while let Some(event) = event_rx.recv().await {
                let changed = match classify(&event.kind) {
                    Action::Forward => true,
                    Action::Rewatch => {
                        sleep(rewatch_delay).await;
                        let _ = watcher.unwatch(&path);
                        match watcher.watch(&path, RecursiveMode::NonRecursive) {
                            Ok(()) => {
                                debug!(path = %path.display(), "file watch re-registered");
                                true
                            }
                            Err(e) => {
                                warn!(path = %path.display(), error = %e, "failed to re-register file watch");
                                false
                            }
                        }
                    }
                    Action::Ignore => false,
                };

                if changed && debouncer.ready(Instant::now()) && !sender.notify() {
                    // consumer dropped the stream
                    break;
                }
            }
        });

        Ok(stream.with_task(task))
    }
}
