//! Background reload loop shared by [`Manager`](super::Manager) and [`Loader`](super::Loader).

use crate::error::Result;
use crate::notify::{ChangeStream, WatchHandle};
use std::future::Future;
use tracing::{debug, warn};

/// Spawn a task that runs `reload` once per change signal.
///
/// Reload failures are logged and swallowed; whatever the last successful
/// reload installed stays current. The returned handle covers this task and
/// the tasks feeding `changes`.
pub(crate) fn spawn_reload<F, Fut>(source: String, mut changes: ChangeStream, reload: F) -> WatchHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut handle = changes.handle().clone();

    let task = tokio::spawn(async move {
        while changes.recv().await.is_some() {
            match reload().await {
                Ok(()) => debug!(source = %source, "configuration reloaded"),
                Err(e) => warn!(
                    source = %source,
                    error = %e,
                    "configuration reload failed, keeping previous snapshot"
                ),
            }
        }
        debug!(source = %source, "change stream closed");
    });

    handle.attach(&task);
    handle
}
