//! Change signal channel between providers and snapshot owners.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{AbortHandle, JoinHandle};

/// Capacity of the change signal channel.
///
/// Signals carry no payload, so a full buffer already guarantees the consumer
/// will reload at least once more.
pub const CHANGE_BUFFER: usize = 16;

/// Handle to the background tasks behind a watch.
///
/// Dropping the handle detaches the tasks; they keep running for the life of
/// the runtime. Call [`WatchHandle::stop`] to abort them.
#[derive(Clone, Default)]
pub struct WatchHandle {
    tasks: Vec<AbortHandle>,
}

impl WatchHandle {
    /// Create a handle that tracks no tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an additional task.
    pub fn attach<T>(&mut self, task: &JoinHandle<T>) {
        self.tasks.push(task.abort_handle());
    }

    /// Take over every task tracked by `other`.
    pub fn merge(&mut self, other: WatchHandle) {
        self.tasks.extend(other.tasks);
    }

    /// Abort all tracked tasks.
    pub fn stop(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }

    /// Whether every tracked task has finished (or none were tracked).
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.is_finished())
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

/// Producer side of a [`ChangeStream`].
#[derive(Clone, Debug)]
pub struct ChangeSender {
    tx: mpsc::Sender<()>,
}

impl ChangeSender {
    /// Signal a change without blocking.
    ///
    /// Returns `false` once the consuming stream has been dropped, which tells
    /// the producing task to exit.
    pub fn notify(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }

    /// Whether the consuming stream has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Single-consumer stream of change signals returned by `Provider::watch`.
///
/// # Examples
///
/// ```rust
/// use config_loader::notify::ChangeStream;
///
/// # async fn example() {
/// let (sender, mut stream) = ChangeStream::channel();
/// sender.notify();
/// assert_eq!(stream.recv().await, Some(()));
/// # }
/// ```
#[derive(Debug)]
pub struct ChangeStream {
    rx: mpsc::Receiver<()>,
    handle: WatchHandle,
}

impl ChangeStream {
    /// Create a connected sender/stream pair with no background task attached.
    pub fn channel() -> (ChangeSender, ChangeStream) {
        let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
        (
            ChangeSender { tx },
            ChangeStream {
                rx,
                handle: WatchHandle::new(),
            },
        )
    }

    /// Attach the task that feeds this stream.
    pub fn with_task<T>(mut self, task: JoinHandle<T>) -> Self {
        self.handle.attach(&task);
        self
    }

    /// Wait for the next change signal.
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Handle to the tasks feeding this stream.
    pub fn handle(&self) -> &WatchHandle {
        &self.handle
    }
}
