//! Atomically swappable snapshot with an update callback.

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Callback run after each installed snapshot.
pub type UpdateCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Holds the current value of a [`Manager`](super::Manager) or [`Loader`](super::Loader).
///
/// Reads go through `arc-swap` and never block; installs replace the whole
/// value in one store, so readers see either the old or the new value.
pub struct Snapshot<T> {
    current: ArcSwap<T>,
    on_update: RwLock<Option<UpdateCallback<T>>>,
}

impl<T> Snapshot<T> {
    /// Create a snapshot holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            on_update: RwLock::new(None),
        }
    }

    /// The current value.
    pub fn load(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Replace the current value and run the callback on the caller's task.
    pub fn install(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.current.store(Arc::clone(&value));

        // clone out so the callback may replace itself
        let callback = self.on_update.read().clone();
        if let Some(callback) = callback {
            callback(&value);
        }

        value
    }

    /// Replace the update callback.
    pub fn set_on_update(&self, callback: UpdateCallback<T>) {
        *self.on_update.write() = Some(callback);
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
