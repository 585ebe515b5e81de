//! Configuration change notification system.
//!
//! Providers hand out a [`ChangeStream`] when a watch is registered. The stream
//! carries bare change signals; consumers re-open the provider to fetch the new
//! content. Background tasks behind a stream are tracked by a [`WatchHandle`].

pub mod debounce;
pub mod stream;
#[cfg(feature = "file-watch")]
pub mod watcher;

pub use debounce::Debouncer;
pub use stream::{ChangeSender, ChangeStream, WatchHandle};
#[cfg(feature = "file-watch")]
pub use watcher::FileWatcher;
