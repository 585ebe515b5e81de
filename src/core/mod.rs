//! Snapshot owners and the decoding they rely on.

pub mod decode;
pub mod document;
mod loader;
mod manager;
mod options;
mod reload;
mod snapshot;

pub use decode::{decode_merged, decode_options, load_dir, load_file};
pub use loader::Loader;
pub use manager::{Generic, Manager};
pub use options::{DEFAULT_BIND, Options, Server, Welcome};
pub use snapshot::{Snapshot, UpdateCallback};
