//! # config-loader
//!
//! Application configuration from a local file, etcd or Nacos, held in
//! lock-free snapshots and reloaded when the source changes.
//!
//! ## Overview
//!
//! - A [`Provider`](sources::Provider) fetches raw YAML fragments and registers
//!   change watches. Three variants ship: file, etcd and Nacos.
//! - A [`Manager`](core::Manager) keeps a schema-free document of the first
//!   fragment and supports dot-path lookups.
//! - A [`Loader`](core::Loader) merges every fragment in order into the typed
//!   [`Options`](core::Options).
//! - Reads use `arc-swap` and never block; reloads triggered by a watch that
//!   fail are logged and leave the previous snapshot in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use config_loader::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> config_loader::error::Result<()> {
//! let loader = Loader::new(Arc::new(FileProvider::new("config.yaml")));
//! let options = loader.load().await?;
//! println!("listening on {}", options.server.bind);
//!
//! let handle = loader.watch().await?;
//! // ... later, on shutdown
//! handle.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Enables |
//! |---|---|
//! | `file-watch` | watching files with `notify` |
//! | `etcd` | [`EtcdProvider`](sources::EtcdProvider) |
//! | `nacos` | [`NacosProvider`](sources::NacosProvider) |
//!
//! All three are on by default.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{Generic, Loader, Manager, Options};
    pub use crate::error::{ConfigError, Result};
    pub use crate::notify::{ChangeStream, WatchHandle};
    pub use crate::sources::{Content, FileProvider, Provider, SourceSettings};

    #[cfg(feature = "etcd")]
    pub use crate::sources::EtcdProvider;
    #[cfg(feature = "nacos")]
    pub use crate::sources::NacosProvider;
}
