//! Configuration providers.

mod file;
mod provider;
mod settings;

#[cfg(feature = "etcd")]
mod etcd;
#[cfg(feature = "nacos")]
mod nacos;

pub use file::{FILE_GROUP, FileProvider};
pub use provider::{Content, Provider};
pub use settings::{
    EtcdSettings, FileSettings, NacosSettings, SourceKind, SourceSettings, split_list,
};

#[cfg(feature = "etcd")]
pub use etcd::{ETCD_GROUP, EtcdProvider};
#[cfg(feature = "nacos")]
pub use nacos::{DEFAULT_GROUP, NacosProvider, split_host_port};
