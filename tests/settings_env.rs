//! Integration tests for provider settings read from the process environment.

#![allow(unsafe_code)] // For env var manipulation in tests

use config_loader::prelude::*;
use config_loader::sources::SourceKind;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_env_selects_file_provider() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("app.yaml");
    fs::write(&config_path, "welcome:\n  title: from env\n").unwrap();

    unsafe {
        env::set_var("CLTEST_FILE_SOURCE", "file");
        env::set_var("CLTEST_FILE_FILE__PATH", &config_path);
    }

    let settings = SourceSettings::from_env("CLTEST_FILE").unwrap();
    assert_eq!(settings.source, SourceKind::File);
    assert_eq!(settings.file.path, config_path);

    let loader = Loader::new(settings.into_provider().unwrap());
    let options = loader.load().await.unwrap();
    assert_eq!(options.welcome.title, "from env");
    assert_eq!(options.server.bind, ":8080");

    unsafe {
        env::remove_var("CLTEST_FILE_SOURCE");
        env::remove_var("CLTEST_FILE_FILE__PATH");
    }
}

#[cfg(feature = "etcd")]
#[test]
fn test_env_etcd_settings() {
    unsafe {
        env::set_var("CLTEST_ETCD_SOURCE", "etcd");
        env::set_var("CLTEST_ETCD_ETCD__ENDPOINTS", "127.0.0.1:2379,,127.0.0.1:22379 ");
        env::set_var("CLTEST_ETCD_ETCD__KEY", "/services/app");
        env::set_var("CLTEST_ETCD_ETCD__DIAL_TIMEOUT_MS", "250");
    }

    let settings = SourceSettings::from_env("CLTEST_ETCD").unwrap();
    assert_eq!(settings.source, SourceKind::Etcd);
    assert_eq!(
        settings.etcd.endpoints,
        vec!["127.0.0.1:2379", "127.0.0.1:22379"]
    );
    assert_eq!(settings.etcd.key, "/services/app");
    assert_eq!(settings.etcd.dial_timeout, Duration::from_millis(250));
    assert_eq!(settings.etcd.username, None);

    let provider = settings.into_provider().unwrap();
    assert_eq!(provider.name(), "etcd:/services/app");

    unsafe {
        env::remove_var("CLTEST_ETCD_SOURCE");
        env::remove_var("CLTEST_ETCD_ETCD__ENDPOINTS");
        env::remove_var("CLTEST_ETCD_ETCD__KEY");
        env::remove_var("CLTEST_ETCD_ETCD__DIAL_TIMEOUT_MS");
    }
}

#[test]
fn test_env_unknown_source() {
    unsafe {
        env::set_var("CLTEST_BAD_SOURCE", "consul");
    }

    let result = SourceSettings::from_env("CLTEST_BAD");
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));

    unsafe {
        env::remove_var("CLTEST_BAD_SOURCE");
    }
}
