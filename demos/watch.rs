//! Load options from the source named by `APP_*` variables and log every update.
//!
//! ```text
//! APP_FILE__PATH=./config.yaml cargo run --example watch
//! APP_SOURCE=etcd APP_ETCD__ENDPOINTS=127.0.0.1:2379 APP_ETCD__KEY=/app cargo run --example watch
//! ```

use config_loader::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let settings = SourceSettings::from_env("APP")?;
    info!(source = %settings.source, "selected configuration source");

    let loader = Loader::new(settings.into_provider()?);
    let options = loader.load().await?;
    info!(config = %options.to_json()?, "initial configuration");

    loader.set_on_update(|options| match options.to_json() {
        Ok(json) => info!(config = %json, "configuration updated"),
        Err(e) => error!(error = %e, "failed to render configuration"),
    });

    let handle = match loader.watch().await {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!(error = %e, "start config watch failed");
            None
        }
    };

    if tokio::signal::ctrl_c().await.is_err() {
        error!("failed to listen for ctrl-c");
    }

    if let Some(handle) = handle {
        handle.stop();
    }
    info!(bind = %loader.current().server.bind, "shutting down");
    Ok(())
}
