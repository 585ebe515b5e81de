//! Nacos configuration provider.
//!
//! Uses the Nacos v1 open API: documents are pulled from
//! `/nacos/v1/cs/configs` and changes arrive through the long-polling
//! listener endpoint, which the server holds open until the document's MD5
//! differs from the one the client reports.

use super::{Content, Provider};
use crate::error::{ConfigError, Result};
use crate::notify::{ChangeSender, ChangeStream};
use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Group used when none is configured.
pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";

/// Default Nacos server port, used when an address carries no usable port.
pub const DEFAULT_PORT: u16 = 8848;

/// Timeout for pulling a document.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// How long the server may hold a listener request open.
pub const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Split a `host:port` address.
///
/// Tolerant of malformed input: anything that is not exactly `host:port`
/// comes back whole as the host with port 0, and an unparsable port is 0.
/// Ports are `u16`, so one above 65535 (say `host:70000`) is also 0 and the
/// provider then falls back to the default Nacos port.
///
/// # Examples
///
/// ```rust
/// use config_loader::sources::split_host_port;
///
/// assert_eq!(split_host_port("127.0.0.1:8848"), ("127.0.0.1".to_string(), 8848));
/// assert_eq!(split_host_port("bad"), ("bad".to_string(), 0));
/// assert_eq!(split_host_port(""), (String::new(), 0));
/// assert_eq!(split_host_port("host:70000"), ("host".to_string(), 0));
/// ```
pub fn split_host_port(addr: &str) -> (String, u16) {
    let addr = addr.trim();
    if addr.is_empty() {
        return (String::new(), 0);
    }

    let parts: Vec<&str> = addr.split(':').collect();
    if parts.len() != 2 {
        return (addr.to_string(), 0);
    }

    (parts[0].to_string(), parts[1].parse().unwrap_or(0))
}

/// Hex MD5 of a document as Nacos computes it; empty for a missing document.
fn content_md5(content: Option<&str>) -> String {
    match content {
        Some(text) => format!("{:x}", Md5::digest(text.as_bytes())),
        None => String::new(),
    }
}

/// Nacos-backed configuration provider.
///
/// # Examples
///
/// ```rust,no_run
/// use config_loader::sources::{NacosProvider, Provider};
///
/// # async fn example() -> config_loader::error::Result<()> {
/// let provider = NacosProvider::new(
///     vec!["127.0.0.1:8848".to_string()],
///     "",
///     "DEFAULT_GROUP",
///     "app.yaml",
/// );
/// let contents = provider.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct NacosProvider {
    server_addrs: Vec<String>,
    namespace_id: String,
    group: String,
    data_id: String,
    timeout: Duration,
    client: OnceCell<OpenApiClient>,
}

impl NacosProvider {
    /// Create a provider for `data_id` in `group`.
    ///
    /// An empty group falls back to [`DEFAULT_GROUP`].
    pub fn new(
        server_addrs: Vec<String>,
        namespace_id: impl Into<String>,
        group: impl Into<String>,
        data_id: impl Into<String>,
    ) -> Self {
        let group = group.into();
        Self {
            server_addrs,
            namespace_id: namespace_id.into(),
            group: if group.is_empty() {
                DEFAULT_GROUP.to_string()
            } else {
                group
            },
            data_id: data_id.into(),
            timeout: DEFAULT_TIMEOUT,
            client: OnceCell::new(),
        }
    }

    /// Set the timeout for pulling a document (default 3000ms).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured group.
    pub fn group(&self) -> &str {
        &self.group
    }

    async fn client(&self) -> Result<&OpenApiClient> {
        self.client
            .get_or_try_init(|| async { OpenApiClient::new(self) })
            .await
    }

    fn ensure_data_id(&self) -> Result<()> {
        if self.data_id.is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for NacosProvider {
    async fn open(&self) -> Result<Vec<Content>> {
        self.ensure_data_id()?;
        let client = self.client().await?;

        match client.get_config().await? {
            Some(payload) => Ok(vec![Content::new(
                self.data_id.clone(),
                self.group.clone(),
                payload,
            )]),
            None => Ok(Vec::new()),
        }
    }

    async fn watch(&self) -> Result<ChangeStream> {
        self.ensure_data_id()?;
        let client = self.client().await?.clone();

        let current = client.get_config().await.map_err(|e| {
            ConfigError::WatchRegistration(format!("nacos data id '{}': {}", self.data_id, e))
        })?;
        let md5 = content_md5(current.as_deref());
        debug!(data_id = %self.data_id, group = %self.group, "nacos listener registered");

        let (sender, stream) = ChangeStream::channel();
        let task = tokio::spawn(run_listener(client, md5, sender));

        Ok(stream.with_task(task))
    }

    fn name(&self) -> String {
        format!("nacos:{}/{}", self.group, self.data_id)
    }
}

/// Long-poll the listener endpoint until the stream consumer goes away.
async fn run_listener(client: OpenApiClient, mut md5: String, sender: ChangeSender) {
    loop {
        if sender.is_closed() {
            return;
        }

        match client.listen(&md5).await {
            Ok(false) => {}
            Ok(true) => {
                match client.get_config().await {
                    Ok(content) => md5 = content_md5(content.as_deref()),
                    Err(e) => {
                        warn!(data_id = %client.data_id, error = %e, "nacos refresh after change failed");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
                if !sender.notify() {
                    return;
                }
            }
            Err(e) => {
                warn!(data_id = %client.data_id, error = %e, "nacos listener failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Thin client over the Nacos open API with failover across servers.
#[derive(Clone)]
struct OpenApiClient {
    http: Client,
    servers: Vec<String>,
    namespace_id: String,
    group: String,
    data_id: String,
    timeout: Duration,
}

impl OpenApiClient {
    fn new(provider: &NacosProvider) -> Result<Self> {
        if provider.server_addrs.is_empty() {
            return Err(ConfigError::ConnectError(
                "no nacos server addresses configured".to_string(),
            ));
        }

        let servers = provider
            .server_addrs
            .iter()
            .map(|addr| {
                let (host, port) = split_host_port(addr);
                let port = if port == 0 { DEFAULT_PORT } else { port };
                format!("http://{}:{}", host, port)
            })
            .collect();

        let http = Client::builder()
            .build()
            .map_err(|e| ConfigError::ConnectError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            servers,
            namespace_id: provider.namespace_id.clone(),
            group: provider.group.clone(),
            data_id: provider.data_id.clone(),
            timeout: provider.timeout,
        })
    }

    /// Run a request against each server in turn until one gives a definite answer.
    async fn execute<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let mut last_error = String::new();

        for server in &self.servers {
            match build(server).send().await {
                Ok(response) if !response.status().is_server_error() => return Ok(response),
                Ok(response) => last_error = format!("{} answered {}", server, response.status()),
                Err(e) => last_error = format!("{}: {}", server, e),
            }
        }

        Err(ConfigError::ReadError(format!(
            "nacos {} failed: {}",
            what, last_error
        )))
    }

    /// Pull the document, `None` if it does not exist.
    async fn get_config(&self) -> Result<Option<String>> {
        let mut query = vec![("dataId", self.data_id.as_str()), ("group", self.group.as_str())];
        if !self.namespace_id.is_empty() {
            query.push(("tenant", self.namespace_id.as_str()));
        }

        let response = self
            .execute("get config", |server| {
                self.http
                    .get(format!("{}/nacos/v1/cs/configs", server))
                    .query(&query)
                    .timeout(self.timeout)
            })
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .text()
                .await
                .map(Some)
                .map_err(|e| ConfigError::ReadError(format!("nacos config body: {}", e))),
            status => Err(ConfigError::ReadError(format!(
                "nacos get config answered {}",
                status
            ))),
        }
    }

    fn listening_configs(&self, md5: &str) -> String {
        if self.namespace_id.is_empty() {
            format!("{}\u{2}{}\u{2}{}\u{1}", self.data_id, self.group, md5)
        } else {
            format!(
                "{}\u{2}{}\u{2}{}\u{2}{}\u{1}",
                self.data_id, self.group, md5, self.namespace_id
            )
        }
    }

    /// Block until the server reports a change (`true`) or the poll times out (`false`).
    async fn listen(&self, md5: &str) -> Result<bool> {
        let listening = self.listening_configs(md5);
        let long_poll = LONG_POLL_TIMEOUT.as_millis().to_string();

        let response = self
            .execute("listen", |server| {
                self.http
                    .post(format!("{}/nacos/v1/cs/configs/listener", server))
                    .header("Long-Pulling-Timeout", long_poll.as_str())
                    .form(&[("Listening-Configs", listening.as_str())])
                    .timeout(LONG_POLL_TIMEOUT + Duration::from_secs(10))
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::ReadError(format!(
                "nacos listener answered {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ConfigError::ReadError(format!("nacos listener body: {}", e)))?;
        Ok(!body.trim().is_empty())
    }
}
