//! etcd v3 configuration provider.
//!
//! Talks to etcd through its JSON gateway (`/v3/kv/range`, `/v3/watch`),
//! where keys and values travel base64 encoded.

use super::{Content, Provider};
use crate::error::{ConfigError, Result};
use crate::notify::{ChangeSender, ChangeStream};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::RwLock;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Group tag of fragments read from etcd.
pub const ETCD_GROUP: &str = "etcd";

/// Default connect timeout for new connections.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for a single request, and for a new watch to be acknowledged.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// gRPC `Unauthenticated`, as relayed in gateway error bodies.
const CODE_UNAUTHENTICATED: i64 = 16;

/// etcd-backed configuration provider.
///
/// Reads the YAML document stored under a single key and subscribes to the
/// key's change stream. The HTTP client is built lazily on first use and then
/// reused; every event on the key triggers a reload, whatever its type.
///
/// With credentials set, a rejected auth token is renewed once per request
/// and the request retried.
///
/// # Examples
///
/// ```rust,no_run
/// use config_loader::sources::{EtcdProvider, Provider};
///
/// # async fn example() -> config_loader::error::Result<()> {
/// let provider = EtcdProvider::new(vec!["127.0.0.1:2379".to_string()], "/app/config.yaml")
///     .with_credentials("root", "secret");
/// let contents = provider.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct EtcdProvider {
    endpoints: Vec<String>,
    key: String,
    username: Option<String>,
    password: Option<String>,
    dial_timeout: Duration,
    request_timeout: Duration,
    client: OnceCell<GatewayClient>,
}

impl EtcdProvider {
    /// Create a provider reading `key` from the given endpoints.
    ///
    /// Endpoints without a scheme are reached over plain `http://`.
    pub fn new(endpoints: Vec<String>, key: impl Into<String>) -> Self {
        Self {
            endpoints,
            key: key.into(),
            username: None,
            password: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            client: OnceCell::new(),
        }
    }

    /// Authenticate with a username and password.
    ///
    /// Empty strings are treated as not set.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into()).filter(|s| !s.is_empty());
        self.password = Some(password.into()).filter(|s| !s.is_empty());
        self
    }

    /// Set the connect timeout (default 5s).
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Set the per-request deadline (default 3s).
    ///
    /// It also bounds how long `watch` waits for the server to acknowledge.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The watched key.
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn client(&self) -> Result<&GatewayClient> {
        self.client
            .get_or_try_init(|| {
                GatewayClient::connect(
                    &self.endpoints,
                    self.username.as_deref(),
                    self.password.as_deref(),
                    self.dial_timeout,
                    self.request_timeout,
                )
            })
            .await
    }

    fn ensure_key(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for EtcdProvider {
    async fn open(&self) -> Result<Vec<Content>> {
        self.ensure_key()?;
        let client = self.client().await?;

        match client.range(&self.key).await? {
            Some(payload) => Ok(vec![Content::new(self.key.clone(), ETCD_GROUP, payload)]),
            None => Ok(Vec::new()),
        }
    }

    async fn watch(&self) -> Result<ChangeStream> {
        self.ensure_key()?;
        let client = self.client().await?.clone();

        let feed = WatchFeed::subscribe(&client, &self.key)
            .await
            .map_err(|e| ConfigError::WatchRegistration(format!("etcd key '{}': {}", self.key, e)))?;
        debug!(key = %self.key, "etcd watch registered");

        let (sender, stream) = ChangeStream::channel();
        let key = self.key.clone();
        let task = tokio::spawn(run_watch(client, key, feed, sender));

        Ok(stream.with_task(task))
    }

    fn name(&self) -> String {
        format!("etcd:{}", self.key)
    }
}

/// Forward every event-carrying watch message; reconnect when the stream ends.
async fn run_watch(client: GatewayClient, key: String, mut feed: WatchFeed, sender: ChangeSender) {
    loop {
        match feed.next_message().await {
            Ok(Some(message)) if message.is_canceled() => {
                warn!(key = %key, "etcd watch canceled by server");
            }
            Ok(Some(message)) => {
                if message.has_events() && !sender.notify() {
                    return;
                }
                continue;
            }
            Ok(None) => warn!(key = %key, "etcd watch stream closed"),
            Err(e) => warn!(key = %key, error = %e, "etcd watch stream failed"),
        }

        feed = loop {
            if sender.is_closed() {
                return;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
            match WatchFeed::subscribe(&client, &key).await {
                Ok(feed) => break feed,
                Err(e) => warn!(key = %key, error = %e, "etcd watch reconnect failed"),
            }
        };
        debug!(key = %key, "etcd watch re-established");

        // events may have been missed while disconnected
        if !sender.notify() {
            return;
        }
    }
}

/// Normalize an endpoint into a base URL without a trailing slash.
fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::ConnectError("empty etcd endpoint".to_string()));
    }

    let candidate = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = reqwest::Url::parse(&candidate).map_err(|e| {
        ConfigError::ConnectError(format!("invalid etcd endpoint '{}': {}", endpoint, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::ConnectError(format!(
            "unsupported scheme in etcd endpoint '{}'",
            endpoint
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// HTTP client bound to the etcd JSON gateway, with failover across endpoints.
///
/// Clones share the auth token, so a renewal made by the watch task is seen
/// by reads and the other way round.
#[derive(Clone)]
struct GatewayClient {
    http: Client,
    endpoints: Vec<String>,
    credentials: Option<Credentials>,
    token: Arc<RwLock<Option<String>>>,
    request_timeout: Duration,
}

#[derive(Clone)]
struct Credentials {
    name: String,
    password: String,
}

/// Why no endpoint accepted a request.
struct Rejection {
    detail: String,
    unauthenticated: bool,
}

impl Rejection {
    fn into_error(self, path: &str) -> ConfigError {
        ConfigError::ReadError(format!("etcd request {} failed: {}", path, self.detail))
    }
}

fn is_unauthenticated(status: StatusCode, detail: &str) -> bool {
    status == StatusCode::UNAUTHORIZED
        || serde_json::from_str::<GatewayStatus>(detail)
            .is_ok_and(|s| s.code == Some(CODE_UNAUTHENTICATED))
}

impl GatewayClient {
    async fn connect(
        endpoints: &[String],
        username: Option<&str>,
        password: Option<&str>,
        dial_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ConfigError::ConnectError(
                "no etcd endpoints configured".to_string(),
            ));
        }
        let endpoints = endpoints
            .iter()
            .map(|e| normalize_endpoint(e))
            .collect::<Result<Vec<_>>>()?;

        let http = Client::builder()
            .connect_timeout(dial_timeout)
            .build()
            .map_err(|e| ConfigError::ConnectError(format!("Failed to create HTTP client: {}", e)))?;

        let credentials = (username.is_some() || password.is_some()).then(|| Credentials {
            name: username.unwrap_or_default().to_string(),
            password: password.unwrap_or_default().to_string(),
        });

        let client = Self {
            http,
            endpoints,
            credentials,
            token: Arc::new(RwLock::new(None)),
            request_timeout,
        };

        client
            .authenticate()
            .await
            .map_err(|e| ConfigError::ConnectError(format!("etcd authentication failed: {}", e)))?;

        Ok(client)
    }

    /// Fetch a fresh token; a no-op without credentials.
    async fn authenticate(&self) -> Result<()> {
        const PATH: &str = "/v3/auth/authenticate";
        let Some(credentials) = &self.credentials else {
            return Ok(());
        };

        let request = AuthRequest {
            name: &credentials.name,
            password: &credentials.password,
        };
        let response = self
            .send_once(PATH, &request, Some(self.request_timeout), false)
            .await
            .map_err(|r| r.into_error(PATH))?;
        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| ConfigError::ReadError(format!("invalid etcd response for {}: {}", PATH, e)))?;

        *self.token.write() = Some(auth.token);
        Ok(())
    }

    /// Send a request, renewing the auth token once if the server rejects it.
    async fn send<B: Serialize>(&self, path: &str, body: &B, timeout: Option<Duration>) -> Result<Response> {
        match self.send_once(path, body, timeout, true).await {
            Ok(response) => Ok(response),
            Err(rejection) if rejection.unauthenticated && self.credentials.is_some() => {
                debug!(path, "etcd auth token rejected, re-authenticating");
                self.authenticate().await?;
                self.send_once(path, body, timeout, true)
                    .await
                    .map_err(|r| r.into_error(path))
            }
            Err(rejection) => Err(rejection.into_error(path)),
        }
    }

    /// Send a request to the first endpoint that answers.
    async fn send_once<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
        with_token: bool,
    ) -> std::result::Result<Response, Rejection> {
        let token = if with_token { self.token.read().clone() } else { None };
        let mut last_error = None;
        let mut unauthenticated = false;

        for endpoint in &self.endpoints {
            let mut request = self.http.post(format!("{}{}", endpoint, path)).json(body);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            if let Some(token) = &token {
                request = request.header("Authorization", token);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    unauthenticated |= is_unauthenticated(status, &detail);
                    last_error = Some(format!("{} answered {}: {}", endpoint, status, detail));
                }
                Err(e) => last_error = Some(format!("{}: {}", endpoint, e)),
            }
        }

        Err(Rejection {
            detail: last_error.unwrap_or_default(),
            unauthenticated,
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let response = self.send(path, body, Some(self.request_timeout)).await?;
        response
            .json::<R>()
            .await
            .map_err(|e| ConfigError::ReadError(format!("invalid etcd response for {}: {}", path, e)))
    }

    /// Fetch the value stored at `key`, `None` if the key does not exist.
    async fn range(&self, key: &str) -> Result<Option<String>> {
        let response: RangeResponse = self
            .post("/v3/kv/range", &RangeRequest { key: BASE64.encode(key) })
            .await?;

        let Some(kv) = response.kvs.into_iter().next() else {
            return Ok(None);
        };
        let raw = BASE64
            .decode(kv.value.as_bytes())
            .map_err(|e| ConfigError::ParseError(format!("etcd value is not base64: {}", e)))?;
        let payload = String::from_utf8(raw)
            .map_err(|e| ConfigError::ParseError(format!("etcd value is not UTF-8: {}", e)))?;

        Ok(Some(payload))
    }
}

/// Incremental reader of the newline-delimited watch stream.
struct WatchFeed {
    response: Response,
    buf: Vec<u8>,
}

impl WatchFeed {
    /// Open a watch on `key` and wait for the server's creation acknowledgement.
    ///
    /// Giving up after the client's request timeout is a read error.
    async fn subscribe(client: &GatewayClient, key: &str) -> Result<Self> {
        tokio::time::timeout(client.request_timeout, Self::handshake(client, key))
            .await
            .map_err(|_| {
                ConfigError::ReadError(format!(
                    "no watch acknowledgement within {:?}",
                    client.request_timeout
                ))
            })?
    }

    async fn handshake(client: &GatewayClient, key: &str) -> Result<Self> {
        let request = WatchRequest {
            create_request: WatchCreateRequest { key: BASE64.encode(key) },
        };
        let response = client.send("/v3/watch", &request, None).await?;
        let mut feed = Self {
            response,
            buf: Vec::new(),
        };

        match feed.next_message().await? {
            Some(message) if message.is_created() => Ok(feed),
            Some(message) => Err(ConfigError::ReadError(format!(
                "unexpected first watch message: {}",
                message.describe()
            ))),
            None => Err(ConfigError::ReadError(
                "watch stream closed before acknowledgement".to_string(),
            )),
        }
    }

    async fn next_message(&mut self) -> Result<Option<WatchMessage>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                match parse_line(&line)? {
                    Some(message) => return Ok(Some(message)),
                    None => continue,
                }
            }

            let chunk = self
                .response
                .chunk()
                .await
                .map_err(|e| ConfigError::ReadError(format!("watch stream read failed: {}", e)))?;
            match chunk {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => {
                    let rest = std::mem::take(&mut self.buf);
                    return parse_line(&rest);
                }
            }
        }
    }
}

fn parse_line(line: &[u8]) -> Result<Option<WatchMessage>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(line)
        .map(Some)
        .map_err(|e| ConfigError::ParseError(format!("invalid watch message: {}", e)))
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    name: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Serialize)]
struct RangeRequest {
    key: String,
}

#[derive(Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct KeyValue {
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
struct WatchRequest {
    create_request: WatchCreateRequest,
}

#[derive(Serialize)]
struct WatchCreateRequest {
    key: String,
}

#[derive(Deserialize, Debug)]
struct WatchMessage {
    #[serde(default)]
    result: Option<WatchResult>,
    #[serde(default)]
    error: Option<GatewayError>,
}

#[derive(Deserialize, Debug, Default)]
struct WatchResult {
    #[serde(default)]
    created: bool,
    #[serde(default)]
    canceled: bool,
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct GatewayStatus {
    #[serde(default)]
    code: Option<i64>,
}

#[derive(Deserialize, Debug)]
struct GatewayError {
    #[serde(default)]
    message: String,
}

impl WatchMessage {
    fn is_created(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.created)
    }

    fn is_canceled(&self) -> bool {
        self.error.is_some() || self.result.as_ref().is_some_and(|r| r.canceled)
    }

    fn has_events(&self) -> bool {
        self.result.as_ref().is_some_and(|r| !r.events.is_empty())
    }

    fn describe(&self) -> String {
        match &self.error {
            Some(error) => error.message.clone(),
            None => format!("{:?}", self.result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn b64(s: &str) -> String {
        BASE64.encode(s)
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("127.0.0.1:2379").unwrap(), "http://127.0.0.1:2379");
        assert_eq!(
            normalize_endpoint(" https://etcd.local:2379/ ").unwrap(),
            "https://etcd.local:2379"
        );
        assert!(normalize_endpoint("").is_err());
        assert!(normalize_endpoint("http://[::1").is_err());
        assert!(normalize_endpoint("ftp://etcd.local").is_err());
    }

    #[test]
    fn test_parse_watch_lines() {
        let created = parse_line(br#"{"result":{"header":{},"created":true}}"#)
            .unwrap()
            .unwrap();
        assert!(created.is_created());
        assert!(!created.has_events());

        let events = parse_line(br#"{"result":{"events":[{"type":"DELETE","kv":{}}]}}"#)
            .unwrap()
            .unwrap();
        assert!(events.has_events());

        let error = parse_line(br#"{"error":{"message":"boom"}}"#).unwrap().unwrap();
        assert!(error.is_canceled());
        assert_eq!(error.describe(), "boom");

        assert!(parse_line(b"  \r\n").unwrap().is_none());
        assert!(parse_line(b"{not json").is_err());
    }

    #[tokio::test]
    async fn test_open_reads_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .and(body_json(json!({ "key": b64("/app/config.yaml") })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "header": { "revision": "7" },
                "kvs": [{ "key": b64("/app/config.yaml"), "value": b64("a: 1\n") }],
                "count": "1"
            })))
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/app/config.yaml");
        let contents = provider.open().await.unwrap();

        assert_eq!(
            contents,
            vec![Content::new("/app/config.yaml", "etcd", "a: 1\n")]
        );
    }

    #[tokio::test]
    async fn test_open_missing_key_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "header": {} })))
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/app/missing");
        assert!(provider.open().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_fails_over_to_next_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kvs": [{ "value": b64("b: 2\n") }]
            })))
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec!["127.0.0.1:1".to_string(), server.uri()], "/k");
        let contents = provider.open().await.unwrap();
        assert_eq!(contents[0].payload, "b: 2\n");
    }

    #[tokio::test]
    async fn test_connect_errors() {
        let provider = EtcdProvider::new(Vec::new(), "/k");
        assert!(matches!(provider.open().await, Err(ConfigError::ConnectError(_))));

        let provider = EtcdProvider::new(vec!["http://[::1".to_string()], "/k");
        assert!(matches!(provider.watch().await, Err(ConfigError::ConnectError(_))));
    }

    #[tokio::test]
    async fn test_empty_key() {
        let provider = EtcdProvider::new(vec!["127.0.0.1:2379".to_string()], "");
        assert!(matches!(provider.open().await, Err(ConfigError::EmptyPath)));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let provider = EtcdProvider::new(vec!["127.0.0.1:1".to_string()], "/k");
        assert!(matches!(provider.open().await, Err(ConfigError::ReadError(_))));
        assert!(matches!(
            provider.watch().await,
            Err(ConfigError::WatchRegistration(_))
        ));
    }

    #[tokio::test]
    async fn test_client_is_built_once_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/authenticate"))
            .and(body_json(json!({ "name": "root", "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .and(header("Authorization", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kvs": [{ "value": b64("a: 1\n") }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider =
            EtcdProvider::new(vec![server.uri()], "/k").with_credentials("root", "secret");
        provider.open().await.unwrap();
        provider.open().await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_token_is_renewed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-2" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .and(header("Authorization", "tok-1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": 16,
                "error": "etcdserver: invalid auth token",
                "message": "etcdserver: invalid auth token"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .and(header("Authorization", "tok-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kvs": [{ "value": b64("a: 1\n") }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider =
            EtcdProvider::new(vec![server.uri()], "/k").with_credentials("root", "secret");
        for _ in 0..2 {
            let contents = provider.open().await.unwrap();
            assert_eq!(contents[0].payload, "a: 1\n");
        }
    }

    #[tokio::test]
    async fn test_unauthorized_without_credentials_is_read_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok" })))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/kv/range"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "code": 16 })))
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/k");
        assert!(matches!(provider.open().await, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_is_unauthenticated() {
        assert!(is_unauthenticated(StatusCode::UNAUTHORIZED, ""));
        assert!(is_unauthenticated(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"code":16,"error":"etcdserver: invalid auth token"}"#
        ));
        assert!(!is_unauthenticated(StatusCode::INTERNAL_SERVER_ERROR, r#"{"code":14}"#));
        assert!(!is_unauthenticated(StatusCode::BAD_GATEWAY, "upstream down"));
    }

    #[tokio::test]
    async fn test_failed_auth_is_connect_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/authenticate"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/k").with_credentials("root", "bad");
        assert!(matches!(provider.open().await, Err(ConfigError::ConnectError(_))));
    }

    #[tokio::test]
    async fn test_watch_signals_on_events() {
        let server = MockServer::start().await;
        let body = format!(
            "{}\n{}\n",
            json!({ "result": { "header": {}, "created": true } }),
            json!({ "result": { "header": {}, "events": [{ "type": "PUT", "kv": { "key": b64("/k") } }] } })
        );
        Mock::given(method("POST"))
            .and(path("/v3/watch"))
            .and(body_json(json!({ "create_request": { "key": b64("/k") } })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/k");
        let mut changes = provider.watch().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), changes.recv()).await;
        assert_eq!(result.unwrap(), Some(()));
        changes.handle().stop();
    }

    #[tokio::test]
    async fn test_watch_rejected_without_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/watch"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("{}\n", json!({ "error": { "message": "permission denied" } }))),
            )
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/k");
        let err = provider.watch().await.unwrap_err();
        assert!(matches!(err, ConfigError::WatchRegistration(ref msg) if msg.contains("permission denied")));
    }

    #[tokio::test]
    async fn test_watch_without_ack_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/watch"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("{}\n", json!({ "result": { "created": true } })))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let provider = EtcdProvider::new(vec![server.uri()], "/k")
            .with_request_timeout(Duration::from_millis(200));
        let result = tokio::time::timeout(Duration::from_secs(3), provider.watch())
            .await
            .expect("watch registration should give up on its own");

        assert!(matches!(
            result,
            Err(ConfigError::WatchRegistration(ref msg)) if msg.contains("acknowledgement")
        ));
    }
}
