//! HTTP transport layer.
//!
//! This module provides the HTTP transport abstraction used by every
//! operation. A transport sends one signed exchange; signing, retries and the
//! overall operation timeout live in [`RequestExecutor`]. Request and response
//! bodies can be streamed so large objects are never held in memory.

mod body;
mod executor;
mod pool;

pub use body::{BodyStream, ByteStream, CHUNK_SIZE};
pub use executor::RequestExecutor;
pub use pool::{ConnectionPool, PoolConfig, PoolPermit, PoolStats};

use crate::config::AwsConfig;
use crate::error::{AwsError, ConfigurationError, NetworkError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// HTTP request to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add multiple headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Get a header value (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        lookup(&self.headers, name)
    }
}

/// HTTP response received.
///
/// Header names are stored lowercased. The body is a stream and is consumed
/// at most once.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: ByteStream,
}

impl HttpResponse {
    /// Create a response with no headers and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: ByteStream::empty(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<ByteStream>) -> Self {
        self.body = body.into();
        self
    }

    /// Check if the response indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Get a header value (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        lookup(&self.headers, name)
    }

    /// Get the request ID echoed by the service.
    pub fn request_id(&self) -> Option<&str> {
        self.get_header("x-amz-request-id")
            .or_else(|| self.get_header("x-amzn-requestid"))
    }

    /// Get the content length.
    pub fn content_length(&self) -> Option<u64> {
        self.get_header("content-length").and_then(|v| v.parse().ok())
    }

    /// Get the content type.
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }

    /// Get the ETag.
    pub fn etag(&self) -> Option<&str> {
        self.get_header("etag")
    }

    /// Get the extended request ID (`x-amz-id-2`).
    pub fn host_id(&self) -> Option<&str> {
        self.get_header("x-amz-id-2")
    }

    /// Get the `Date` the service stamped on the response.
    pub fn date(&self) -> Option<&str> {
        self.get_header("date")
    }

    /// Keep `permit` checked out until the body is drained or dropped.
    pub(crate) fn holding(self, permit: Option<PoolPermit>) -> Self {
        match permit {
            Some(permit) => Self {
                body: self.body.with_permit(permit),
                ..self
            },
            None => self,
        }
    }
}

fn lookup<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .or_else(|| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

/// HTTP transport trait for sending requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request with an in-memory (or empty) body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;

    /// Send a request whose body is streamed.
    ///
    /// `request.headers` must already carry the `content-length` of the body.
    async fn send_streaming(
        &self,
        request: HttpRequest,
        body: BodyStream,
    ) -> Result<HttpResponse, NetworkError>;

    /// Pool limiting exchanges in flight, if the transport has one.
    ///
    /// [`RequestExecutor`] checks a permit out before signing, so a request
    /// queued behind a full pool is signed only once a slot is free.
    fn pool(&self) -> Option<&Arc<ConnectionPool>> {
        None
    }

    /// Release shared resources. Later sends fail with
    /// [`NetworkError::PoolClosed`].
    fn shutdown(&self) {}
}

/// Reqwest-based HTTP transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
    pool: Arc<ConnectionPool>,
    request_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, AwsError> {
        Self::builder().build()
    }

    /// Create a transport from connection settings.
    pub fn from_config(config: &AwsConfig) -> Result<Self, AwsError> {
        Self::builder()
            .connect_timeout(config.connect_timeout)
            .request_timeout(config.request_timeout)
            .pool(config.pool_config())
            .verify_ssl(config.verify_ssl)
            .user_agent(config.user_agent.clone())
            .build()
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    fn request_builder(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, NetworkError> {
        let method =
            reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
                NetworkError::Protocol {
                    message: format!("invalid HTTP method '{}': {}", request.method, e),
                }
            })?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder)
    }

    async fn dispatch(
        &self,
        builder: reqwest::RequestBuilder,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse, NetworkError> {
        let response = match timeout {
            Some(limit) => match tokio::time::timeout(limit, builder.send()).await {
                Ok(result) => result,
                Err(_) => return Err(NetworkError::Timeout { duration: limit }),
            },
            None => builder.send().await,
        }
        .map_err(|e| map_reqwest_error(&e, self.request_timeout))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let request_timeout = self.request_timeout;
        let body = ByteStream::new(
            response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| map_reqwest_error(&e, request_timeout))),
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        if self.pool.is_closed() {
            return Err(NetworkError::PoolClosed);
        }
        let mut builder = self.request_builder(&request)?;
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        self.dispatch(builder, Some(self.request_timeout)).await
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        body: BodyStream,
    ) -> Result<HttpResponse, NetworkError> {
        if self.pool.is_closed() {
            return Err(NetworkError::PoolClosed);
        }
        let builder = self
            .request_builder(&request)?
            .body(reqwest::Body::wrap_stream(body));
        // Upload time grows with the body; only the operation timeout applies.
        self.dispatch(builder, None).await
    }

    fn pool(&self) -> Option<&Arc<ConnectionPool>> {
        Some(&self.pool)
    }

    fn shutdown(&self) {
        self.pool.close();
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("pool", &self.pool.stats())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    let mut out: HashMap<String, String> = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

/// Render an error and all of its sources on one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_connection_reset(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

fn map_reqwest_error(err: &reqwest::Error, timeout: Duration) -> NetworkError {
    let message = error_chain(err);

    if err.is_timeout() {
        return NetworkError::Timeout { duration: timeout };
    }
    if is_connection_reset(err) || message.contains("connection closed before message completed")
    {
        return NetworkError::ConnectionReset { message };
    }
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("certificate") || lowered.contains("tls") {
        return NetworkError::Tls { message };
    }
    if err.is_connect() {
        return NetworkError::ConnectionFailed { message };
    }
    if err.is_body() || err.is_decode() {
        return NetworkError::BodyStream { message };
    }
    NetworkError::Protocol { message }
}

/// Builder for reqwest transport.
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    request_timeout: Duration,
    pool: PoolConfig,
    pool_max_idle_per_host: usize,
    verify_ssl: bool,
    user_agent: String,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            pool: PoolConfig::default(),
            pool_max_idle_per_host: 32,
            verify_ssl: true,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long to wait for response headers on a buffered exchange.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pool limits.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set whether to verify SSL certificates.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, AwsError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host.min(self.pool.max_connections))
            .pool_idle_timeout(Some(self.pool.idle_timeout))
            .danger_accept_invalid_certs(!self.verify_ssl)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ConfigurationError::HttpClient {
                message: error_chain(&e),
            })?;

        Ok(ReqwestTransport {
            client,
            pool: Arc::new(ConnectionPool::new(self.pool)),
            request_timeout: self.request_timeout,
        })
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
