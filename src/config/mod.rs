//! Configuration types for the S3 and SQS connections.
//!
//! This module provides the `AwsConfig` type, covering region, credentials,
//! endpoints, timeouts, retry and connection pool settings.

use crate::credentials::{CredentialsProvider, EnvCredentialsProvider};
use crate::error::{AwsError, ConfigurationError};
use crate::resilience::RetryConfig;
use crate::transport::PoolConfig;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("libaws-rs/", env!("CARGO_PKG_VERSION"));

/// Configuration shared by S3 and SQS connections.
#[derive(Clone)]
pub struct AwsConfig {
    /// AWS region (e.g., "us-east-1").
    pub region: String,

    /// Credentials provider.
    pub credentials_provider: Arc<dyn CredentialsProvider>,

    /// Custom S3 endpoint URL (for S3-compatible services).
    pub endpoint: Option<Url>,

    /// Custom SQS endpoint URL.
    pub sqs_endpoint: Option<Url>,

    /// Use path-style addressing instead of virtual-hosted style.
    ///
    /// Path-style: `https://s3.region.amazonaws.com/bucket/key`
    /// Virtual-hosted: `https://bucket.s3.region.amazonaws.com/key`
    pub path_style: bool,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// How long one buffered exchange may wait for response headers.
    pub request_timeout: Duration,

    /// Overall operation timeout, retries included.
    pub operation_timeout: Duration,

    /// Maximum number of retries for transient failures.
    pub max_retries: u32,

    /// Initial backoff delay for retries.
    pub initial_backoff: Duration,

    /// Maximum backoff delay.
    pub max_backoff: Duration,

    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Maximum concurrent connections in the pool.
    pub max_connections: u32,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Verify TLS certificates.
    pub verify_ssl: bool,

    /// User agent header value.
    pub user_agent: String,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("sqs_endpoint", &self.sqs_endpoint)
            .field("path_style", &self.path_style)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("max_retries", &self.max_retries)
            .field("max_connections", &self.max_connections)
            .field("verify_ssl", &self.verify_ssl)
            .finish_non_exhaustive()
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            credentials_provider: Arc::new(EnvCredentialsProvider::default()),
            endpoint: None,
            sqs_endpoint: None,
            path_style: false,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(60),
            operation_timeout: Duration::from_secs(300),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(20),
            backoff_multiplier: 2.0,
            max_connections: 100,
            idle_timeout: Duration::from_secs(90),
            verify_ssl: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AwsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AwsConfigBuilder {
        AwsConfigBuilder::default()
    }

    /// Whether requests for `bucket` put the bucket in the path.
    ///
    /// Custom endpoints and bucket names that are not valid DNS labels always
    /// use path-style addressing.
    pub fn uses_path_style(&self, bucket: &str) -> bool {
        self.path_style || self.endpoint.is_some() || !is_dns_compatible(bucket)
    }

    /// Resolve the S3 endpoint for a given bucket (or the service root).
    pub fn resolve_endpoint(&self, bucket: Option<&str>) -> Result<Url, AwsError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }

        let host = format!("s3.{}.amazonaws.com", self.region);
        let url_str = match bucket {
            Some(bucket) if !self.uses_path_style(bucket) => {
                format!("https://{}.{}", bucket, host)
            }
            _ => format!("https://{}", host),
        };

        parse_endpoint(&url_str)
    }

    /// Build the raw path for an S3 request.
    pub fn build_path(&self, bucket: &str, key: Option<&str>) -> String {
        if self.uses_path_style(bucket) {
            match key {
                Some(k) => format!("/{}/{}", bucket, k),
                None => format!("/{}", bucket),
            }
        } else {
            match key {
                Some(k) => format!("/{}", k),
                None => "/".to_string(),
            }
        }
    }

    /// Resolve the SQS service endpoint.
    pub fn resolve_sqs_endpoint(&self) -> Result<Url, AwsError> {
        match &self.sqs_endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => parse_endpoint(&format!("https://sqs.{}.amazonaws.com", self.region)),
        }
    }

    /// Retry settings derived from this configuration.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
            .with_initial_backoff(self.initial_backoff)
            .with_max_backoff(self.max_backoff)
            .with_multiplier(self.backoff_multiplier)
    }

    /// Connection pool settings derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections as usize,
            idle_timeout: self.idle_timeout,
        }
    }
}

/// Whether a bucket name can be used as a DNS label in a virtual-hosted URL.
pub fn is_dns_compatible(bucket: &str) -> bool {
    let len_ok = (3..=63).contains(&bucket.len());
    let chars_ok = bucket
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    let edges_ok = bucket
        .bytes()
        .next()
        .map(|b| b.is_ascii_alphanumeric())
        .unwrap_or(false)
        && bucket
            .bytes()
            .last()
            .map(|b| b.is_ascii_alphanumeric())
            .unwrap_or(false);
    len_ok && chars_ok && edges_ok
}

fn parse_endpoint(url: &str) -> Result<Url, AwsError> {
    Url::parse(url).map_err(|e| {
        AwsError::Configuration(ConfigurationError::InvalidEndpoint {
            url: url.to_string(),
            details: e.to_string(),
        })
    })
}

/// Builder for [`AwsConfig`].
#[derive(Default)]
pub struct AwsConfigBuilder {
    region: Option<String>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    endpoint: Option<Url>,
    sqs_endpoint: Option<Url>,
    path_style: Option<bool>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    backoff_multiplier: Option<f64>,
    max_connections: Option<u32>,
    idle_timeout: Option<Duration>,
    verify_ssl: Option<bool>,
    user_agent: Option<String>,
}

impl AwsConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the credentials provider.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Set a custom S3 endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, AwsError> {
        self.endpoint = Some(parse_endpoint(&endpoint.into())?);
        Ok(self)
    }

    /// Set a custom S3 endpoint URL (infallible version).
    pub fn endpoint_url(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set a custom SQS endpoint URL.
    pub fn sqs_endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, AwsError> {
        self.sqs_endpoint = Some(parse_endpoint(&endpoint.into())?);
        Ok(self)
    }

    /// Enable path-style addressing.
    pub fn path_style(mut self, enabled: bool) -> Self {
        self.path_style = Some(enabled);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-exchange request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the overall operation timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the initial backoff delay.
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Set the maximum backoff delay.
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Set the maximum concurrent connections.
    pub fn max_connections(mut self, connections: u32) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Set the idle connection timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Enable or disable TLS verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values are ignored.
    pub fn from_env(mut self) -> Self {
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.region = Some(region);
        } else if let Ok(region) = std::env::var("AWS_DEFAULT_REGION") {
            self.region = Some(region);
        }

        let shared_endpoint = env_url("AWS_ENDPOINT_URL");
        if let Some(url) = env_url("AWS_ENDPOINT_URL_S3").or_else(|| shared_endpoint.clone()) {
            self.endpoint = Some(url);
        }
        if let Some(url) = env_url("AWS_ENDPOINT_URL_SQS").or(shared_endpoint) {
            self.sqs_endpoint = Some(url);
        }

        if let Ok(val) = std::env::var("LIBAWS_PATH_STYLE") {
            self.path_style = Some(val.eq_ignore_ascii_case("true"));
        }
        if let Some(retries) = env_parse("LIBAWS_MAX_RETRIES") {
            self.max_retries = Some(retries);
        }
        if let Some(ms) = env_parse("LIBAWS_TIMEOUT_MS") {
            self.operation_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(connections) = env_parse("LIBAWS_MAX_CONNECTIONS") {
            self.max_connections = Some(connections);
        }

        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<AwsConfig, AwsError> {
        let defaults = AwsConfig::default();

        let region = self.region.unwrap_or(defaults.region);
        if region.trim().is_empty() {
            return Err(ConfigurationError::MissingRegion.into());
        }

        let backoff_multiplier = self
            .backoff_multiplier
            .unwrap_or(defaults.backoff_multiplier);
        if backoff_multiplier.is_nan() || backoff_multiplier < 1.0 {
            return Err(invalid("backoff_multiplier", "must be at least 1.0"));
        }

        let max_connections = self.max_connections.unwrap_or(defaults.max_connections);
        if max_connections == 0 {
            return Err(invalid("max_connections", "must be at least 1"));
        }

        Ok(AwsConfig {
            region,
            credentials_provider: self
                .credentials_provider
                .unwrap_or(defaults.credentials_provider),
            endpoint: self.endpoint,
            sqs_endpoint: self.sqs_endpoint,
            path_style: self.path_style.unwrap_or(defaults.path_style),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            operation_timeout: self.operation_timeout.unwrap_or(defaults.operation_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            backoff_multiplier,
            max_connections,
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        })
    }
}

fn invalid(field: &str, message: &str) -> AwsError {
    AwsError::Configuration(ConfigurationError::InvalidConfiguration {
        field: field.to_string(),
        message: message.to_string(),
    })
}

fn env_url(name: &str) -> Option<Url> {
    std::env::var(name).ok().and_then(|v| Url::parse(&v).ok())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AwsConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert!(config.endpoint.is_none());
        assert!(!config.path_style);
        assert_eq!(config.max_retries, 3);
        assert!(config.user_agent.starts_with("libaws-rs/"));
    }

    #[test]
    fn test_builder() {
        let config = AwsConfig::builder()
            .region("eu-west-1")
            .max_retries(5)
            .path_style(true)
            .build()
            .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.max_retries, 5);
        assert!(config.path_style);
        assert_eq!(config.retry_config().max_retries, 5);
    }

    #[test]
    fn test_builder_validation() {
        assert!(AwsConfig::builder().region("  ").build().is_err());
        assert!(AwsConfig::builder().backoff_multiplier(0.5).build().is_err());
        assert!(AwsConfig::builder().max_connections(0).build().is_err());
        assert!(AwsConfig::builder().endpoint("not a url").is_err());
    }

    #[test]
    fn test_resolve_endpoint_default() {
        let config = AwsConfig::default();
        let endpoint = config.resolve_endpoint(Some("my-bucket")).unwrap();
        assert_eq!(
            endpoint.as_str(),
            "https://my-bucket.s3.us-east-1.amazonaws.com/"
        );
        let root = config.resolve_endpoint(None).unwrap();
        assert_eq!(root.as_str(), "https://s3.us-east-1.amazonaws.com/");
    }

    #[test]
    fn test_resolve_endpoint_path_style() {
        let config = AwsConfig::builder().path_style(true).build().unwrap();
        let endpoint = config.resolve_endpoint(Some("my-bucket")).unwrap();
        assert_eq!(endpoint.as_str(), "https://s3.us-east-1.amazonaws.com/");
    }

    #[test]
    fn test_resolve_endpoint_custom() {
        let config = AwsConfig::builder()
            .endpoint("http://localhost:9000")
            .unwrap()
            .build()
            .unwrap();
        let endpoint = config.resolve_endpoint(Some("my-bucket")).unwrap();
        assert_eq!(endpoint.as_str(), "http://localhost:9000/");
        assert_eq!(config.build_path("my-bucket", Some("k")), "/my-bucket/k");
    }

    #[test]
    fn test_non_dns_bucket_falls_back_to_path_style() {
        let config = AwsConfig::default();
        assert!(config.uses_path_style("My_Bucket"));
        assert!(config.uses_path_style("dotted.bucket"));
        assert_eq!(config.build_path("My_Bucket", Some("k")), "/My_Bucket/k");
        assert_eq!(
            config.resolve_endpoint(Some("My_Bucket")).unwrap().as_str(),
            "https://s3.us-east-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_build_path_virtual_hosted() {
        let config = AwsConfig::default();
        assert_eq!(config.build_path("bucket", Some("key/path")), "/key/path");
        assert_eq!(config.build_path("bucket", None), "/");
    }

    #[test]
    fn test_sqs_endpoint() {
        let config = AwsConfig::builder().region("eu-west-1").build().unwrap();
        assert_eq!(
            config.resolve_sqs_endpoint().unwrap().as_str(),
            "https://sqs.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn test_debug_omits_credentials() {
        let debug = format!("{:?}", AwsConfig::default());
        assert!(!debug.contains("credentials_provider"));
    }
}
