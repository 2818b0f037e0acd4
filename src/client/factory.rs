//! Connection factory: the explicitly created, explicitly torn-down context
//! that hands out connections sharing one transport.

use super::{S3ConnectionImpl, SqsConnectionImpl};
use crate::config::AwsConfig;
use crate::credentials::{AwsCredentials, CredentialsProvider, StaticCredentialsProvider};
use crate::error::{AwsError, ConfigurationError};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Creates S3 and SQS connections over a shared transport.
///
/// Connections created by one factory share its connection pool. After
/// [`shutdown`](Self::shutdown) the pool is closed: requests in flight on
/// existing connections fail with a transport fault and no new connections
/// can be created.
pub struct ConnectionFactory {
    config: AwsConfig,
    transport: Arc<dyn HttpTransport>,
    shut_down: AtomicBool,
}

impl ConnectionFactory {
    /// Create a factory with its own HTTP transport.
    pub fn new(config: AwsConfig) -> Result<Self, AwsError> {
        let transport = Arc::new(ReqwestTransport::from_config(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a factory over an existing transport.
    pub fn with_transport(config: AwsConfig, transport: Arc<dyn HttpTransport>) -> Self {
        debug!(region = %config.region, "Connection factory created");
        Self {
            config,
            transport,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Create a builder.
    pub fn builder() -> ConnectionFactoryBuilder {
        ConnectionFactoryBuilder::default()
    }

    /// Library version.
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// The configuration new connections start from.
    pub fn config(&self) -> &AwsConfig {
        &self.config
    }

    /// Create an S3 connection that owns the given key pair.
    pub fn create_s3_connection(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<S3ConnectionImpl, AwsError> {
        let provider = static_provider(access_key_id, secret_access_key)?;
        self.create_s3_connection_with_provider(provider)
    }

    /// Create an S3 connection using any credentials source.
    pub fn create_s3_connection_with_provider(
        &self,
        provider: Arc<dyn CredentialsProvider>,
    ) -> Result<S3ConnectionImpl, AwsError> {
        let config = self.connection_config(provider)?;
        Ok(S3ConnectionImpl::new(config, self.transport.clone()))
    }

    /// Create an SQS connection that owns the given key pair.
    pub fn create_sqs_connection(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<SqsConnectionImpl, AwsError> {
        let provider = static_provider(access_key_id, secret_access_key)?;
        self.create_sqs_connection_with_provider(provider)
    }

    /// Create an SQS connection using any credentials source.
    pub fn create_sqs_connection_with_provider(
        &self,
        provider: Arc<dyn CredentialsProvider>,
    ) -> Result<SqsConnectionImpl, AwsError> {
        let config = self.connection_config(provider)?;
        Ok(SqsConnectionImpl::new(config, self.transport.clone()))
    }

    /// Tear down the shared transport. Calling it again has no effect.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.transport.shutdown();
            info!("Connection factory shut down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn connection_config(
        &self,
        provider: Arc<dyn CredentialsProvider>,
    ) -> Result<AwsConfig, AwsError> {
        if self.is_shut_down() {
            return Err(ConfigurationError::FactoryShutDown.into());
        }
        let mut config = self.config.clone();
        config.credentials_provider = provider;
        Ok(config)
    }
}

fn static_provider(
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<Arc<dyn CredentialsProvider>, AwsError> {
    let credentials = AwsCredentials::new(access_key_id, secret_access_key);
    credentials.validate()?;
    Ok(Arc::new(StaticCredentialsProvider::new(credentials)))
}

impl std::fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConnectionFactory`].
#[derive(Default)]
pub struct ConnectionFactoryBuilder {
    config: Option<AwsConfig>,
    from_env: bool,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ConnectionFactoryBuilder {
    /// Use the provided configuration.
    pub fn config(mut self, config: AwsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Share a custom HTTP transport between connections.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the factory.
    pub fn build(self) -> Result<ConnectionFactory, AwsError> {
        let config = match self.config {
            Some(config) => config,
            None if self.from_env => AwsConfig::builder().from_env().build()?,
            None => AwsConfig::default(),
        };
        match self.transport {
            Some(transport) => Ok(ConnectionFactory::with_transport(config, transport)),
            None => ConnectionFactory::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{S3Connection, SqsConnection};
    use crate::mocks::MockTransport;

    fn factory() -> ConnectionFactory {
        ConnectionFactory::builder()
            .transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_version() {
        assert_eq!(ConnectionFactory::version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_create_connections() {
        let factory = factory();
        let s3 = factory.create_s3_connection("AKID", "SECRET").unwrap();
        assert_eq!(s3.config().credentials_provider.name(), "static");
        let sqs = factory.create_sqs_connection("AKID", "SECRET").unwrap();
        assert_eq!(sqs.config().region, "us-east-1");
    }

    #[test]
    fn test_rejects_empty_credentials() {
        let err = factory().create_s3_connection("", "SECRET").unwrap_err();
        assert!(matches!(err, AwsError::Credentials(_)));
    }

    #[test]
    fn test_shutdown_blocks_new_connections() {
        let factory = factory();
        factory.shutdown();
        factory.shutdown();
        assert!(factory.is_shut_down());
        let err = factory.create_sqs_connection("AKID", "SECRET").unwrap_err();
        assert!(matches!(
            err,
            AwsError::Configuration(ConfigurationError::FactoryShutDown)
        ));
    }
}
