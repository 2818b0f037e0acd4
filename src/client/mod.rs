//! Connections: the per-service public interface.
//!
//! An [`S3Connection`] groups the bucket and object operations, an
//! [`SqsConnection`] the queue operations. A connection holds its
//! configuration, credentials and a handle on the shared transport; it keeps
//! no state between calls and can be shared across tasks.

mod factory;

pub use factory::{ConnectionFactory, ConnectionFactoryBuilder};

use crate::config::AwsConfig;
use crate::error::AwsError;
use crate::request::ServiceKind;
use crate::services::{BucketsService, ObjectsService, QueuesService};
use crate::signing::{AwsSigner, AwsSignerV4};
use crate::transport::{HttpTransport, ReqwestTransport, RequestExecutor};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Object storage connection.
pub trait S3Connection: Send + Sync {
    /// Get the buckets service.
    fn buckets(&self) -> &BucketsService;

    /// Get the objects service.
    fn objects(&self) -> &ObjectsService;

    /// Get the connection configuration.
    fn config(&self) -> &AwsConfig;
}

/// Message queue connection.
pub trait SqsConnection: Send + Sync {
    /// Get the queues service.
    fn queues(&self) -> &QueuesService;

    /// Get the connection configuration.
    fn config(&self) -> &AwsConfig;
}

fn executor(
    config: &AwsConfig,
    transport: Arc<dyn HttpTransport>,
    signer: Option<Arc<dyn AwsSigner>>,
    service: ServiceKind,
) -> Arc<RequestExecutor> {
    let signer = signer.unwrap_or_else(|| {
        Arc::new(AwsSignerV4::new(
            config.credentials_provider.clone(),
            &config.region,
            service.signing_name(),
        ))
    });
    Arc::new(RequestExecutor::from_config(config, transport, signer))
}

/// S3 connection implementation.
pub struct S3ConnectionImpl {
    config: Arc<AwsConfig>,
    executor: Arc<RequestExecutor>,

    // Lazy-initialized services
    buckets: OnceCell<BucketsService>,
    objects: OnceCell<ObjectsService>,
}

impl S3ConnectionImpl {
    /// Create a connection that signs with the credentials of `config`.
    pub fn new(config: AwsConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_signer(config, transport, None)
    }

    /// Create a connection with a custom signer.
    pub fn with_signer(
        config: AwsConfig,
        transport: Arc<dyn HttpTransport>,
        signer: Option<Arc<dyn AwsSigner>>,
    ) -> Self {
        let executor = executor(&config, transport, signer, ServiceKind::S3);
        Self {
            config: Arc::new(config),
            executor,
            buckets: OnceCell::new(),
            objects: OnceCell::new(),
        }
    }

    /// Create a builder.
    pub fn builder() -> S3ConnectionBuilder {
        S3ConnectionBuilder::new()
    }
}

impl S3Connection for S3ConnectionImpl {
    fn buckets(&self) -> &BucketsService {
        self.buckets
            .get_or_init(|| BucketsService::new(self.config.clone(), self.executor.clone()))
    }

    fn objects(&self) -> &ObjectsService {
        self.objects
            .get_or_init(|| ObjectsService::new(self.config.clone(), self.executor.clone()))
    }

    fn config(&self) -> &AwsConfig {
        &self.config
    }
}

impl std::fmt::Debug for S3ConnectionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ConnectionImpl")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// SQS connection implementation.
pub struct SqsConnectionImpl {
    config: Arc<AwsConfig>,
    executor: Arc<RequestExecutor>,
    queues: OnceCell<QueuesService>,
}

impl SqsConnectionImpl {
    /// Create a connection that signs with the credentials of `config`.
    pub fn new(config: AwsConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_signer(config, transport, None)
    }

    /// Create a connection with a custom signer.
    pub fn with_signer(
        config: AwsConfig,
        transport: Arc<dyn HttpTransport>,
        signer: Option<Arc<dyn AwsSigner>>,
    ) -> Self {
        let executor = executor(&config, transport, signer, ServiceKind::Sqs);
        Self {
            config: Arc::new(config),
            executor,
            queues: OnceCell::new(),
        }
    }

    /// Create a builder.
    pub fn builder() -> SqsConnectionBuilder {
        SqsConnectionBuilder::new()
    }
}

impl SqsConnection for SqsConnectionImpl {
    fn queues(&self) -> &QueuesService {
        self.queues
            .get_or_init(|| QueuesService::new(self.config.clone(), self.executor.clone()))
    }

    fn config(&self) -> &AwsConfig {
        &self.config
    }
}

impl std::fmt::Debug for SqsConnectionImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsConnectionImpl")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Settings shared by both connection builders.
#[derive(Default)]
struct BuilderParts {
    config: Option<AwsConfig>,
    from_env: bool,
    transport: Option<Arc<dyn HttpTransport>>,
    signer: Option<Arc<dyn AwsSigner>>,
}

impl BuilderParts {
    fn resolve(
        self,
    ) -> Result<(AwsConfig, Arc<dyn HttpTransport>, Option<Arc<dyn AwsSigner>>), AwsError> {
        let config = if let Some(config) = self.config {
            config
        } else if self.from_env {
            AwsConfig::builder().from_env().build()?
        } else {
            AwsConfig::default()
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };

        Ok((config, transport, self.signer))
    }
}

macro_rules! connection_builder {
    ($(#[$doc:meta])* $builder:ident => $connection:ident) => {
        $(#[$doc])*
        #[derive(Default)]
        pub struct $builder {
            parts: BuilderParts,
        }

        impl $builder {
            /// Create a new builder.
            pub fn new() -> Self {
                Self::default()
            }

            /// Use the provided configuration.
            pub fn config(mut self, config: AwsConfig) -> Self {
                self.parts.config = Some(config);
                self
            }

            /// Load configuration from environment variables.
            pub fn from_env(mut self) -> Self {
                self.parts.from_env = true;
                self
            }

            /// Use a custom HTTP transport.
            pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
                self.parts.transport = Some(transport);
                self
            }

            /// Use a custom request signer.
            pub fn signer(mut self, signer: Arc<dyn AwsSigner>) -> Self {
                self.parts.signer = Some(signer);
                self
            }

            /// Build the connection.
            pub fn build(self) -> Result<$connection, AwsError> {
                let (config, transport, signer) = self.parts.resolve()?;
                Ok($connection::with_signer(config, transport, signer))
            }
        }
    };
}

connection_builder!(
    /// Builder for [`S3ConnectionImpl`].
    S3ConnectionBuilder => S3ConnectionImpl
);

connection_builder!(
    /// Builder for [`SqsConnectionImpl`].
    SqsConnectionBuilder => SqsConnectionImpl
);
