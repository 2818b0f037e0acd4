//! REST client for S3 object storage and SQS message queues.
//!
//! Every operation is one signed HTTP exchange (AWS Signature V4) whose XML
//! answer is decoded into a typed result or a typed fault.
//!
//! # Features
//!
//! - **Buckets**: create, list all, delete
//! - **Objects**: marker-paginated listing with optional delimiter roll-up,
//!   put from a buffer or a stream, get, conditional get, delete, head
//! - **Queues**: create, list, delete, send, receive, delete message
//! - **Streaming**: uploads and downloads never buffer the whole object
//! - **Resilience**: bounded retries with backoff for idempotent operations,
//!   one overall timeout per operation, a shared connection pool
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use libaws::{AwsConfig, ConnectionFactory, PutObjectRequest, S3Connection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), libaws::AwsError> {
//!     let factory = ConnectionFactory::new(AwsConfig::default())?;
//!     let s3 = factory.create_s3_connection("AKID", "SECRET")?;
//!
//!     let request = PutObjectRequest::new("my-bucket", "hello.txt");
//!     let output = s3.objects().put(&request, &b"Hello, S3!"[..]).await?;
//!     println!("Uploaded with ETag: {:?}", output.e_tag);
//!
//!     factory.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mocks;
pub mod pagination;
pub mod request;
pub mod resilience;
pub mod response;
pub mod services;
pub mod signing;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types at crate root
pub use client::{
    ConnectionFactory, ConnectionFactoryBuilder, S3Connection, S3ConnectionBuilder,
    S3ConnectionImpl, SqsConnection, SqsConnectionBuilder, SqsConnectionImpl,
};
pub use config::AwsConfig;
pub use credentials::{
    AwsCredentials, CredentialsProvider, EnvCredentialsProvider, StaticCredentialsProvider,
};
pub use error::{
    AwsError, ConfigurationError, CredentialsError, NetworkError, RequestError, RequestFault,
    ResponseError, ServiceError, ServiceErrorKind, SigningError, TransferError, TransferFault,
    TransportFault,
};
pub use pagination::ListCursor;
pub use request::{Operation, OperationRequest, ServiceKind};
pub use services::{BucketsService, ObjectsService, QueuesService};
pub use signing::{AwsSigner, AwsSignerV4};
pub use transport::{ByteStream, HttpRequest, HttpResponse, HttpTransport};
pub use types::{
    // Request types
    CreateQueueRequest,
    ListBucketRequest,
    PutObjectRequest,
    ReceiveMessageRequest,
    // Response types
    ConditionalGetOutput,
    CreateBucketOutput,
    CreateQueueOutput,
    DeleteBucketOutput,
    DeleteMessageOutput,
    DeleteObjectOutput,
    DeleteQueueOutput,
    GetObjectOutput,
    HeadObjectOutput,
    ListBucketOutput,
    ListBucketsOutput,
    ListQueuesOutput,
    PutObjectOutput,
    ReceiveMessageOutput,
    SendMessageOutput,
    // Common types
    Bucket,
    Message,
    ObjectEntry,
    ObjectSize,
    Owner,
};

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AwsError>;
