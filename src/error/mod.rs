//! Error types for the S3 and SQS client.
//!
//! Errors fall into three families:
//!
//! - construction faults (`Configuration`, `Credentials`, `Signing`, `Request`)
//!   are raised before any network I/O and are never retried;
//! - transport faults (`Transport`) wrap connectivity, timeout and protocol
//!   failures and are retried only for idempotent operations;
//! - service faults (`Service`) carry the status, error code, message and
//!   request id the service returned.
//!
//! Every fault that happens while an operation is in flight records the
//! [`Operation`] and the resource it targeted, so the `Display` output can be
//! logged verbatim.

mod mapping;

pub use mapping::{classify, is_transient_code, ServiceErrorResponse};
pub(crate) use mapping::service_error;

use crate::request::Operation;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Request signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Malformed request input detected before any I/O.
    #[error("Request error: {0}")]
    Request(#[from] RequestFault),

    /// Connectivity, timeout and protocol failures.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportFault),

    /// Non-success response reported by the service.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// A success response that could not be decoded.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Body streaming and integrity errors.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferFault),
}

impl AwsError {
    /// Returns true if the error is transient and may succeed on retry.
    ///
    /// Whether a retry actually happens also depends on the operation being
    /// idempotent; see [`Operation::is_idempotent`].
    pub fn is_retryable(&self) -> bool {
        match self {
            AwsError::Transport(fault) => fault.source.is_retryable(),
            AwsError::Service(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns true for faults raised before any network I/O.
    pub fn is_construction_fault(&self) -> bool {
        matches!(
            self,
            AwsError::Configuration(_)
                | AwsError::Credentials(_)
                | AwsError::Signing(_)
                | AwsError::Request(_)
        )
    }

    /// Returns true if the service reported a missing bucket, key or queue.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::Service(e) if e.kind.is_not_found())
    }

    /// The operation that failed.
    ///
    /// Configuration, credential and signing faults are not tied to one
    /// operation and return `None`.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            AwsError::Request(fault) => Some(fault.operation),
            AwsError::Transport(fault) => Some(fault.operation),
            AwsError::Service(e) => Some(e.operation),
            AwsError::Response(e) => Some(e.operation()),
            AwsError::Transfer(fault) => Some(fault.operation),
            _ => None,
        }
    }

    /// The bucket/key or queue the failed operation targeted.
    pub fn resource(&self) -> Option<&str> {
        match self {
            AwsError::Request(fault) => Some(&fault.resource),
            AwsError::Transport(fault) => Some(&fault.resource),
            AwsError::Service(e) => Some(&e.resource),
            AwsError::Transfer(fault) => Some(&fault.resource),
            _ => None,
        }
    }

    /// Returns the HTTP status code if the service answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AwsError::Service(e) => Some(e.status),
            _ => None,
        }
    }

    /// Returns the service error code (e.g. `NoSuchKey`) if available.
    pub fn service_code(&self) -> Option<&str> {
        match self {
            AwsError::Service(e) => e.code.as_deref(),
            _ => None,
        }
    }

    /// Returns the request id echoed by the service, if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AwsError::Service(e) => e.request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the service error classification, if this is a service fault.
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            AwsError::Service(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing required region configuration.
    #[error("Missing region: region must be specified via config or environment")]
    MissingRegion,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {message}")]
    HttpClient {
        /// Details from the HTTP stack.
        message: String,
    },

    /// The connection factory was already shut down.
    #[error("Connection factory has been shut down")]
    FactoryShutDown,
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: {message}")]
    NotFound {
        /// Where the lookup failed.
        message: String,
    },

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },
}

/// Request signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The resource path is not absolute.
    #[error("Invalid resource path '{path}': must start with '/'")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// A header value cannot be represented in the canonical request.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// Signature calculation failed.
    #[error("Signature calculation failed: {message}")]
    CalculationFailed {
        /// Details about the calculation error.
        message: String,
    },
}

/// Construction faults: malformed input detected before any network I/O.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A required name was empty.
    #[error("{field} must not be empty")]
    EmptyName {
        /// Which name was empty (bucket, key, queue name, ...).
        field: &'static str,
    },

    /// Invalid bucket name.
    #[error("Invalid bucket name '{bucket}': {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        bucket: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// Invalid object key.
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey {
        /// The invalid key.
        key: String,
        /// Why the key is invalid.
        reason: String,
    },

    /// The size of a stream body could not be determined.
    #[error("Stream size unknown: {message}")]
    SizeUnknown {
        /// Details from the failed seek.
        message: String,
    },

    /// A queue URL could not be parsed.
    #[error("Invalid queue URL '{url}': {details}")]
    InvalidQueueUrl {
        /// The rejected URL.
        url: String,
        /// Parse failure details.
        details: String,
    },

    /// A parameter is out of range.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        message: String,
    },
}

impl RequestError {
    /// Tag the fault with the operation and resource it was raised for.
    pub fn during(self, operation: Operation, resource: impl Into<String>) -> RequestFault {
        RequestFault {
            operation,
            resource: resource.into(),
            source: self,
        }
    }
}

/// Malformed input tagged with the operation and resource it was meant for.
#[derive(Debug, Error)]
#[error("{operation} ({resource}) rejected: {source}")]
pub struct RequestFault {
    /// The operation being built.
    pub operation: Operation,
    /// The bucket/key or queue the operation targeted.
    pub resource: String,
    /// What was wrong with the input.
    #[source]
    pub source: RequestError,
}

/// Low-level network failures reported by a transport.
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    /// The connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Details from the HTTP stack.
        message: String,
    },

    /// The peer reset the connection.
    #[error("Connection reset: {message}")]
    ConnectionReset {
        /// Details from the HTTP stack.
        message: String,
    },

    /// The request did not complete in time.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// TLS negotiation failed.
    #[error("TLS error: {message}")]
    Tls {
        /// Details from the TLS stack.
        message: String,
    },

    /// A request or response body stream failed mid-transfer.
    #[error("Body stream error: {message}")]
    BodyStream {
        /// Details about the failure.
        message: String,
    },

    /// Any other HTTP protocol failure.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Details from the HTTP stack.
        message: String,
    },

    /// The connection pool was closed by a shutdown.
    #[error("Connection pool is closed")]
    PoolClosed,
}

impl NetworkError {
    /// Returns true if the failure is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::ConnectionReset { .. }
                | NetworkError::Timeout { .. }
        )
    }
}

/// A network failure tagged with the operation and resource it interrupted.
#[derive(Debug, Error)]
#[error("{operation} ({resource}) failed: {source}")]
pub struct TransportFault {
    /// The operation in flight.
    pub operation: Operation,
    /// The bucket/key or queue the operation targeted.
    pub resource: String,
    /// The underlying network failure.
    #[source]
    pub source: NetworkError,
}

/// Classification of a service fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// The bucket does not exist.
    BucketNotFound,
    /// The object key does not exist.
    ObjectNotFound,
    /// The queue does not exist.
    QueueNotFound,
    /// Some other resource does not exist (status-only 404).
    NotFound,
    /// The resource already exists.
    AlreadyExists,
    /// The bucket still contains objects.
    NotEmpty,
    /// Authentication or authorization failed.
    AccessDenied,
    /// The service rejected the request parameters.
    InvalidRequest,
    /// A conditional header did not match.
    PreconditionFailed,
    /// The caller is being throttled.
    Throttled,
    /// The service failed internally.
    ServerError,
    /// Anything not covered above.
    Other,
}

impl ServiceErrorKind {
    /// Returns true for the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceErrorKind::BucketNotFound
                | ServiceErrorKind::ObjectNotFound
                | ServiceErrorKind::QueueNotFound
                | ServiceErrorKind::NotFound
        )
    }
}

/// A non-success response reported by the service.
#[derive(Debug, Clone)]
pub struct ServiceError {
    /// The failing operation.
    pub operation: Operation,
    /// The bucket/key or queue the operation targeted.
    pub resource: String,
    /// Classification derived from the code and status.
    pub kind: ServiceErrorKind,
    /// HTTP status code.
    pub status: u16,
    /// Service error code, when the body carried one.
    pub code: Option<String>,
    /// Service error message, or the status line when no body was sent.
    pub message: String,
    /// Request id echoed by the service.
    pub request_id: Option<String>,
    /// Extended request id (S3 `HostId`).
    pub host_id: Option<String>,
}

impl ServiceError {
    /// Returns true for whitelisted server-side transient failures.
    pub fn is_transient(&self) -> bool {
        matches!(self.status, 500 | 502 | 503 | 504)
            || self.code.as_deref().map(is_transient_code).unwrap_or(false)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) failed with status {}", self.operation, self.resource, self.status)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

/// A success response that could not be decoded.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The XML body was malformed.
    #[error("{operation}: malformed XML response: {message}")]
    XmlParse {
        /// The operation whose response failed to parse.
        operation: Operation,
        /// Parser details.
        message: String,
    },

    /// A required element or header was absent.
    #[error("{operation}: response is missing {field}")]
    MissingField {
        /// The operation whose response was incomplete.
        operation: Operation,
        /// The missing field.
        field: &'static str,
    },

    /// A header had a value that could not be interpreted.
    #[error("{operation}: invalid value '{value}' for header {header}")]
    InvalidHeader {
        /// The operation whose response was malformed.
        operation: Operation,
        /// Header name.
        header: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl ResponseError {
    /// The operation whose response was rejected.
    pub fn operation(&self) -> Operation {
        match self {
            ResponseError::XmlParse { operation, .. }
            | ResponseError::MissingField { operation, .. }
            | ResponseError::InvalidHeader { operation, .. } => *operation,
        }
    }
}

/// Body streaming and integrity errors.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading the caller's stream failed.
    #[error("Reading source stream failed: {message}")]
    StreamRead {
        /// Details from the reader.
        message: String,
    },

    /// The caller's stream ended before the declared length.
    #[error("Source stream ended after {received} of {expected} bytes")]
    IncompleteBody {
        /// Declared length.
        expected: u64,
        /// Bytes actually read.
        received: u64,
    },

    /// Writing into the caller's sink failed.
    #[error("Writing to destination failed after {bytes_written} bytes: {message}")]
    Write {
        /// Bytes written before the failure.
        bytes_written: u64,
        /// Details from the writer.
        message: String,
    },

    /// A body digest did not match.
    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Digest reported by the service.
        expected: String,
        /// Digest computed locally.
        actual: String,
    },

    /// The response body stream failed.
    #[error("Response body interrupted: {source}")]
    Interrupted {
        /// The network failure.
        #[source]
        source: NetworkError,
    },
}

impl TransferError {
    /// Tag the fault with the operation and resource whose body failed.
    pub fn during(self, operation: Operation, resource: impl Into<String>) -> TransferFault {
        TransferFault {
            operation,
            resource: resource.into(),
            source: self,
        }
    }
}

/// A body failure tagged with the operation and resource it interrupted.
#[derive(Debug, Error)]
#[error("{operation} ({resource}) failed: {source}")]
pub struct TransferFault {
    /// The operation whose body failed.
    pub operation: Operation,
    /// The bucket/key or queue the operation targeted.
    pub resource: String,
    /// The underlying body failure.
    #[source]
    pub source: TransferError,
}
