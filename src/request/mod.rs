//! Request building.
//!
//! Every logical operation is turned into an [`OperationRequest`]: a fully
//! validated description of method, target, query parameters, headers and
//! body, independent of how it will be signed or sent. Builders live in
//! [`s3`] and [`sqs`]; they perform all input validation so that malformed
//! input fails before any I/O.

pub mod s3;
pub mod sqs;

use crate::signing::canonical::{build_canonical_query_string, uri_encode_path};
use bytes::Bytes;
use http::Method;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// The remote service an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Object storage.
    S3,
    /// Message queues.
    Sqs,
}

impl ServiceKind {
    /// Service name used in the signature credential scope.
    pub fn signing_name(&self) -> &'static str {
        match self {
            ServiceKind::S3 => "s3",
            ServiceKind::Sqs => "sqs",
        }
    }
}

/// Logical operations exposed by the connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a bucket.
    CreateBucket,
    /// List the buckets owned by the caller.
    ListAllBuckets,
    /// Delete an empty bucket.
    DeleteBucket,
    /// List the objects of a bucket.
    ListBucket,
    /// Upload an object.
    Put,
    /// Download an object.
    Get,
    /// Delete an object.
    Delete,
    /// Fetch object metadata.
    Head,
    /// Create a queue.
    CreateQueue,
    /// List queues.
    ListQueues,
    /// Delete a queue.
    DeleteQueue,
    /// Send a message to a queue.
    SendMessage,
    /// Receive messages from a queue.
    ReceiveMessage,
    /// Delete a received message.
    DeleteMessage,
}

impl Operation {
    /// Operation name as used in logs and fault messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateBucket => "createBucket",
            Operation::ListAllBuckets => "listAllBuckets",
            Operation::DeleteBucket => "deleteBucket",
            Operation::ListBucket => "listBucket",
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Delete => "delete",
            Operation::Head => "head",
            Operation::CreateQueue => "createQueue",
            Operation::ListQueues => "listQueues",
            Operation::DeleteQueue => "deleteQueue",
            Operation::SendMessage => "sendMessage",
            Operation::ReceiveMessage => "receiveMessage",
            Operation::DeleteMessage => "deleteMessage",
        }
    }

    /// The service this operation belongs to.
    pub fn service(&self) -> ServiceKind {
        match self {
            Operation::CreateQueue
            | Operation::ListQueues
            | Operation::DeleteQueue
            | Operation::SendMessage
            | Operation::ReceiveMessage
            | Operation::DeleteMessage => ServiceKind::Sqs,
            _ => ServiceKind::S3,
        }
    }

    /// Whether replaying the operation cannot produce a different effect.
    ///
    /// Bucket creation and deletion are excluded because a replay after an
    /// unseen success turns into a conflict or not-found fault. Message sends
    /// and receives are excluded because a replay duplicates or hides
    /// messages.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Operation::ListAllBuckets
                | Operation::ListBucket
                | Operation::Put
                | Operation::Get
                | Operation::Delete
                | Operation::Head
                | Operation::CreateQueue
                | Operation::ListQueues
                | Operation::DeleteMessage
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of an operation request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// An in-memory body; replayable.
    Buffered(Bytes),
    /// A body streamed from a caller-supplied reader of known length.
    Streaming {
        /// Number of bytes that will be sent.
        content_length: u64,
    },
}

impl RequestBody {
    /// Number of bytes the body will carry.
    pub fn content_length(&self) -> u64 {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Buffered(bytes) => bytes.len() as u64,
            RequestBody::Streaming { content_length } => *content_length,
        }
    }

    /// Returns the in-memory bytes, if any.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RequestBody::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns true for streamed bodies.
    pub fn is_streaming(&self) -> bool {
        matches!(self, RequestBody::Streaming { .. })
    }
}

/// A validated, unsigned request for one operation.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    operation: Operation,
    resource: String,
    method: Method,
    endpoint: Url,
    path: String,
    query: BTreeMap<String, String>,
    headers: BTreeMap<String, String>,
    body: RequestBody,
}

impl OperationRequest {
    /// Create a request. `path` is the raw, unencoded absolute path.
    pub(crate) fn new(
        operation: Operation,
        resource: impl Into<String>,
        method: Method,
        endpoint: Url,
        path: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            resource: resource.into(),
            method,
            endpoint,
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Add a query parameter.
    pub(crate) fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a header. Names are stored lowercased.
    pub(crate) fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the body and the matching `content-length` header.
    pub(crate) fn with_body(mut self, body: RequestBody) -> Self {
        if !matches!(body, RequestBody::Empty) {
            self.headers
                .insert("content-length".to_string(), body.content_length().to_string());
        }
        self.body = body;
        self
    }

    /// The logical operation.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Human-readable target (bucket/key, bucket, queue name or URL).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Endpoint the request is sent to (scheme, host and port).
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Raw absolute resource path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }

    /// Headers (lowercase names).
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Request body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// The value of the `host` header for this request.
    pub fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Whether a failed attempt may be replayed.
    pub fn is_retryable(&self) -> bool {
        self.operation.is_idempotent() && !self.body.is_streaming()
    }

    /// The full request URL, encoded exactly as it is signed.
    pub fn url(&self) -> String {
        let mut url = format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.host(),
            uri_encode_path(&self.path)
        );
        let query = build_canonical_query_string(&self.query);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}
