//! Scripted HTTP transport for testing.

use crate::error::NetworkError;
use crate::transport::{BodyStream, HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Create a response with the given status and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::ok().with_body(body)
    }

    /// Create a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(204)
    }

    /// Create an error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status).with_body(body)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    fn into_http_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body.into(),
        }
    }
}

type Reply = Result<MockResponse, NetworkError>;

/// Mock HTTP transport for testing.
///
/// Replies are handed out in the order they were queued; once the queue is
/// empty the default reply (if any) is used. Every request is recorded,
/// including the drained body of streamed uploads.
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
    default_reply: Option<Reply>,
    shut_down: AtomicBool,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::from_parts(Vec::new(), None)
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self::from_parts(responses.into_iter().map(Ok).collect(), None)
    }

    /// Create a mock transport with a default response.
    pub fn with_default(response: MockResponse) -> Self {
        Self::from_parts(Vec::new(), Some(Ok(response)))
    }

    /// Create a mock transport that fails every exchange with `error`.
    pub fn failing(error: NetworkError) -> Self {
        Self::from_parts(Vec::new(), Some(Err(error)))
    }

    fn from_parts(replies: Vec<Reply>, default_reply: Option<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            default_reply,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.replies.lock().push_back(Ok(response));
    }

    /// Queue a network failure.
    pub fn queue_error(&self, error: NetworkError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Whether [`HttpTransport::shutdown`] was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn reply(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        self.requests.lock().push(request);
        if self.is_shut_down() {
            return Err(NetworkError::PoolClosed);
        }

        let next = self.replies.lock().pop_front();
        match next.or_else(|| self.default_reply.clone()) {
            Some(Ok(mock)) => Ok(mock.into_http_response()),
            Some(Err(error)) => Err(error),
            None => Err(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            }),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a streamed request body to the end.
pub(crate) async fn drain(mut body: BodyStream) -> Result<Bytes, NetworkError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| NetworkError::BodyStream {
            message: e.to_string(),
        })?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        self.reply(request)
    }

    async fn send_streaming(
        &self,
        mut request: HttpRequest,
        body: BodyStream,
    ) -> Result<HttpResponse, NetworkError> {
        let drained = drain(body).await;
        match drained {
            Ok(bytes) => {
                request.body = Some(bytes);
                self.reply(request)
            }
            Err(e) => {
                self.requests.lock().push(request);
                Err(e)
            }
        }
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_replies", &self.replies.lock().len())
            .field("recorded_requests", &self.requests.lock().len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
