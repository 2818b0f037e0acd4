//! Sign, send, classify and retry one operation.

use super::body::{body_channel, pump};
use super::{HttpResponse, HttpTransport, PoolPermit};
use crate::config::AwsConfig;
use crate::error::{AwsError, NetworkError, TransportFault};
use crate::request::OperationRequest;
use crate::resilience::{RetryConfig, RetryPolicy};
use crate::response::check_status;
use crate::signing::AwsSigner;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tracing::debug;

/// Drives an [`OperationRequest`] through signing and the transport.
///
/// Every attempt checks out a pool slot and is then signed afresh, so the
/// signature is never older than the wait for a connection. Failed attempts are replayed only when the
/// request is retryable (idempotent operation, replayable body) and the
/// failure is transient. The whole call, retries included, is bounded by the
/// operation timeout.
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
    retry: RetryPolicy,
    operation_timeout: Duration,
}

impl RequestExecutor {
    /// Create an executor.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AwsSigner>,
        retry: RetryConfig,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            signer,
            retry: RetryPolicy::new(retry),
            operation_timeout,
        }
    }

    /// Create an executor using the retry and timeout settings of `config`.
    pub fn from_config(
        config: &AwsConfig,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AwsSigner>,
    ) -> Self {
        Self::new(
            transport,
            signer,
            config.retry_config(),
            config.operation_timeout,
        )
    }

    /// Execute a request with an empty or in-memory body.
    ///
    /// Returns the response for any 2xx or 304 status; other statuses become
    /// service faults.
    pub async fn execute(&self, request: &OperationRequest) -> Result<HttpResponse, AwsError> {
        let run = async {
            if request.is_retryable() {
                self.retry
                    .execute(|attempt| self.attempt(request, attempt))
                    .await
            } else {
                self.attempt(request, 0).await
            }
        };
        self.bounded(request, run).await
    }

    /// Execute a request whose body is read from `reader`.
    ///
    /// Exactly `request.body().content_length()` bytes are read. The reader is
    /// only borrowed for this call and the request is never replayed.
    pub async fn execute_streaming<R>(
        &self,
        request: &OperationRequest,
        reader: &mut R,
    ) -> Result<HttpResponse, AwsError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let length = request.body().content_length();
        let run = async {
            let permit = self.reserve(request).await?;
            let signed = self.signer.sign(request).await?;
            debug!(
                operation = %request.operation(),
                url = signed.url(),
                length,
                "Dispatching streamed request"
            );

            let (sender, body) = body_channel();
            let send = self
                .transport
                .send_streaming(signed.into_http_request(None), body);
            let (sent, pumped) = tokio::join!(send, pump(reader, length, sender));

            // A reader failure also aborts the exchange; report the cause.
            pumped.map_err(|e| e.during(request.operation(), request.resource()))?;
            let response = sent
                .map_err(|source| fault(request, source))?
                .holding(permit);
            debug!(status = response.status, "Received response");
            check_status(request, response).await
        };
        self.bounded(request, run).await
    }

    async fn attempt(&self, request: &OperationRequest, attempt: u32) -> Result<HttpResponse, AwsError> {
        let permit = self.reserve(request).await?;
        let signed = self.signer.sign(request).await?;
        debug!(
            operation = %request.operation(),
            method = signed.method(),
            url = signed.url(),
            attempt,
            "Dispatching request"
        );

        let http_request = signed.into_http_request(request.body().as_bytes().cloned());
        let response = self
            .transport
            .send(http_request)
            .await
            .map_err(|source| fault(request, source))?
            .holding(permit);

        debug!(status = response.status, "Received response");
        check_status(request, response).await
    }

    async fn reserve(&self, request: &OperationRequest) -> Result<Option<PoolPermit>, AwsError> {
        match self.transport.pool() {
            Some(pool) => pool
                .acquire()
                .await
                .map(Some)
                .map_err(|source| fault(request, source)),
            None => Ok(None),
        }
    }

    async fn bounded<F, T>(&self, request: &OperationRequest, fut: F) -> Result<T, AwsError>
    where
        F: Future<Output = Result<T, AwsError>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(fault(
                request,
                NetworkError::Timeout {
                    duration: self.operation_timeout,
                },
            )),
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("retry", &self.retry)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

fn fault(request: &OperationRequest, source: NetworkError) -> AwsError {
    AwsError::Transport(TransportFault {
        operation: request.operation(),
        resource: request.resource().to_string(),
        source,
    })
}
