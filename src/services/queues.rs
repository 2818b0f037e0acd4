//! Queues service for SQS operations.

use crate::config::AwsConfig;
use crate::error::AwsError;
use crate::request::sqs as build;
use crate::response::sqs as parse;
use crate::transport::RequestExecutor;
use crate::types::*;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Service for SQS queue and message operations.
#[derive(Clone)]
pub struct QueuesService {
    config: Arc<AwsConfig>,
    executor: Arc<RequestExecutor>,
}

impl QueuesService {
    /// Create a new queues service.
    pub fn new(config: Arc<AwsConfig>, executor: Arc<RequestExecutor>) -> Self {
        Self { config, executor }
    }

    /// Create a queue, or return the URL of an identical existing one.
    #[instrument(skip(self, request), fields(queue = %request.queue_name))]
    pub async fn create(&self, request: &CreateQueueRequest) -> Result<CreateQueueOutput, AwsError> {
        let built = build::create_queue(&self.config, request)?;
        let response = self.executor.execute(&built).await?;
        let output = parse::create_queue(&built, response).await?;
        debug!(queue_url = %output.queue_url, "Queue ready");
        Ok(output)
    }

    /// List queue URLs, optionally only those whose name starts with `prefix`.
    #[instrument(skip(self))]
    pub async fn list(&self, prefix: Option<&str>) -> Result<ListQueuesOutput, AwsError> {
        let built = build::list_queues(&self.config, prefix)?;
        let response = self.executor.execute(&built).await?;
        parse::list_queues(&built, response).await
    }

    /// Delete a queue.
    #[instrument(skip(self))]
    pub async fn delete(&self, queue_url: &str) -> Result<DeleteQueueOutput, AwsError> {
        let built = build::delete_queue(queue_url)?;
        let response = self.executor.execute(&built).await?;
        parse::delete_queue(&built, response).await
    }

    /// Send a message and verify the digest the service reports.
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn send(&self, queue_url: &str, body: &str) -> Result<SendMessageOutput, AwsError> {
        let built = build::send_message(queue_url, body)?;
        let response = self.executor.execute(&built).await?;
        let output = parse::send_message(&built, body, response).await?;
        debug!(message_id = %output.message_id, "Message sent");
        Ok(output)
    }

    /// Receive up to `request.max_messages` messages.
    ///
    /// An empty queue yields an empty list. If any body fails its digest
    /// check the whole batch fails with [`TransferError::ChecksumMismatch`];
    /// none of it is deleted, so it is redelivered after the visibility
    /// timeout.
    ///
    /// [`TransferError::ChecksumMismatch`]: crate::error::TransferError::ChecksumMismatch
    #[instrument(skip(self, request), fields(queue_url = %request.queue_url))]
    pub async fn receive(
        &self,
        request: &ReceiveMessageRequest,
    ) -> Result<ReceiveMessageOutput, AwsError> {
        let built = build::receive_message(request)?;
        let response = self.executor.execute(&built).await?;
        let output = parse::receive_message(&built, response).await?;
        debug!(count = output.messages.len(), "Received messages");
        Ok(output)
    }

    /// Delete a received message by its receipt handle.
    #[instrument(skip(self, receipt_handle))]
    pub async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<DeleteMessageOutput, AwsError> {
        let built = build::delete_message(queue_url, receipt_handle)?;
        let response = self.executor.execute(&built).await?;
        parse::delete_message(&built, response).await
    }
}

impl std::fmt::Debug for QueuesService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuesService")
            .field("region", &self.config.region)
            .finish_non_exhaustive()
    }
}
