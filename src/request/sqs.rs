//! Request builders for the SQS query protocol.
//!
//! Every call is a `POST` with a form-encoded body naming the `Action` and
//! the API `Version`. Calls on an existing queue are sent to the queue URL.

use super::{Operation, OperationRequest, RequestBody};
use crate::config::AwsConfig;
use crate::error::{AwsError, RequestError};
use crate::types::{CreateQueueRequest, ReceiveMessageRequest};
use bytes::Bytes;
use http::Method;
use url::Url;

/// Query API version.
pub const API_VERSION: &str = "2012-11-05";

/// Content type of query-protocol bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Longest queue name accepted by the service.
pub const MAX_QUEUE_NAME_LEN: usize = 80;

/// Largest message body in bytes.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Most messages returned by one receive.
pub const MAX_RECEIVE_MESSAGES: u32 = 10;

/// Longest long-poll wait in seconds.
pub const MAX_WAIT_TIME_SECONDS: u32 = 20;

/// Validate a queue name.
pub fn validate_queue_name(name: &str) -> Result<(), RequestError> {
    if name.is_empty() {
        return Err(RequestError::EmptyName { field: "queue name" });
    }
    if name.len() > MAX_QUEUE_NAME_LEN {
        return Err(RequestError::InvalidParameter {
            name: "QueueName",
            message: format!("longer than {} characters", MAX_QUEUE_NAME_LEN),
        });
    }
    let stem = name.strip_suffix(".fifo").unwrap_or(name);
    if stem.is_empty()
        || !stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RequestError::InvalidParameter {
            name: "QueueName",
            message: format!(
                "'{}' may only contain alphanumerics, hyphens and underscores",
                name
            ),
        });
    }
    Ok(())
}

/// Split a queue URL into the endpoint it lives on and its path.
pub fn parse_queue_url(queue_url: &str) -> Result<(Url, String), RequestError> {
    let invalid = |details: &str| RequestError::InvalidQueueUrl {
        url: queue_url.to_string(),
        details: details.to_string(),
    };
    if queue_url.is_empty() {
        return Err(RequestError::EmptyName { field: "queue url" });
    }

    let url = Url::parse(queue_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    let path = percent_encoding::percent_decode_str(url.path())
        .decode_utf8()
        .map_err(|e| invalid(&e.to_string()))?
        .into_owned();
    if path.len() <= 1 {
        return Err(invalid("missing queue path"));
    }

    let mut endpoint = url;
    endpoint.set_path("/");
    endpoint.set_query(None);
    endpoint.set_fragment(None);
    Ok((endpoint, path))
}

/// A form body under construction.
struct Form {
    pairs: Vec<(&'static str, String)>,
}

impl Form {
    fn new(action: &str) -> Self {
        Self {
            pairs: vec![
                ("Action", action.to_string()),
                ("Version", API_VERSION.to_string()),
            ],
        }
    }

    fn param(mut self, name: &'static str, value: &str) -> Self {
        self.pairs.push((name, value.to_string()));
        self
    }

    fn finish(self, request: OperationRequest) -> OperationRequest {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish();
        request
            .with_header("content-type", FORM_CONTENT_TYPE)
            .with_body(RequestBody::Buffered(Bytes::from(body)))
    }
}

fn service_request(
    config: &AwsConfig,
    operation: Operation,
    resource: &str,
) -> Result<OperationRequest, AwsError> {
    let endpoint = config.resolve_sqs_endpoint()?;
    Ok(OperationRequest::new(operation, resource, Method::POST, endpoint, "/"))
}

fn queue_request(operation: Operation, queue_url: &str) -> Result<OperationRequest, AwsError> {
    let (endpoint, path) =
        parse_queue_url(queue_url).map_err(|e| e.during(operation, queue_url))?;
    Ok(OperationRequest::new(operation, queue_url, Method::POST, endpoint, path))
}

/// `CreateQueue`.
pub fn create_queue(
    config: &AwsConfig,
    request: &CreateQueueRequest,
) -> Result<OperationRequest, AwsError> {
    validate_queue_name(&request.queue_name)
        .map_err(|e| e.during(Operation::CreateQueue, request.queue_name.as_str()))?;
    let built = service_request(config, Operation::CreateQueue, &request.queue_name)?;
    let mut form = Form::new("CreateQueue").param("QueueName", &request.queue_name);
    if let Some(timeout) = request.visibility_timeout {
        form = form
            .param("Attribute.1.Name", "VisibilityTimeout")
            .param("Attribute.1.Value", &timeout.to_string());
    }
    Ok(form.finish(built))
}

/// `ListQueues`, optionally filtered by name prefix.
pub fn list_queues(config: &AwsConfig, prefix: Option<&str>) -> Result<OperationRequest, AwsError> {
    let prefix = prefix.filter(|p| !p.is_empty());
    let built = service_request(config, Operation::ListQueues, prefix.unwrap_or("*"))?;
    let mut form = Form::new("ListQueues");
    if let Some(prefix) = prefix {
        form = form.param("QueueNamePrefix", prefix);
    }
    Ok(form.finish(built))
}

/// `DeleteQueue`.
pub fn delete_queue(queue_url: &str) -> Result<OperationRequest, AwsError> {
    let built = queue_request(Operation::DeleteQueue, queue_url)?;
    Ok(Form::new("DeleteQueue").finish(built))
}

/// `SendMessage`.
pub fn send_message(queue_url: &str, body: &str) -> Result<OperationRequest, AwsError> {
    if body.is_empty() {
        return Err(RequestError::EmptyName { field: "message body" }
            .during(Operation::SendMessage, queue_url)
            .into());
    }
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(RequestError::InvalidParameter {
            name: "MessageBody",
            message: format!("{} bytes exceeds {} bytes", body.len(), MAX_MESSAGE_SIZE),
        }
        .during(Operation::SendMessage, queue_url)
        .into());
    }
    let built = queue_request(Operation::SendMessage, queue_url)?;
    Ok(Form::new("SendMessage")
        .param("MessageBody", body)
        .finish(built))
}

/// `ReceiveMessage`, asking for all system attributes.
pub fn receive_message(request: &ReceiveMessageRequest) -> Result<OperationRequest, AwsError> {
    if !(1..=MAX_RECEIVE_MESSAGES).contains(&request.max_messages) {
        return Err(RequestError::InvalidParameter {
            name: "MaxNumberOfMessages",
            message: format!(
                "{} is outside 1..={}",
                request.max_messages, MAX_RECEIVE_MESSAGES
            ),
        }
        .during(Operation::ReceiveMessage, request.queue_url.as_str())
        .into());
    }
    if let Some(wait) = request.wait_time_seconds {
        if wait > MAX_WAIT_TIME_SECONDS {
            return Err(RequestError::InvalidParameter {
                name: "WaitTimeSeconds",
                message: format!("{} exceeds {}", wait, MAX_WAIT_TIME_SECONDS),
            }
            .during(Operation::ReceiveMessage, request.queue_url.as_str())
            .into());
        }
    }

    let built = queue_request(Operation::ReceiveMessage, &request.queue_url)?;
    let mut form = Form::new("ReceiveMessage")
        .param("MaxNumberOfMessages", &request.max_messages.to_string())
        .param("AttributeName.1", "All");
    if let Some(timeout) = request.visibility_timeout {
        form = form.param("VisibilityTimeout", &timeout.to_string());
    }
    if let Some(wait) = request.wait_time_seconds {
        form = form.param("WaitTimeSeconds", &wait.to_string());
    }
    Ok(form.finish(built))
}

/// `DeleteMessage`.
pub fn delete_message(queue_url: &str, receipt_handle: &str) -> Result<OperationRequest, AwsError> {
    if receipt_handle.is_empty() {
        return Err(RequestError::EmptyName { field: "receipt handle" }
            .during(Operation::DeleteMessage, queue_url)
            .into());
    }
    let built = queue_request(Operation::DeleteMessage, queue_url)?;
    Ok(Form::new("DeleteMessage")
        .param("ReceiptHandle", receipt_handle)
        .finish(built))
}
