//! Typed results of the SQS operations.
//!
//! Message digests are checked on both directions: the digest the service
//! reports for a sent body must match the body we sent, and every received
//! body must match its `MD5OfBody`.

use super::{read_text, xml_fault};
use crate::error::{AwsError, TransferError};
use crate::request::OperationRequest;
use crate::transport::HttpResponse;
use crate::types::*;
use crate::xml;
use md5::{Digest, Md5};
use tracing::warn;

/// Lowercase hex MD5 of a message body.
pub fn body_md5(body: &str) -> String {
    hex::encode(Md5::digest(body.as_bytes()))
}

fn verify_md5(request: &OperationRequest, body: &str, expected: &str) -> Result<(), AwsError> {
    let actual = body_md5(body);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        warn!(
            operation = %request.operation(),
            resource = request.resource(),
            expected,
            actual = %actual,
            "Message digest mismatch"
        );
        Err(TransferError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        }
        .during(request.operation(), request.resource())
        .into())
    }
}

/// Result of `createQueue`.
pub async fn create_queue(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<CreateQueueOutput, AwsError> {
    let header_id = response.request_id().map(str::to_string);
    let body = read_text(request, response).await?;
    let (queue_url, request_id) =
        xml::parse_create_queue(&body).map_err(|e| xml_fault(request.operation(), e))?;
    Ok(CreateQueueOutput {
        queue_url,
        request_id: request_id.or(header_id),
    })
}

/// Result of `listQueues`.
pub async fn list_queues(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<ListQueuesOutput, AwsError> {
    let header_id = response.request_id().map(str::to_string);
    let body = read_text(request, response).await?;
    let (queue_urls, request_id) =
        xml::parse_list_queues(&body).map_err(|e| xml_fault(request.operation(), e))?;
    Ok(ListQueuesOutput {
        queue_urls,
        request_id: request_id.or(header_id),
    })
}

async fn metadata_only(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<Option<String>, AwsError> {
    let header_id = response.request_id().map(str::to_string);
    let body = read_text(request, response).await?;
    if body.trim().is_empty() {
        return Ok(header_id);
    }
    let request_id =
        xml::parse_request_id(&body).map_err(|e| xml_fault(request.operation(), e))?;
    Ok(request_id.or(header_id))
}

/// Result of `deleteQueue`.
pub async fn delete_queue(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<DeleteQueueOutput, AwsError> {
    Ok(DeleteQueueOutput {
        request_id: metadata_only(request, response).await?,
    })
}

/// Result of `sendMessage`; `sent_body` is the body that was sent.
pub async fn send_message(
    request: &OperationRequest,
    sent_body: &str,
    response: HttpResponse,
) -> Result<SendMessageOutput, AwsError> {
    let header_id = response.request_id().map(str::to_string);
    let body = read_text(request, response).await?;
    let sent = xml::parse_send_message(&body).map_err(|e| xml_fault(request.operation(), e))?;
    verify_md5(request, sent_body, &sent.md5_of_body)?;
    Ok(SendMessageOutput {
        message_id: sent.message_id,
        md5_of_body: sent.md5_of_body,
        request_id: sent.request_id.or(header_id),
    })
}

/// Result of `receiveMessage`.
///
/// The batch is all or nothing: one body that fails its digest fails the
/// whole call. Nothing is deleted, so every message of the batch becomes
/// visible again once its visibility timeout lapses.
pub async fn receive_message(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<ReceiveMessageOutput, AwsError> {
    let header_id = response.request_id().map(str::to_string);
    let body = read_text(request, response).await?;
    let (messages, request_id) =
        xml::parse_receive_messages(&body).map_err(|e| xml_fault(request.operation(), e))?;
    for message in &messages {
        verify_md5(request, &message.body, &message.md5_of_body)?;
    }
    Ok(ReceiveMessageOutput {
        messages,
        request_id: request_id.or(header_id),
    })
}

/// Result of `deleteMessage`.
pub async fn delete_message(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<DeleteMessageOutput, AwsError> {
    Ok(DeleteMessageOutput {
        request_id: metadata_only(request, response).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Operation;
    use http::Method;
    use url::Url;

    fn request(operation: Operation) -> OperationRequest {
        OperationRequest::new(
            operation,
            "q1",
            Method::POST,
            Url::parse("https://sqs.us-east-1.amazonaws.com").unwrap(),
            "/123456789012/q1",
        )
    }

    fn receive_body(body: &str, md5: &str) -> Vec<u8> {
        format!(
            "<ReceiveMessageResponse><ReceiveMessageResult><Message>\
             <MessageId>m1</MessageId><ReceiptHandle>h1</ReceiptHandle>\
             <MD5OfBody>{}</MD5OfBody><Body>{}</Body></Message></ReceiveMessageResult>\
             <ResponseMetadata><RequestId>r1</RequestId></ResponseMetadata></ReceiveMessageResponse>",
            md5, body
        )
        .into_bytes()
    }

    #[test]
    fn test_body_md5() {
        assert_eq!(body_md5("hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[tokio::test]
    async fn test_receive_verifies_digest() {
        let response = HttpResponse::new(200).with_body(receive_body("hello", &body_md5("hello")));
        let output = receive_message(&request(Operation::ReceiveMessage), response)
            .await
            .unwrap();
        assert_eq!(output.messages.len(), 1);
        assert_eq!(output.messages[0].body, "hello");
        assert_eq!(output.request_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_receive_digest_mismatch() {
        let response =
            HttpResponse::new(200).with_body(receive_body("hello", "00000000000000000000000000000000"));
        let err = receive_message(&request(Operation::ReceiveMessage), response)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AwsError::Transfer(ref fault) if matches!(fault.source, TransferError::ChecksumMismatch { .. })
        ));
        assert_eq!(err.operation(), Some(Operation::ReceiveMessage));
        assert_eq!(err.resource(), Some("q1"));
    }

    #[tokio::test]
    async fn test_one_bad_digest_fails_the_batch() {
        let body = format!(
            "<ReceiveMessageResponse><ReceiveMessageResult>\
             <Message><MessageId>m1</MessageId><ReceiptHandle>h1</ReceiptHandle>\
             <MD5OfBody>{}</MD5OfBody><Body>good</Body></Message>\
             <Message><MessageId>m2</MessageId><ReceiptHandle>h2</ReceiptHandle>\
             <MD5OfBody>{}</MD5OfBody><Body>bad</Body></Message>\
             </ReceiveMessageResult></ReceiveMessageResponse>",
            body_md5("good"),
            body_md5("not what was sent")
        );
        let response = HttpResponse::new(200).with_body(body.into_bytes());
        let err = receive_message(&request(Operation::ReceiveMessage), response)
            .await
            .unwrap_err();
        match err {
            AwsError::Transfer(fault) => match fault.source {
                TransferError::ChecksumMismatch { expected, actual } => {
                    assert_eq!(expected, body_md5("not what was sent"));
                    assert_eq!(actual, body_md5("bad"));
                }
                other => panic!("unexpected transfer error: {other:?}"),
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_verifies_digest() {
        let body = format!(
            "<SendMessageResponse><SendMessageResult><MD5OfMessageBody>{}</MD5OfMessageBody>\
             <MessageId>m1</MessageId></SendMessageResult></SendMessageResponse>",
            body_md5("hello")
        );
        let request = request(Operation::SendMessage);
        let ok = send_message(&request, "hello", HttpResponse::new(200).with_body(body.clone().into_bytes()))
            .await
            .unwrap();
        assert_eq!(ok.message_id, "m1");

        let err = send_message(&request, "goodbye", HttpResponse::new(200).with_body(body.into_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AwsError::Transfer(ref fault) if matches!(fault.source, TransferError::ChecksumMismatch { .. })
        ));
        assert_eq!(err.operation(), Some(Operation::SendMessage));
    }

    #[tokio::test]
    async fn test_delete_queue_with_empty_body_uses_header() {
        let response = HttpResponse::new(200).with_header("x-amzn-RequestId", "hdr");
        let output = delete_queue(&request(Operation::DeleteQueue), response)
            .await
            .unwrap();
        assert_eq!(output.request_id.as_deref(), Some("hdr"));
    }
}
