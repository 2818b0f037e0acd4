//! SQS query-protocol response bodies.

use super::{walk, Node, XmlError};
use crate::types::Message;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseMetadata {
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateQueueResponse {
    create_queue_result: CreateQueueResult,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateQueueResult {
    queue_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListQueuesResponse {
    #[serde(default)]
    list_queues_result: ListQueuesResult,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ListQueuesResult {
    #[serde(rename = "QueueUrl", default)]
    queue_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessageResponse {
    send_message_result: SendMessageResult,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessageResult {
    message_id: String,
    #[serde(rename = "MD5OfMessageBody")]
    md5_of_message_body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataOnlyResponse {
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

/// Decoded `SendMessage` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Service-assigned message ID.
    pub message_id: String,
    /// Hex MD5 of the body as computed by the service.
    pub md5_of_body: String,
    /// Request ID from the response metadata.
    pub request_id: Option<String>,
}

/// Decode a `CreateQueueResponse`, returning the queue URL and request id.
pub fn parse_create_queue(xml: &str) -> Result<(String, Option<String>), XmlError> {
    let response: CreateQueueResponse = quick_xml::de::from_str(xml)?;
    Ok((
        response.create_queue_result.queue_url.trim().to_string(),
        response.response_metadata.request_id,
    ))
}

/// Decode a `ListQueuesResponse`, returning the queue URLs and request id.
pub fn parse_list_queues(xml: &str) -> Result<(Vec<String>, Option<String>), XmlError> {
    let response: ListQueuesResponse = quick_xml::de::from_str(xml)?;
    let urls = response
        .list_queues_result
        .queue_urls
        .into_iter()
        .map(|url| url.trim().to_string())
        .collect();
    Ok((urls, response.response_metadata.request_id))
}

/// Decode a `SendMessageResponse`.
pub fn parse_send_message(xml: &str) -> Result<SentMessage, XmlError> {
    let response: SendMessageResponse = quick_xml::de::from_str(xml)?;
    Ok(SentMessage {
        message_id: response.send_message_result.message_id,
        md5_of_body: response.send_message_result.md5_of_message_body,
        request_id: response.response_metadata.request_id,
    })
}

/// Extract the request id of a response that carries nothing else
/// (`DeleteQueue`, `DeleteMessage`).
pub fn parse_request_id(xml: &str) -> Result<Option<String>, XmlError> {
    let response: MetadataOnlyResponse = quick_xml::de::from_str(xml)?;
    Ok(response.response_metadata.request_id)
}

#[derive(Default)]
struct MessageBuilder {
    message_id: Option<String>,
    receipt_handle: Option<String>,
    body: Option<String>,
    md5_of_body: Option<String>,
    attributes: HashMap<String, String>,
    attribute_name: Option<String>,
    attribute_value: Option<String>,
}

impl MessageBuilder {
    fn build(self) -> Result<Message, XmlError> {
        let missing = |field: &str| XmlError::new(format!("Message without {}", field));
        Ok(Message {
            message_id: self.message_id.ok_or_else(|| missing("MessageId"))?,
            receipt_handle: self.receipt_handle.ok_or_else(|| missing("ReceiptHandle"))?,
            body: self.body.unwrap_or_default(),
            md5_of_body: self.md5_of_body.ok_or_else(|| missing("MD5OfBody"))?,
            attributes: self.attributes,
        })
    }
}

/// Decode a `ReceiveMessageResponse`.
///
/// Message bodies are returned exactly as sent, surrounding whitespace
/// included, so their digest can be checked against `MD5OfBody`.
pub fn parse_receive_messages(xml: &str) -> Result<(Vec<Message>, Option<String>), XmlError> {
    let mut messages = Vec::new();
    let mut request_id = None;
    let mut current: Option<MessageBuilder> = None;

    walk(xml, |node| {
        match node {
            Node::Open([_, "ReceiveMessageResult", "Message"]) => {
                current = Some(MessageBuilder::default());
            }
            Node::Open(_) => {}
            Node::Close([_, "ResponseMetadata", "RequestId"], text) => {
                request_id = Some(text.trim().to_string());
            }
            Node::Close([_, "ReceiveMessageResult", "Message"], _) => {
                if let Some(done) = current.take() {
                    messages.push(done.build()?);
                }
            }
            Node::Close([_, "ReceiveMessageResult", "Message", field @ ..], text) => {
                let Some(message) = current.as_mut() else {
                    return Ok(());
                };
                match field {
                    ["MessageId"] => message.message_id = Some(text.trim().to_string()),
                    ["ReceiptHandle"] => message.receipt_handle = Some(text.trim().to_string()),
                    ["MD5OfBody"] => message.md5_of_body = Some(text.trim().to_string()),
                    ["Body"] => message.body = Some(text),
                    ["Attribute", "Name"] => message.attribute_name = Some(text),
                    ["Attribute", "Value"] => message.attribute_value = Some(text),
                    ["Attribute"] => {
                        if let Some(name) = message.attribute_name.take() {
                            let value = message.attribute_value.take().unwrap_or_default();
                            message.attributes.insert(name, value);
                        }
                    }
                    _ => {}
                }
            }
            Node::Close(..) => {}
        }
        Ok(())
    })?;

    Ok((messages, request_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_queue() {
        let xml = r#"<CreateQueueResponse xmlns="http://queue.amazonaws.com/doc/2012-11-05/">
    <CreateQueueResult>
        <QueueUrl>https://sqs.us-east-1.amazonaws.com/123456789012/testQueue</QueueUrl>
    </CreateQueueResult>
    <ResponseMetadata><RequestId>7a62c49f-347e-4fc4-9331-6e8e7a96aa73</RequestId></ResponseMetadata>
</CreateQueueResponse>"#;
        let (url, request_id) = parse_create_queue(xml).unwrap();
        assert_eq!(url, "https://sqs.us-east-1.amazonaws.com/123456789012/testQueue");
        assert_eq!(
            request_id.as_deref(),
            Some("7a62c49f-347e-4fc4-9331-6e8e7a96aa73")
        );
    }

    #[test]
    fn test_parse_list_queues() {
        let xml = r#"<ListQueuesResponse>
    <ListQueuesResult>
        <QueueUrl>https://sqs.us-east-1.amazonaws.com/123456789012/a</QueueUrl>
        <QueueUrl>https://sqs.us-east-1.amazonaws.com/123456789012/b</QueueUrl>
    </ListQueuesResult>
    <ResponseMetadata><RequestId>req</RequestId></ResponseMetadata>
</ListQueuesResponse>"#;
        let (urls, request_id) = parse_list_queues(xml).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[1].ends_with("/b"));
        assert_eq!(request_id.as_deref(), Some("req"));
    }

    #[test]
    fn test_parse_list_queues_empty() {
        let xml = "<ListQueuesResponse><ListQueuesResult/>\
                   <ResponseMetadata><RequestId>req</RequestId></ResponseMetadata></ListQueuesResponse>";
        let (urls, _) = parse_list_queues(xml).unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn test_parse_send_message() {
        let xml = r#"<SendMessageResponse>
    <SendMessageResult>
        <MD5OfMessageBody>fafb00f5732ab283681e124bf8747ed1</MD5OfMessageBody>
        <MessageId>5fea7756-0ea4-451a-a703-a558b933e274</MessageId>
    </SendMessageResult>
    <ResponseMetadata><RequestId>27daac76-34dd-47df-bd01-1f6e873584a0</RequestId></ResponseMetadata>
</SendMessageResponse>"#;
        let sent = parse_send_message(xml).unwrap();
        assert_eq!(sent.message_id, "5fea7756-0ea4-451a-a703-a558b933e274");
        assert_eq!(sent.md5_of_body, "fafb00f5732ab283681e124bf8747ed1");
    }

    #[test]
    fn test_parse_send_message_missing_result() {
        let xml = "<SendMessageResponse><ResponseMetadata><RequestId>r</RequestId></ResponseMetadata></SendMessageResponse>";
        assert!(parse_send_message(xml).is_err());
    }

    #[test]
    fn test_parse_request_id() {
        let xml = "<DeleteQueueResponse><ResponseMetadata><RequestId>del</RequestId></ResponseMetadata></DeleteQueueResponse>";
        assert_eq!(parse_request_id(xml).unwrap().as_deref(), Some("del"));
    }

    #[test]
    fn test_parse_receive_messages() {
        let xml = r#"<ReceiveMessageResponse>
  <ReceiveMessageResult>
    <Message>
      <MessageId>5fea7756-0ea4-451a-a703-a558b933e274</MessageId>
      <ReceiptHandle>MbZj6wDWli+JvwwJaBV+3dcjk2YW2vA3+STFFljTM8tJJg6HRG6PYSasuWXPJB+Cw</ReceiptHandle>
      <MD5OfBody>fafb00f5732ab283681e124bf8747ed1</MD5OfBody>
      <Body>  This is a test message &amp; more  </Body>
      <Attribute><Name>SenderId</Name><Value>195004372649</Value></Attribute>
      <Attribute><Name>ApproximateReceiveCount</Name><Value>5</Value></Attribute>
    </Message>
  </ReceiveMessageResult>
  <ResponseMetadata><RequestId>b6633655-283d-45b4-aee4-4e84e0ae6afa</RequestId></ResponseMetadata>
</ReceiveMessageResponse>"#;
        let (messages, request_id) = parse_receive_messages(xml).unwrap();
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.body, "  This is a test message & more  ");
        assert_eq!(message.md5_of_body, "fafb00f5732ab283681e124bf8747ed1");
        assert!(message.receipt_handle.starts_with("MbZj6wDWli"));
        assert_eq!(message.attributes.get("SenderId").map(String::as_str), Some("195004372649"));
        assert_eq!(message.attributes.len(), 2);
        assert_eq!(
            request_id.as_deref(),
            Some("b6633655-283d-45b4-aee4-4e84e0ae6afa")
        );
    }

    #[test]
    fn test_parse_receive_no_messages() {
        let xml = "<ReceiveMessageResponse><ReceiveMessageResult/>\
                   <ResponseMetadata><RequestId>r</RequestId></ResponseMetadata></ReceiveMessageResponse>";
        let (messages, request_id) = parse_receive_messages(xml).unwrap();
        assert!(messages.is_empty());
        assert_eq!(request_id.as_deref(), Some("r"));
    }

    #[test]
    fn test_parse_receive_rejects_incomplete_message() {
        let xml = "<ReceiveMessageResponse><ReceiveMessageResult><Message><Body>x</Body></Message>\
                   </ReceiveMessageResult></ReceiveMessageResponse>";
        assert!(parse_receive_messages(xml).is_err());
    }
}
