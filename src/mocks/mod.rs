//! Mock implementations for testing.
//!
//! [`MockTransport`] replays scripted responses and records what was sent,
//! [`MockSigner`] signs without credentials, and [`InMemoryS3`] is a small
//! stateful object store reachable through the real request path.

mod s3;
mod signer;
mod transport;

pub use s3::{InMemoryS3, IN_MEMORY_ENDPOINT};
pub use signer::MockSigner;
pub use transport::{MockResponse, MockTransport};

use crate::config::AwsConfig;
use crate::credentials::{AwsCredentials, StaticCredentialsProvider};
use crate::response::sqs::body_md5;
use crate::xml::S3_NAMESPACE;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

/// Namespace of SQS query-protocol responses.
const SQS_NAMESPACE: &str = "http://queue.amazonaws.com/doc/2012-11-05/";

/// Test fixtures for S3 and SQS operations.
pub struct TestFixtures;

impl TestFixtures {
    /// Configuration with static credentials and fast retries.
    pub fn config() -> AwsConfig {
        Self::config_builder()
            .build()
            .unwrap_or_default()
    }

    /// Configuration pointing at the [`InMemoryS3`] endpoint.
    pub fn in_memory_config() -> AwsConfig {
        let mut config = Self::config();
        config.endpoint = url::Url::parse(IN_MEMORY_ENDPOINT).ok();
        config
    }

    fn config_builder() -> crate::config::AwsConfigBuilder {
        AwsConfig::builder()
            .credentials_provider(Arc::new(StaticCredentialsProvider::new(
                AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            )))
            .initial_backoff(Duration::from_millis(1))
            .max_backoff(Duration::from_millis(5))
            .operation_timeout(Duration::from_secs(5))
    }

    /// A two-key listing of `test-bucket`.
    pub fn list_bucket_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>test-bucket</Name>
    <Prefix></Prefix>
    <Marker></Marker>
    <MaxKeys>1000</MaxKeys>
    <IsTruncated>false</IsTruncated>
    <Contents>
        <Key>file1.txt</Key>
        <LastModified>2024-01-15T10:30:00.000Z</LastModified>
        <ETag>"d41d8cd98f00b204e9800998ecf8427e"</ETag>
        <Size>1024</Size>
        <StorageClass>STANDARD</StorageClass>
    </Contents>
    <Contents>
        <Key>file2.txt</Key>
        <LastModified>2024-01-15T11:30:00.000Z</LastModified>
        <ETag>"098f6bcd4621d373cade4e832627b4f6"</ETag>
        <Size>2048</Size>
        <StorageClass>STANDARD</StorageClass>
    </Contents>
</ListBucketResult>"#
    }

    /// A listing page with the given keys, common prefixes and truncation.
    pub fn list_page_xml(
        bucket: &str,
        keys: &[&str],
        prefixes: &[&str],
        truncated: bool,
        next_marker: Option<&str>,
    ) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult xmlns=\"{S3_NAMESPACE}\"><Name>{}</Name>\
             <IsTruncated>{truncated}</IsTruncated>",
            escape(bucket)
        );
        if let Some(marker) = next_marker {
            let _ = write!(xml, "<NextMarker>{}</NextMarker>", escape(marker));
        }
        for key in keys {
            let _ = write!(
                xml,
                "<Contents><Key>{}</Key><Size>1</Size><ETag>\"e\"</ETag></Contents>",
                escape(*key)
            );
        }
        for prefix in prefixes {
            let _ = write!(
                xml,
                "<CommonPrefixes><Prefix>{}</Prefix></CommonPrefixes>",
                escape(*prefix)
            );
        }
        xml.push_str("</ListBucketResult>");
        xml
    }

    /// An account listing with two buckets.
    pub fn list_buckets_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Owner>
        <ID>owner-id</ID>
        <DisplayName>owner-name</DisplayName>
    </Owner>
    <Buckets>
        <Bucket>
            <Name>bucket1</Name>
            <CreationDate>2024-01-01T00:00:00.000Z</CreationDate>
        </Bucket>
        <Bucket>
            <Name>bucket2</Name>
            <CreationDate>2024-01-02T00:00:00.000Z</CreationDate>
        </Bucket>
    </Buckets>
</ListAllMyBucketsResult>"#
    }

    /// An S3 error body.
    pub fn error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <RequestId>test-request-id</RequestId>
    <HostId>test-host-id</HostId>
</Error>"#,
            escape(code),
            escape(message)
        )
    }

    /// An SQS error body.
    pub fn sqs_error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<ErrorResponse xmlns="{SQS_NAMESPACE}">
    <Error>
        <Type>Sender</Type>
        <Code>{}</Code>
        <Message>{}</Message>
    </Error>
    <RequestId>sqs-error-request-id</RequestId>
</ErrorResponse>"#,
            escape(code),
            escape(message)
        )
    }

    /// A CreateQueue response.
    pub fn create_queue_xml(queue_url: &str) -> String {
        format!(
            "<CreateQueueResponse xmlns=\"{SQS_NAMESPACE}\">\
             <CreateQueueResult><QueueUrl>{}</QueueUrl></CreateQueueResult>\
             <ResponseMetadata><RequestId>create-queue-id</RequestId></ResponseMetadata>\
             </CreateQueueResponse>",
            escape(queue_url)
        )
    }

    /// A ListQueues response.
    pub fn list_queues_xml(queue_urls: &[&str]) -> String {
        let mut xml = format!("<ListQueuesResponse xmlns=\"{SQS_NAMESPACE}\"><ListQueuesResult>");
        for url in queue_urls {
            let _ = write!(xml, "<QueueUrl>{}</QueueUrl>", escape(*url));
        }
        xml.push_str(
            "</ListQueuesResult>\
             <ResponseMetadata><RequestId>list-queues-id</RequestId></ResponseMetadata>\
             </ListQueuesResponse>",
        );
        xml
    }

    /// A SendMessage response acknowledging `body`.
    pub fn send_message_xml(message_id: &str, body: &str) -> String {
        format!(
            "<SendMessageResponse xmlns=\"{SQS_NAMESPACE}\"><SendMessageResult>\
             <MD5OfMessageBody>{}</MD5OfMessageBody><MessageId>{}</MessageId>\
             </SendMessageResult>\
             <ResponseMetadata><RequestId>send-message-id</RequestId></ResponseMetadata>\
             </SendMessageResponse>",
            body_md5(body),
            escape(message_id)
        )
    }

    /// A ReceiveMessage response carrying `(message id, receipt handle, body)`
    /// triples with correct checksums.
    pub fn receive_message_xml(messages: &[(&str, &str, &str)]) -> String {
        let mut xml = format!(
            "<ReceiveMessageResponse xmlns=\"{SQS_NAMESPACE}\"><ReceiveMessageResult>"
        );
        for (id, handle, body) in messages {
            let _ = write!(
                xml,
                "<Message><MessageId>{}</MessageId><ReceiptHandle>{}</ReceiptHandle>\
                 <MD5OfBody>{}</MD5OfBody><Body>{}</Body>\
                 <Attribute><Name>ApproximateReceiveCount</Name><Value>1</Value></Attribute>\
                 </Message>",
                escape(*id),
                escape(*handle),
                body_md5(body),
                escape(*body)
            );
        }
        xml.push_str(
            "</ReceiveMessageResult>\
             <ResponseMetadata><RequestId>receive-message-id</RequestId></ResponseMetadata>\
             </ReceiveMessageResponse>",
        );
        xml
    }

    /// A response with only request metadata (DeleteQueue, DeleteMessage).
    pub fn metadata_only_xml(root: &str) -> String {
        format!(
            "<{root} xmlns=\"{SQS_NAMESPACE}\">\
             <ResponseMetadata><RequestId>metadata-request-id</RequestId></ResponseMetadata>\
             </{root}>"
        )
    }
}
