//! Typed results, one per operation.
//!
//! Every result carries the request id the service echoed, when it sent one.
//! Object store results also keep the extended request id and the `Date`
//! header.

use super::common::*;
use crate::transport::ByteStream;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Result of creating a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBucketOutput {
    /// Bucket name.
    pub bucket: String,
    /// Location reported by the service.
    pub location: Option<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// Result of listing all buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBucketsOutput {
    /// Owner of the buckets.
    pub owner: Option<Owner>,
    /// Buckets in service order.
    pub buckets: Vec<Bucket>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// Result of deleting a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBucketOutput {
    /// Bucket name.
    pub bucket: String,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketOutput {
    /// Bucket name echoed by the service.
    pub bucket: String,
    /// Prefix echoed by the service.
    pub prefix: Option<String>,
    /// Marker echoed by the service.
    pub marker: Option<String>,
    /// Marker for the next page, when the service sent one.
    pub next_marker: Option<String>,
    /// Delimiter echoed by the service.
    pub delimiter: Option<String>,
    /// Page size echoed by the service.
    pub max_keys: Option<u32>,
    /// Whether more entries follow.
    pub is_truncated: bool,
    /// Object entries in key order.
    pub contents: Vec<ObjectEntry>,
    /// Rolled-up common prefixes in key order.
    pub common_prefixes: Vec<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

impl ListBucketOutput {
    /// Number of items on the page (entries plus common prefixes).
    pub fn item_count(&self) -> usize {
        self.contents.len() + self.common_prefixes.len()
    }

    /// Keys of the object entries.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.contents.iter().map(|entry| entry.key.as_str())
    }
}

/// Result of uploading an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// ETag of the stored object.
    pub e_tag: Option<String>,
    /// Version ID if versioning is enabled.
    pub version_id: Option<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// Result of downloading an object.
///
/// The body is streamed; read it with [`ByteStream::collect`] or
/// [`ByteStream::write_to`].
#[derive(Debug)]
pub struct GetObjectOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object data.
    pub body: ByteStream,
    /// Content length.
    pub content_length: Option<u64>,
    /// Content type.
    pub content_type: Option<String>,
    /// ETag.
    pub e_tag: Option<String>,
    /// Last modified.
    pub last_modified: Option<DateTime<Utc>>,
    /// User metadata, `x-amz-meta-` prefix stripped.
    pub metadata: HashMap<String, String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// Result of a conditional get.
#[derive(Debug)]
pub enum ConditionalGetOutput {
    /// The object changed; its current content follows.
    Modified(GetObjectOutput),
    /// The object still matches the caller's ETag. No body is transferred.
    NotModified {
        /// Current ETag, when the service repeated it.
        e_tag: Option<String>,
        /// AWS request ID.
        request_id: Option<String>,
        /// Extended request ID (`x-amz-id-2`).
        host_id: Option<String>,
        /// Time the service stamped on the response.
        date: Option<DateTime<Utc>>,
    },
}

impl ConditionalGetOutput {
    /// Whether the object changed.
    pub fn is_modified(&self) -> bool {
        matches!(self, ConditionalGetOutput::Modified(_))
    }

    /// The new content, if the object changed.
    pub fn into_modified(self) -> Option<GetObjectOutput> {
        match self {
            ConditionalGetOutput::Modified(output) => Some(output),
            ConditionalGetOutput::NotModified { .. } => None,
        }
    }

    /// AWS request ID.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ConditionalGetOutput::Modified(output) => output.request_id.as_deref(),
            ConditionalGetOutput::NotModified { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Result of deleting an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteObjectOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// Result of fetching object metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadObjectOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Content length.
    pub content_length: Option<u64>,
    /// Content type.
    pub content_type: Option<String>,
    /// ETag.
    pub e_tag: Option<String>,
    /// Last modified.
    pub last_modified: Option<DateTime<Utc>>,
    /// User metadata, `x-amz-meta-` prefix stripped.
    pub metadata: HashMap<String, String>,
    /// AWS request ID.
    pub request_id: Option<String>,
    /// Extended request ID (`x-amz-id-2`).
    pub host_id: Option<String>,
    /// Time the service stamped on the response.
    pub date: Option<DateTime<Utc>>,
}

/// Result of creating a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateQueueOutput {
    /// URL of the queue.
    pub queue_url: String,
    /// AWS request ID.
    pub request_id: Option<String>,
}

/// Result of listing queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQueuesOutput {
    /// Queue URLs.
    pub queue_urls: Vec<String>,
    /// AWS request ID.
    pub request_id: Option<String>,
}

/// Result of deleting a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteQueueOutput {
    /// AWS request ID.
    pub request_id: Option<String>,
}

/// Result of sending a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageOutput {
    /// Service-assigned message ID.
    pub message_id: String,
    /// Hex MD5 of the body, verified locally.
    pub md5_of_body: String,
    /// AWS request ID.
    pub request_id: Option<String>,
}

/// Result of receiving messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveMessageOutput {
    /// Received messages; empty when the queue had none.
    pub messages: Vec<Message>,
    /// AWS request ID.
    pub request_id: Option<String>,
}

/// Result of deleting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMessageOutput {
    /// AWS request ID.
    pub request_id: Option<String>,
}
