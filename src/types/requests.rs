//! Request types for operations with more than a couple of inputs.

use std::collections::HashMap;

/// Request to list the objects of a bucket.
///
/// `max_keys` of `None` or `Some(0)` leaves the page size to the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Start listing after this key.
    pub marker: Option<String>,
    /// Roll keys up to the first occurrence of this string after the prefix.
    pub delimiter: Option<String>,
    /// Maximum number of entries per page.
    pub max_keys: Option<u32>,
}

impl ListBucketRequest {
    /// Create a new list request.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the start marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the page size.
    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// Request to upload an object. The body is passed separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectRequest {
    /// Target bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Content type.
    pub content_type: Option<String>,
    /// Content encoding.
    pub content_encoding: Option<String>,
    /// Content disposition.
    pub content_disposition: Option<String>,
    /// Cache control directive.
    pub cache_control: Option<String>,
    /// User-defined metadata, sent as `x-amz-meta-*` headers.
    pub metadata: HashMap<String, String>,
}

impl PutObjectRequest {
    /// Create a new put object request.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the content encoding.
    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    /// Set the content disposition.
    pub fn with_content_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.content_disposition = Some(disposition.into());
        self
    }

    /// Set the cache control directive.
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Request to create a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateQueueRequest {
    /// Queue name.
    pub queue_name: String,
    /// Default visibility timeout in seconds.
    pub visibility_timeout: Option<u32>,
}

impl CreateQueueRequest {
    /// Create a new create queue request.
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            queue_name: queue_name.into(),
            visibility_timeout: None,
        }
    }

    /// Set the default visibility timeout.
    pub fn with_visibility_timeout(mut self, seconds: u32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }
}

/// Request to receive messages from a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveMessageRequest {
    /// Queue URL.
    pub queue_url: String,
    /// Maximum messages to return (1 to 10).
    pub max_messages: u32,
    /// Visibility timeout for the received messages, in seconds.
    pub visibility_timeout: Option<u32>,
    /// Long-poll wait time, in seconds (0 to 20).
    pub wait_time_seconds: Option<u32>,
}

impl ReceiveMessageRequest {
    /// Create a request for a single message.
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            max_messages: 1,
            visibility_timeout: None,
            wait_time_seconds: None,
        }
    }

    /// Set the maximum number of messages.
    pub fn with_max_messages(mut self, max_messages: u32) -> Self {
        self.max_messages = max_messages;
        self
    }

    /// Set the visibility timeout.
    pub fn with_visibility_timeout(mut self, seconds: u32) -> Self {
        self.visibility_timeout = Some(seconds);
        self
    }

    /// Set the long-poll wait time.
    pub fn with_wait_time(mut self, seconds: u32) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }
}
