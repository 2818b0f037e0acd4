//! Data types shared by requests and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Owner of a bucket or object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Canonical user ID.
    pub id: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// A bucket in the caller's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// When the bucket was created.
    pub creation_date: Option<DateTime<Utc>>,
}

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Entity tag, quotes included.
    pub e_tag: Option<String>,
    /// Storage class name (e.g. `STANDARD`).
    pub storage_class: Option<String>,
    /// Owner, when the listing includes it.
    pub owner: Option<Owner>,
}

/// How the size of a streamed upload is obtained.
///
/// The size must be known before the request is signed and sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSize {
    /// The caller knows the number of bytes to send.
    Known(u64),
    /// Measure the stream by seeking to its end and back.
    MeasureBySeeking,
}

impl From<u64> for ObjectSize {
    fn from(size: u64) -> Self {
        ObjectSize::Known(size)
    }
}

/// A message received from a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Service-assigned message ID.
    pub message_id: String,
    /// Handle needed to delete the message.
    pub receipt_handle: String,
    /// Message body.
    pub body: String,
    /// Hex MD5 of the body as reported by the service.
    pub md5_of_body: String,
    /// System attributes returned with the message.
    pub attributes: HashMap<String, String>,
}
