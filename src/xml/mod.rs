//! XML encoding and decoding of S3 and SQS bodies.
//!
//! S3 listings and error bodies are read with the streaming event reader.
//! Text is kept verbatim (keys may carry leading or trailing spaces), and
//! elements are matched by their path from the root. SQS query-protocol
//! responses have a fixed shape and are deserialized with serde.

mod sqs;

pub use sqs::*;

use crate::error::ServiceErrorResponse;
use crate::types::{Bucket, ListBucketOutput, ObjectEntry, Owner};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// S3 document namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// A body could not be decoded.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct XmlError(String);

impl XmlError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(e: quick_xml::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<quick_xml::DeError> for XmlError {
    fn from(e: quick_xml::DeError) -> Self {
        Self(e.to_string())
    }
}

/// A node visited by [`walk`], with the path of element names leading to it.
enum Node<'a> {
    Open(&'a [&'a str]),
    /// Carries the text collected since the previous element boundary.
    Close(&'a [&'a str], String),
}

/// Walk a document and hand every element boundary to `visit`.
///
/// Text and CDATA are accumulated verbatim and delivered with the `Close` of
/// the innermost element. Self-closing elements produce an `Open` followed by
/// a `Close` with empty text.
fn walk<F>(xml: &str, mut visit: F) -> Result<(), XmlError>
where
    F: FnMut(Node<'_>) -> Result<(), XmlError>,
{
    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.clear();
                visit(Node::Open(&names(&path)))?;
            }
            Event::Empty(e) => {
                path.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                text.clear();
                let current = names(&path);
                visit(Node::Open(&current))?;
                visit(Node::Close(&current, String::new()))?;
                path.pop();
            }
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(_) => {
                visit(Node::Close(&names(&path), std::mem::take(&mut text)))?;
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn names(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, XmlError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| XmlError::new(format!("invalid {} '{}': {}", field, value, e)))
}

fn parse_number<N: std::str::FromStr>(field: &str, value: &str) -> Result<N, XmlError> {
    value
        .trim()
        .parse()
        .map_err(|_| XmlError::new(format!("invalid {} '{}'", field, value)))
}

fn parse_bool(field: &str, value: &str) -> Result<bool, XmlError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(XmlError::new(format!("invalid {} '{}'", field, other))),
    }
}

/// Parse a service error body.
///
/// Accepts the S3 `<Error>` shape and the SQS `<ErrorResponse>` shape.
/// Returns `None` when the body is not XML or carries no error code, so the
/// caller can fall back to the status line.
pub fn parse_error_response(xml: &str) -> Option<ServiceErrorResponse> {
    let mut parsed = ServiceErrorResponse::default();

    let result = walk(xml, |node| {
        if let Node::Close(path, text) = node {
            let slot = match path.last() {
                Some(&"Code") => &mut parsed.code,
                Some(&"Message") => &mut parsed.message,
                Some(&"BucketName") | Some(&"Bucket") => &mut parsed.bucket,
                Some(&"Key") => &mut parsed.key,
                Some(&"RequestId") => &mut parsed.request_id,
                Some(&"HostId") => &mut parsed.host_id,
                _ => return Ok(()),
            };
            let text = text.trim();
            if !text.is_empty() {
                *slot = Some(text.to_string());
            }
        }
        Ok(())
    });

    match result {
        Ok(()) if parsed.code.is_some() => Some(parsed),
        _ => None,
    }
}

/// Parse a `ListAllMyBucketsResult` document.
pub fn parse_list_buckets(xml: &str) -> Result<(Option<Owner>, Vec<Bucket>), XmlError> {
    let mut owner: Option<Owner> = None;
    let mut buckets = Vec::new();
    let mut name: Option<String> = None;
    let mut creation_date = None;

    walk(xml, |node| {
        match node {
            Node::Open([_, "Owner"]) => owner = Some(Owner::default()),
            Node::Open(_) => {}
            Node::Close(path, text) => match path {
                [_, "Owner", "ID"] => {
                    owner.get_or_insert_with(Owner::default).id = Some(text);
                }
                [_, "Owner", "DisplayName"] => {
                    owner.get_or_insert_with(Owner::default).display_name = Some(text);
                }
                [_, "Buckets", "Bucket", "Name"] => name = Some(text),
                [_, "Buckets", "Bucket", "CreationDate"] => {
                    creation_date = Some(parse_timestamp("CreationDate", &text)?);
                }
                [_, "Buckets", "Bucket"] => {
                    let name = name
                        .take()
                        .ok_or_else(|| XmlError::new("Bucket without Name"))?;
                    buckets.push(Bucket {
                        name,
                        creation_date: creation_date.take(),
                    });
                }
                _ => {}
            },
        }
        Ok(())
    })?;

    Ok((owner, buckets))
}

#[derive(Default)]
struct EntryBuilder {
    key: Option<String>,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
    e_tag: Option<String>,
    storage_class: Option<String>,
    owner: Option<Owner>,
}

impl EntryBuilder {
    fn set(&mut self, field: &[&str], text: String) -> Result<(), XmlError> {
        match field {
            ["Key"] => self.key = Some(text),
            ["Size"] => self.size = parse_number("Size", &text)?,
            ["LastModified"] => self.last_modified = Some(parse_timestamp("LastModified", &text)?),
            ["ETag"] => self.e_tag = Some(text),
            ["StorageClass"] => self.storage_class = Some(text),
            ["Owner", "ID"] => self.owner.get_or_insert_with(Owner::default).id = Some(text),
            ["Owner", "DisplayName"] => {
                self.owner.get_or_insert_with(Owner::default).display_name = Some(text)
            }
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Result<ObjectEntry, XmlError> {
        Ok(ObjectEntry {
            key: self
                .key
                .ok_or_else(|| XmlError::new("Contents without Key"))?,
            size: self.size,
            last_modified: self.last_modified,
            e_tag: self.e_tag,
            storage_class: self.storage_class,
            owner: self.owner,
        })
    }
}

/// Parse a `ListBucketResult` document (marker-based listing).
///
/// Element text is kept verbatim, so keys with surrounding whitespace survive.
/// The request id is not part of the body and is left empty.
pub fn parse_list_bucket(xml: &str) -> Result<ListBucketOutput, XmlError> {
    let mut output = ListBucketOutput::default();
    let mut entry: Option<EntryBuilder> = None;
    let mut saw_root = false;

    walk(xml, |node| {
        match node {
            Node::Open(["ListBucketResult"]) => saw_root = true,
            Node::Open([_, "Contents"]) => entry = Some(EntryBuilder::default()),
            Node::Open(_) => {}
            Node::Close(path, text) => match path {
                [_, "Name"] => output.bucket = text,
                [_, "Prefix"] => output.prefix = Some(text),
                [_, "Marker"] => output.marker = Some(text),
                [_, "NextMarker"] => output.next_marker = Some(text),
                [_, "Delimiter"] => output.delimiter = Some(text),
                [_, "MaxKeys"] => output.max_keys = Some(parse_number("MaxKeys", &text)?),
                [_, "IsTruncated"] => output.is_truncated = parse_bool("IsTruncated", &text)?,
                [_, "CommonPrefixes", "Prefix"] => output.common_prefixes.push(text),
                [_, "Contents"] => {
                    if let Some(done) = entry.take() {
                        output.contents.push(done.build()?);
                    }
                }
                [_, "Contents", field @ ..] => {
                    if let Some(current) = entry.as_mut() {
                        current.set(field, text)?;
                    }
                }
                _ => {}
            },
        }
        Ok(())
    })?;

    if !saw_root {
        return Err(XmlError::new("missing ListBucketResult root element"));
    }
    Ok(output)
}

/// Body of a create-bucket request outside the default region.
pub fn create_bucket_configuration(region: &str) -> String {
    format!(
        "<CreateBucketConfiguration xmlns=\"{}\"><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
        S3_NAMESPACE,
        escape(region)
    )
}
