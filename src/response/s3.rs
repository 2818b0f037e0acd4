//! Typed results of the S3 operations.

use super::{read_text, xml_fault, NOT_MODIFIED};
use crate::error::{AwsError, ResponseError};
use crate::request::{Operation, OperationRequest};
use crate::transport::HttpResponse;
use crate::types::*;
use crate::xml;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::warn;

/// Prefix of user metadata headers.
pub const METADATA_PREFIX: &str = "x-amz-meta-";

/// HTTP date layouts other than RFC 1123: RFC 850 and asctime.
const OBSOLETE_DATE_FORMATS: &[&str] = &["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parse an HTTP date in any of the layouts HTTP/1.1 accepts.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Identifiers and timestamp every response carries in its headers.
struct Stamp {
    request_id: Option<String>,
    host_id: Option<String>,
    date: Option<DateTime<Utc>>,
}

fn stamp(response: &HttpResponse) -> Stamp {
    Stamp {
        request_id: response.request_id().map(str::to_string),
        host_id: response.host_id().map(str::to_string),
        date: response.date().and_then(parse_http_date),
    }
}

/// Collect `x-amz-meta-*` headers with the prefix stripped.
pub fn extract_metadata(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            lower
                .strip_prefix(METADATA_PREFIX)
                .map(|key| (key.to_string(), value.clone()))
        })
        .collect()
}

/// An unreadable `Last-Modified` is dropped rather than failing the call.
fn last_modified(operation: Operation, response: &HttpResponse) -> Option<DateTime<Utc>> {
    let value = response.get_header("last-modified")?;
    let parsed = parse_http_date(value);
    if parsed.is_none() {
        warn!(operation = %operation, value, "Ignoring unparseable Last-Modified header");
    }
    parsed
}

fn content_length(operation: Operation, response: &HttpResponse) -> Result<Option<u64>, AwsError> {
    match response.get_header("content-length") {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            ResponseError::InvalidHeader {
                operation,
                header: "Content-Length",
                value: value.to_string(),
            }
            .into()
        }),
    }
}

/// Result of `createBucket`.
pub fn create_bucket(bucket: &str, response: HttpResponse) -> CreateBucketOutput {
    let stamp = stamp(&response);
    CreateBucketOutput {
        bucket: bucket.to_string(),
        location: response.get_header("location").map(str::to_string),
        request_id: stamp.request_id,
        host_id: stamp.host_id,
        date: stamp.date,
    }
}

/// Result of `listAllBuckets`.
pub async fn list_all_buckets(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<ListBucketsOutput, AwsError> {
    let stamp = stamp(&response);
    let body = read_text(request, response).await?;
    let (owner, buckets) =
        xml::parse_list_buckets(&body).map_err(|e| xml_fault(request.operation(), e))?;
    Ok(ListBucketsOutput {
        owner,
        buckets,
        request_id: stamp.request_id,
        host_id: stamp.host_id,
        date: stamp.date,
    })
}

/// Result of `deleteBucket`.
pub fn delete_bucket(bucket: &str, response: HttpResponse) -> DeleteBucketOutput {
    let stamp = stamp(&response);
    DeleteBucketOutput {
        bucket: bucket.to_string(),
        request_id: stamp.request_id,
        host_id: stamp.host_id,
        date: stamp.date,
    }
}

/// One page of `listBucket`.
pub async fn list_bucket(
    request: &OperationRequest,
    bucket: &str,
    response: HttpResponse,
) -> Result<ListBucketOutput, AwsError> {
    let stamp = stamp(&response);
    let body = read_text(request, response).await?;
    let mut output =
        xml::parse_list_bucket(&body).map_err(|e| xml_fault(request.operation(), e))?;
    if output.bucket.is_empty() {
        output.bucket = bucket.to_string();
    }
    output.request_id = stamp.request_id;
    output.host_id = stamp.host_id;
    output.date = stamp.date;
    Ok(output)
}

/// Result of `put`.
pub fn put_object(bucket: &str, key: &str, response: HttpResponse) -> PutObjectOutput {
    let stamp = stamp(&response);
    PutObjectOutput {
        bucket: bucket.to_string(),
        key: key.to_string(),
        e_tag: response.etag().map(str::to_string),
        version_id: response.get_header("x-amz-version-id").map(str::to_string),
        request_id: stamp.request_id,
        host_id: stamp.host_id,
        date: stamp.date,
    }
}

/// Result of `get`. The body is handed over unread.
pub fn get_object(
    bucket: &str,
    key: &str,
    response: HttpResponse,
) -> Result<GetObjectOutput, AwsError> {
    let head = head_object(bucket, key, &response, Operation::Get)?;
    let body = response.body.with_origin(Operation::Get, format!("{}/{}", bucket, key));
    Ok(GetObjectOutput {
        bucket: head.bucket,
        key: head.key,
        body,
        content_length: head.content_length,
        content_type: head.content_type,
        e_tag: head.e_tag,
        last_modified: head.last_modified,
        metadata: head.metadata,
        request_id: head.request_id,
        host_id: head.host_id,
        date: head.date,
    })
}

/// Result of a conditional `get`.
pub fn conditional_get(
    bucket: &str,
    key: &str,
    response: HttpResponse,
) -> Result<ConditionalGetOutput, AwsError> {
    if response.status == NOT_MODIFIED {
        let stamp = stamp(&response);
        return Ok(ConditionalGetOutput::NotModified {
            e_tag: response.etag().map(str::to_string),
            request_id: stamp.request_id,
            host_id: stamp.host_id,
            date: stamp.date,
        });
    }
    get_object(bucket, key, response).map(ConditionalGetOutput::Modified)
}

/// Result of `delete`.
pub fn delete_object(bucket: &str, key: &str, response: HttpResponse) -> DeleteObjectOutput {
    let stamp = stamp(&response);
    DeleteObjectOutput {
        bucket: bucket.to_string(),
        key: key.to_string(),
        request_id: stamp.request_id,
        host_id: stamp.host_id,
        date: stamp.date,
    }
}

/// Result of `head`, read from the response headers.
pub fn head_object(
    bucket: &str,
    key: &str,
    response: &HttpResponse,
    operation: Operation,
) -> Result<HeadObjectOutput, AwsError> {
    let stamp = stamp(response);
    Ok(HeadObjectOutput {
        bucket: bucket.to_string(),
        key: key.to_string(),
        content_length: content_length(operation, response)?,
        content_type: response.content_type().map(str::to_string),
        e_tag: response.etag().map(str::to_string),
        last_modified: last_modified(operation, response),
        metadata: extract_metadata(&response.headers),
        request_id: stamp.request_id,
        host_id: stamp.host_id,
        date: stamp.date,
    })
}
