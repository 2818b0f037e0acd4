//! Request builders for the S3 operations.
//!
//! Builders validate their input and never perform I/O, except
//! [`measure_size`] which seeks the caller's stream.

use super::{Operation, OperationRequest, RequestBody};
use crate::config::AwsConfig;
use crate::error::{AwsError, RequestError};
use crate::types::{ListBucketRequest, ObjectSize, PutObjectRequest};
use crate::xml::create_bucket_configuration;
use base64::Engine;
use bytes::Bytes;
use http::Method;
use md5::{Digest, Md5};
use std::io::SeekFrom;
use tokio::io::{AsyncSeek, AsyncSeekExt};

/// Maximum bucket name length accepted by the service.
pub const MAX_BUCKET_NAME_LEN: usize = 255;

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Region that takes no `LocationConstraint` on bucket creation.
const DEFAULT_REGION: &str = "us-east-1";

/// Validate a bucket name.
pub fn validate_bucket(bucket: &str) -> Result<(), RequestError> {
    if bucket.is_empty() {
        return Err(RequestError::EmptyName { field: "bucket" });
    }
    if bucket.len() > MAX_BUCKET_NAME_LEN {
        return Err(RequestError::InvalidBucketName {
            bucket: bucket.to_string(),
            reason: format!("longer than {} characters", MAX_BUCKET_NAME_LEN),
        });
    }
    if bucket.contains('/') {
        return Err(RequestError::InvalidBucketName {
            bucket: bucket.to_string(),
            reason: "must not contain '/'".to_string(),
        });
    }
    if bucket.chars().any(char::is_control) {
        return Err(RequestError::InvalidBucketName {
            bucket: bucket.to_string(),
            reason: "must not contain control characters".to_string(),
        });
    }
    Ok(())
}

/// Validate an object key.
pub fn validate_key(key: &str) -> Result<(), RequestError> {
    if key.is_empty() {
        return Err(RequestError::EmptyName { field: "key" });
    }
    if key.len() > MAX_KEY_LEN {
        return Err(RequestError::InvalidKey {
            key: key.to_string(),
            reason: format!("longer than {} bytes", MAX_KEY_LEN),
        });
    }
    // URL parsers collapse `.` and `..` segments (encoded or not), so the
    // request would reach a different path than the one signed.
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(RequestError::InvalidKey {
            key: key.to_string(),
            reason: "must not contain '.' or '..' path segments".to_string(),
        });
    }
    Ok(())
}

fn bucket_request(
    config: &AwsConfig,
    operation: Operation,
    method: Method,
    bucket: &str,
) -> Result<OperationRequest, AwsError> {
    validate_bucket(bucket).map_err(|e| e.during(operation, bucket))?;
    let endpoint = config.resolve_endpoint(Some(bucket))?;
    let path = config.build_path(bucket, None);
    Ok(OperationRequest::new(operation, bucket, method, endpoint, path))
}

fn object_request(
    config: &AwsConfig,
    operation: Operation,
    method: Method,
    bucket: &str,
    key: &str,
) -> Result<OperationRequest, AwsError> {
    let resource = format!("{}/{}", bucket, key);
    validate_bucket(bucket)
        .and_then(|_| validate_key(key))
        .map_err(|e| e.during(operation, resource.as_str()))?;
    let endpoint = config.resolve_endpoint(Some(bucket))?;
    let path = config.build_path(bucket, Some(key));
    Ok(OperationRequest::new(operation, resource, method, endpoint, path))
}

/// `PUT /{bucket}`.
pub fn create_bucket(config: &AwsConfig, bucket: &str) -> Result<OperationRequest, AwsError> {
    let request = bucket_request(config, Operation::CreateBucket, Method::PUT, bucket)?;
    if config.region == DEFAULT_REGION {
        return Ok(request);
    }
    let body = Bytes::from(create_bucket_configuration(&config.region));
    Ok(request
        .with_header("content-type", "application/xml")
        .with_body(RequestBody::Buffered(body)))
}

/// `GET /` on the service endpoint.
pub fn list_all_buckets(config: &AwsConfig) -> Result<OperationRequest, AwsError> {
    let endpoint = config.resolve_endpoint(None)?;
    Ok(OperationRequest::new(
        Operation::ListAllBuckets,
        "*",
        Method::GET,
        endpoint,
        "/",
    ))
}

/// `DELETE /{bucket}`.
pub fn delete_bucket(config: &AwsConfig, bucket: &str) -> Result<OperationRequest, AwsError> {
    bucket_request(config, Operation::DeleteBucket, Method::DELETE, bucket)
}

/// `GET /{bucket}?prefix&marker&delimiter&max-keys`.
///
/// Empty prefix, marker and delimiter are omitted. `max-keys` is sent only
/// when positive.
pub fn list_bucket(
    config: &AwsConfig,
    request: &ListBucketRequest,
) -> Result<OperationRequest, AwsError> {
    let mut built = bucket_request(config, Operation::ListBucket, Method::GET, &request.bucket)?;

    let params = [
        ("prefix", &request.prefix),
        ("marker", &request.marker),
        ("delimiter", &request.delimiter),
    ];
    for (name, value) in params {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            built = built.with_query(name, value);
        }
    }
    if let Some(max_keys) = request.max_keys.filter(|&n| n > 0) {
        built = built.with_query("max-keys", max_keys.to_string());
    }
    Ok(built)
}

/// `PUT /{bucket}/{key}`.
///
/// In-memory bodies also carry `Content-MD5`.
pub fn put_object(
    config: &AwsConfig,
    request: &PutObjectRequest,
    body: RequestBody,
) -> Result<OperationRequest, AwsError> {
    let mut built = object_request(config, Operation::Put, Method::PUT, &request.bucket, &request.key)?;

    let headers = [
        ("content-type", &request.content_type),
        ("content-encoding", &request.content_encoding),
        ("content-disposition", &request.content_disposition),
        ("cache-control", &request.cache_control),
    ];
    for (name, value) in headers {
        if let Some(value) = value {
            built = built.with_header(name, value.clone());
        }
    }
    for (name, value) in &request.metadata {
        built = built.with_header(format!("x-amz-meta-{}", name), value.clone());
    }
    if let RequestBody::Buffered(bytes) = &body {
        built = built.with_header("content-md5", content_md5(bytes));
    }
    Ok(built.with_body(body))
}

/// `GET /{bucket}/{key}`, conditional when `if_none_match` is given.
pub fn get_object(
    config: &AwsConfig,
    bucket: &str,
    key: &str,
    if_none_match: Option<&str>,
) -> Result<OperationRequest, AwsError> {
    let request = object_request(config, Operation::Get, Method::GET, bucket, key)?;
    match if_none_match {
        Some(e_tag) if !e_tag.is_empty() => Ok(request.with_header("if-none-match", e_tag)),
        Some(_) => Err(RequestError::EmptyName { field: "etag" }
            .during(Operation::Get, request.resource())
            .into()),
        None => Ok(request),
    }
}

/// `DELETE /{bucket}/{key}`.
pub fn delete_object(config: &AwsConfig, bucket: &str, key: &str) -> Result<OperationRequest, AwsError> {
    object_request(config, Operation::Delete, Method::DELETE, bucket, key)
}

/// `HEAD /{bucket}/{key}`.
pub fn head_object(config: &AwsConfig, bucket: &str, key: &str) -> Result<OperationRequest, AwsError> {
    object_request(config, Operation::Head, Method::HEAD, bucket, key)
}

/// Base64 MD5 digest for the `Content-MD5` header.
pub fn content_md5(body: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Md5::digest(body))
}

/// Number of bytes left in `reader`.
///
/// With [`ObjectSize::MeasureBySeeking`] the stream is sought to its end and
/// back to where it was. Streams that cannot seek yield
/// [`RequestError::SizeUnknown`].
pub async fn measure_size<R>(reader: &mut R, size: ObjectSize) -> Result<u64, RequestError>
where
    R: AsyncSeek + Unpin + ?Sized,
{
    match size {
        ObjectSize::Known(n) => Ok(n),
        ObjectSize::MeasureBySeeking => {
            let unknown = |e: std::io::Error| RequestError::SizeUnknown {
                message: e.to_string(),
            };
            let start = reader.stream_position().await.map_err(unknown)?;
            let end = reader.seek(SeekFrom::End(0)).await.map_err(unknown)?;
            reader.seek(SeekFrom::Start(start)).await.map_err(unknown)?;
            Ok(end.saturating_sub(start))
        }
    }
}
