//! Objects service for S3 object operations.

use crate::config::AwsConfig;
use crate::error::AwsError;
use crate::pagination::ListCursor;
use crate::request::s3 as build;
use crate::request::{Operation, RequestBody};
use crate::response::s3 as parse;
use crate::transport::RequestExecutor;
use crate::types::*;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};
use tracing::{debug, instrument};

/// Service for S3 object operations.
#[derive(Clone)]
pub struct ObjectsService {
    config: Arc<AwsConfig>,
    executor: Arc<RequestExecutor>,
}

impl ObjectsService {
    /// Create a new objects service.
    pub fn new(config: Arc<AwsConfig>, executor: Arc<RequestExecutor>) -> Self {
        Self { config, executor }
    }

    /// Fetch one page of a bucket listing.
    #[instrument(skip(self, request), fields(bucket = %request.bucket, marker = ?request.marker))]
    pub async fn list(&self, request: &ListBucketRequest) -> Result<ListBucketOutput, AwsError> {
        let built = build::list_bucket(&self.config, request)?;
        let response = self.executor.execute(&built).await?;
        let output = parse::list_bucket(&built, &request.bucket, response).await?;
        debug!(
            entries = output.contents.len(),
            prefixes = output.common_prefixes.len(),
            truncated = output.is_truncated,
            "Listed bucket page"
        );
        Ok(output)
    }

    /// List a bucket without a delimiter.
    pub async fn list_bucket(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        max_keys: u32,
    ) -> Result<ListBucketOutput, AwsError> {
        let request = ListBucketRequest::new(bucket)
            .with_prefix(prefix)
            .with_marker(marker)
            .with_max_keys(max_keys);
        self.list(&request).await
    }

    /// List a bucket, rolling keys up to `delimiter`.
    pub async fn list_bucket_with_delimiter(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: u32,
    ) -> Result<ListBucketOutput, AwsError> {
        let request = ListBucketRequest::new(bucket)
            .with_prefix(prefix)
            .with_marker(marker)
            .with_delimiter(delimiter)
            .with_max_keys(max_keys);
        self.list(&request).await
    }

    /// A cursor over every page of a listing, starting at `request.marker`.
    pub fn list_pages(&self, request: ListBucketRequest) -> ListCursor {
        ListCursor::new(self.clone(), request)
    }

    /// Upload an in-memory object.
    #[instrument(skip(self, request, body), fields(bucket = %request.bucket, key = %request.key))]
    pub async fn put(
        &self,
        request: &PutObjectRequest,
        body: impl Into<Bytes>,
    ) -> Result<PutObjectOutput, AwsError> {
        let built = build::put_object(&self.config, request, RequestBody::Buffered(body.into()))?;
        let response = self.executor.execute(&built).await?;
        Ok(parse::put_object(&request.bucket, &request.key, response))
    }

    /// Upload from a seekable stream.
    ///
    /// With [`ObjectSize::MeasureBySeeking`] the remaining length of the
    /// stream is measured first; a stream that cannot seek fails before any
    /// request is sent.
    #[instrument(skip(self, request, reader), fields(bucket = %request.bucket, key = %request.key))]
    pub async fn put_stream<R>(
        &self,
        request: &PutObjectRequest,
        reader: &mut R,
        size: ObjectSize,
    ) -> Result<PutObjectOutput, AwsError>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send + ?Sized,
    {
        let length = build::measure_size(reader, size).await.map_err(|e| {
            e.during(
                Operation::Put,
                format!("{}/{}", request.bucket, request.key),
            )
        })?;
        debug!(length, "Measured upload size");
        self.put_reader(request, reader, length).await
    }

    /// Upload exactly `length` bytes read from `reader`.
    #[instrument(skip(self, request, reader), fields(bucket = %request.bucket, key = %request.key))]
    pub async fn put_reader<R>(
        &self,
        request: &PutObjectRequest,
        reader: &mut R,
        length: u64,
    ) -> Result<PutObjectOutput, AwsError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let built = build::put_object(
            &self.config,
            request,
            RequestBody::Streaming {
                content_length: length,
            },
        )?;
        let response = self.executor.execute_streaming(&built, reader).await?;
        Ok(parse::put_object(&request.bucket, &request.key, response))
    }

    /// Download an object. The body is streamed.
    #[instrument(skip(self))]
    pub async fn get(&self, bucket: &str, key: &str) -> Result<GetObjectOutput, AwsError> {
        let request = build::get_object(&self.config, bucket, key, None)?;
        let response = self.executor.execute(&request).await?;
        parse::get_object(bucket, key, response)
    }

    /// Download an object unless its ETag still equals `e_tag`.
    #[instrument(skip(self))]
    pub async fn get_if_changed(
        &self,
        bucket: &str,
        key: &str,
        e_tag: &str,
    ) -> Result<ConditionalGetOutput, AwsError> {
        let request = build::get_object(&self.config, bucket, key, Some(e_tag))?;
        let response = self.executor.execute(&request).await?;
        let output = parse::conditional_get(bucket, key, response)?;
        debug!(modified = output.is_modified(), "Conditional get");
        Ok(output)
    }

    /// Delete an object.
    #[instrument(skip(self))]
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<DeleteObjectOutput, AwsError> {
        let request = build::delete_object(&self.config, bucket, key)?;
        let response = self.executor.execute(&request).await?;
        Ok(parse::delete_object(bucket, key, response))
    }

    /// Fetch object metadata without the body.
    #[instrument(skip(self))]
    pub async fn head(&self, bucket: &str, key: &str) -> Result<HeadObjectOutput, AwsError> {
        let request = build::head_object(&self.config, bucket, key)?;
        let response = self.executor.execute(&request).await?;
        parse::head_object(bucket, key, &response, request.operation())
    }
}

impl std::fmt::Debug for ObjectsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsService")
            .field("region", &self.config.region)
            .finish_non_exhaustive()
    }
}
