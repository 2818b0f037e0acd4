//! Buckets service for S3 bucket operations.

use crate::config::AwsConfig;
use crate::error::AwsError;
use crate::request::s3 as build;
use crate::response::s3 as parse;
use crate::transport::RequestExecutor;
use crate::types::*;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Service for S3 bucket operations.
#[derive(Clone)]
pub struct BucketsService {
    config: Arc<AwsConfig>,
    executor: Arc<RequestExecutor>,
}

impl BucketsService {
    /// Create a new buckets service.
    pub fn new(config: Arc<AwsConfig>, executor: Arc<RequestExecutor>) -> Self {
        Self { config, executor }
    }

    /// Create a new bucket in the configured region.
    #[instrument(skip(self))]
    pub async fn create(&self, bucket: &str) -> Result<CreateBucketOutput, AwsError> {
        let request = build::create_bucket(&self.config, bucket)?;
        let response = self.executor.execute(&request).await?;
        debug!(status = response.status, "Bucket created");
        Ok(parse::create_bucket(bucket, response))
    }

    /// List all buckets owned by the caller.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<ListBucketsOutput, AwsError> {
        let request = build::list_all_buckets(&self.config)?;
        let response = self.executor.execute(&request).await?;
        let output = parse::list_all_buckets(&request, response).await?;
        debug!(count = output.buckets.len(), "Listed buckets");
        Ok(output)
    }

    /// Delete an empty bucket.
    #[instrument(skip(self))]
    pub async fn delete(&self, bucket: &str) -> Result<DeleteBucketOutput, AwsError> {
        let request = build::delete_bucket(&self.config, bucket)?;
        let response = self.executor.execute(&request).await?;
        Ok(parse::delete_bucket(bucket, response))
    }
}

impl std::fmt::Debug for BucketsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketsService")
            .field("region", &self.config.region)
            .finish_non_exhaustive()
    }
}
