//! AWS Signature V4 signing implementation.
//!
//! This module implements the AWS Signature V4 signing process for S3 and SQS
//! requests. It handles canonical request creation, string to sign generation,
//! and signature calculation. [`sign_request`] is a pure function of its
//! inputs; [`AwsSignerV4`] feeds it a fresh timestamp on every call.

pub mod canonical;
mod signer;

pub use signer::{AwsSigner, AwsSignerV4, SignedRequest};

use crate::credentials::AwsCredentials;
use crate::error::SigningError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// AWS Signature V4 algorithm identifier.
pub const AWS_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Payload hash used for streamed bodies that are not hashed up front.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Calculate SHA-256 hash of data.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Calculate HMAC-SHA256.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| SigningError::CalculationFailed {
            message: e.to_string(),
        })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Generate the signing key for AWS Signature V4.
///
/// kDate = HMAC("AWS4" + SecretKey, Date)
/// kRegion = HMAC(kDate, Region)
/// kService = HMAC(kRegion, Service)
/// kSigning = HMAC(kService, "aws4_request")
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, SigningError> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Build the credential scope string.
///
/// Format: `{date}/{region}/{service}/aws4_request`
pub fn build_credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// Format a timestamp for AWS signatures.
///
/// Returns the date-time in `YYYYMMDD'T'HHMMSS'Z'` format.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format a date stamp for AWS signatures.
///
/// Returns the date in `YYYYMMDD` format.
pub fn format_date_stamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}

/// Check if a header should be signed.
pub fn should_sign_header(header_name: &str) -> bool {
    let name_lower = header_name.to_lowercase();

    if name_lower == "host" || name_lower.starts_with("x-amz-") {
        return true;
    }

    name_lower == "content-type" || name_lower == "content-md5" || name_lower == "content-length"
}

/// Everything that goes into one signature.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Raw absolute resource path.
    pub path: &'a str,
    /// Raw query parameters.
    pub query: &'a BTreeMap<String, String>,
    /// Headers to sign; unsigned headers are ignored.
    pub headers: &'a [(String, String)],
    /// Hex SHA-256 of the payload, or [`UNSIGNED_PAYLOAD`].
    pub payload_hash: &'a str,
    /// Region in the credential scope.
    pub region: &'a str,
    /// Service in the credential scope (`s3`, `sqs`).
    pub service: &'a str,
    /// Signing time.
    pub timestamp: DateTime<Utc>,
}

/// Sign a request and return the `Authorization` header value.
///
/// The result depends only on the arguments. A path that is not absolute and
/// header values containing line breaks are rejected before hashing.
pub fn sign_request(
    input: &SigningInput<'_>,
    credentials: &AwsCredentials,
) -> Result<String, SigningError> {
    if !input.path.starts_with('/') {
        return Err(SigningError::InvalidPath {
            path: input.path.to_string(),
        });
    }
    for (name, value) in input.headers {
        if value.contains(['\r', '\n']) {
            return Err(SigningError::InvalidHeader {
                name: name.clone(),
                message: "value contains a line break".to_string(),
            });
        }
    }

    let date_stamp = format_date_stamp(&input.timestamp);
    let amz_date = format_datetime(&input.timestamp);

    let canonical_request = canonical::build_canonical_request(
        input.method,
        input.path,
        input.query,
        input.headers,
        input.payload_hash,
    );

    let credential_scope = build_credential_scope(&date_stamp, input.region, input.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        AWS_ALGORITHM,
        amz_date,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(
        credentials.secret_access_key(),
        &date_stamp,
        input.region,
        input.service,
    )?;
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        AWS_ALGORITHM,
        credentials.access_key_id(),
        credential_scope,
        canonical::build_signed_headers(input.headers),
        signature
    ))
}
