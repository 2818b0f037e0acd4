//! Mock signer for testing.

use crate::error::{AwsError, SigningError};
use crate::request::OperationRequest;
use crate::signing::{AwsSigner, SignedRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Signer that stamps a fixed authorization header.
///
/// The request headers pass through unchanged so tests can assert on exactly
/// what the request builder produced.
pub struct MockSigner {
    sign_count: AtomicUsize,
    failure: Mutex<Option<String>>,
    signed: Mutex<Vec<SignedRequest>>,
}

impl MockSigner {
    /// Create a new mock signer.
    pub fn new() -> Self {
        Self {
            sign_count: AtomicUsize::new(0),
            failure: Mutex::new(None),
            signed: Mutex::new(Vec::new()),
        }
    }

    /// Create a signer that fails every call.
    pub fn failing(message: impl Into<String>) -> Self {
        let signer = Self::new();
        *signer.failure.lock() = Some(message.into());
        signer
    }

    /// Get the number of sign calls.
    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::SeqCst)
    }

    /// Get the last signed request.
    pub fn last_signed(&self) -> Option<SignedRequest> {
        self.signed.lock().last().cloned()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AwsSigner for MockSigner {
    async fn sign(&self, request: &OperationRequest) -> Result<SignedRequest, AwsError> {
        let count = self.sign_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = self.failure.lock().clone() {
            return Err(SigningError::CalculationFailed { message }.into());
        }

        let mut headers: HashMap<String, String> = request
            .headers()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.insert("host".to_string(), request.host());
        headers.insert(
            "authorization".to_string(),
            format!("AWS4-HMAC-SHA256 Credential=mock/signing, Signature={count:064x}"),
        );

        let signed = SignedRequest::from_parts(request.method().as_str(), request.url(), headers);
        self.signed.lock().push(signed.clone());
        Ok(signed)
    }
}

impl std::fmt::Debug for MockSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSigner")
            .field("sign_count", &self.sign_count())
            .finish_non_exhaustive()
    }
}
