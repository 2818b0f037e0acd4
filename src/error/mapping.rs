//! Mapping from service error codes and HTTP statuses to error kinds.

use super::*;

/// Parsed service error body.
///
/// S3 returns `<Error><Code/><Message/><RequestId/><HostId/></Error>`; SQS
/// wraps the same fields in `<ErrorResponse>`. Both decode into this shape.
#[derive(Debug, Clone, Default)]
pub struct ServiceErrorResponse {
    /// Service error code (e.g., "NoSuchKey").
    pub code: Option<String>,
    /// Human-readable error message.
    pub message: Option<String>,
    /// Affected bucket, if any.
    pub bucket: Option<String>,
    /// Affected key, if any.
    pub key: Option<String>,
    /// Request ID.
    pub request_id: Option<String>,
    /// Extended request ID.
    pub host_id: Option<String>,
}

/// Codes the service documents as safe to retry.
const TRANSIENT_CODES: &[&str] = &[
    "InternalError",
    "ServiceUnavailable",
    "SlowDown",
    "RequestTimeout",
    "Throttling",
    "ThrottlingException",
    "RequestThrottled",
    "ServiceUnavailableException",
    "AWS.SimpleQueueService.ServiceUnavailable",
];

/// Returns true if `code` is in the transient whitelist.
pub fn is_transient_code(code: &str) -> bool {
    TRANSIENT_CODES.contains(&code)
}

/// Classify a service fault from its error code, falling back to the status.
pub fn classify(code: Option<&str>, status: u16) -> ServiceErrorKind {
    if let Some(code) = code {
        if let Some(kind) = classify_code(code) {
            return kind;
        }
    }

    match status {
        404 => ServiceErrorKind::NotFound,
        401 | 403 => ServiceErrorKind::AccessDenied,
        409 => ServiceErrorKind::AlreadyExists,
        412 => ServiceErrorKind::PreconditionFailed,
        429 => ServiceErrorKind::Throttled,
        400..=499 => ServiceErrorKind::InvalidRequest,
        500..=599 => ServiceErrorKind::ServerError,
        _ => ServiceErrorKind::Other,
    }
}

fn classify_code(code: &str) -> Option<ServiceErrorKind> {
    let kind = match code {
        "NoSuchBucket" => ServiceErrorKind::BucketNotFound,
        "NoSuchKey" => ServiceErrorKind::ObjectNotFound,
        "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
            ServiceErrorKind::QueueNotFound
        }
        "BucketAlreadyExists"
        | "BucketAlreadyOwnedByYou"
        | "QueueAlreadyExists"
        | "AWS.SimpleQueueService.QueueDeletedRecently" => ServiceErrorKind::AlreadyExists,
        "BucketNotEmpty" => ServiceErrorKind::NotEmpty,
        "AccessDenied"
        | "InvalidAccessKeyId"
        | "InvalidClientTokenId"
        | "SignatureDoesNotMatch"
        | "ExpiredToken"
        | "RequestTimeTooSkewed"
        | "AccountProblem" => ServiceErrorKind::AccessDenied,
        "PreconditionFailed" => ServiceErrorKind::PreconditionFailed,
        "SlowDown" | "Throttling" | "ThrottlingException" | "RequestThrottled" => {
            ServiceErrorKind::Throttled
        }
        "InternalError"
        | "ServiceUnavailable"
        | "ServiceUnavailableException"
        | "AWS.SimpleQueueService.ServiceUnavailable" => ServiceErrorKind::ServerError,
        "InvalidBucketName"
        | "InvalidArgument"
        | "InvalidRequest"
        | "MalformedXML"
        | "InvalidParameterValue"
        | "MissingParameter"
        | "InvalidAction"
        | "KeyTooLongError"
        | "EntityTooLarge"
        | "BadDigest"
        | "InvalidDigest"
        | "IncompleteBody"
        | "RequestTimeout" => ServiceErrorKind::InvalidRequest,
        _ => return None,
    };
    Some(kind)
}

/// Build a typed service fault from a status, an optional parsed body and
/// the request ids found in the response headers.
///
/// Ids in the body win; the header ids fill in when the body has none (HEAD
/// responses never carry one).
pub(crate) fn service_error(
    operation: Operation,
    resource: String,
    status: u16,
    parsed: Option<ServiceErrorResponse>,
    header_request_id: Option<String>,
    header_host_id: Option<String>,
) -> ServiceError {
    let parsed = parsed.unwrap_or_default();
    let kind = classify(parsed.code.as_deref(), status);
    let message = parsed
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status_text(status).to_string());

    ServiceError {
        operation,
        resource,
        kind,
        status,
        code: parsed.code.filter(|c| !c.is_empty()),
        message,
        request_id: parsed.request_id.or(header_request_id),
        host_id: parsed.host_id.or(header_host_id),
    }
}

fn status_text(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown status")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("NoSuchBucket"), 404 => ServiceErrorKind::BucketNotFound)]
    #[test_case(Some("NoSuchKey"), 404 => ServiceErrorKind::ObjectNotFound)]
    #[test_case(Some("AWS.SimpleQueueService.NonExistentQueue"), 400 => ServiceErrorKind::QueueNotFound)]
    #[test_case(Some("BucketAlreadyOwnedByYou"), 409 => ServiceErrorKind::AlreadyExists)]
    #[test_case(Some("BucketNotEmpty"), 409 => ServiceErrorKind::NotEmpty)]
    #[test_case(Some("SignatureDoesNotMatch"), 403 => ServiceErrorKind::AccessDenied)]
    #[test_case(Some("SlowDown"), 503 => ServiceErrorKind::Throttled)]
    #[test_case(Some("SomethingNew"), 404 => ServiceErrorKind::NotFound)]
    #[test_case(None, 403 => ServiceErrorKind::AccessDenied)]
    #[test_case(None, 412 => ServiceErrorKind::PreconditionFailed)]
    #[test_case(None, 502 => ServiceErrorKind::ServerError)]
    #[test_case(None, 418 => ServiceErrorKind::InvalidRequest)]
    fn test_classify(code: Option<&str>, status: u16) -> ServiceErrorKind {
        classify(code, status)
    }

    #[test]
    fn test_service_error_without_body_uses_status_line() {
        let err = service_error(
            Operation::Head,
            "bucket1/missing".into(),
            404,
            None,
            Some("HDR-REQ".into()),
            Some("HDR-HOST".into()),
        );
        assert_eq!(err.kind, ServiceErrorKind::NotFound);
        assert_eq!(err.message, "Not Found");
        assert_eq!(err.code, None);
        assert_eq!(err.request_id.as_deref(), Some("HDR-REQ"));
        assert_eq!(err.host_id.as_deref(), Some("HDR-HOST"));
    }

    #[test]
    fn test_body_request_id_wins_over_header() {
        let parsed = ServiceErrorResponse {
            code: Some("NoSuchKey".into()),
            message: Some("The specified key does not exist.".into()),
            request_id: Some("BODY-REQ".into()),
            host_id: Some("BODY-HOST".into()),
            ..Default::default()
        };
        let err = service_error(
            Operation::Get,
            "bucket1/k1".into(),
            404,
            Some(parsed),
            Some("HDR-REQ".into()),
            Some("HDR-HOST".into()),
        );
        assert_eq!(err.request_id.as_deref(), Some("BODY-REQ"));
        assert_eq!(err.host_id.as_deref(), Some("BODY-HOST"));
        assert_eq!(err.message, "The specified key does not exist.");
    }
}
