//! Response parsing.
//!
//! [`check_status`] separates faults from results: every status other than
//! 2xx (and 304 for conditional gets) is turned into a [`ServiceError`],
//! decoded from the error body when there is one. The per-service modules
//! turn accepted responses into the typed results of each operation.
//!
//! [`ServiceError`]: crate::error::ServiceError

pub mod s3;
pub mod sqs;

use crate::error::{service_error, AwsError, ResponseError, TransportFault};
use crate::request::{Operation, OperationRequest};
use crate::transport::HttpResponse;
use crate::xml::{parse_error_response, XmlError};
use bytes::Bytes;
use tracing::warn;

/// HTTP status for an unchanged conditional get.
pub const NOT_MODIFIED: u16 = 304;

/// Pass through accepted responses and turn everything else into a fault.
///
/// 304 is accepted only for requests that carried `If-None-Match`. The error
/// body is read completely so the connection can be reused.
pub(crate) async fn check_status(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<HttpResponse, AwsError> {
    let conditional = request.headers().contains_key("if-none-match");
    if response.is_success() || (conditional && response.status == NOT_MODIFIED) {
        return Ok(response);
    }

    let status = response.status;
    let header_request_id = response.request_id().map(str::to_string);
    let header_host_id = response.host_id().map(str::to_string);
    let parsed = match response.body.collect().await {
        Ok(body) if !body.is_empty() => parse_error_response(&String::from_utf8_lossy(&body)),
        Ok(_) => None,
        Err(e) => {
            warn!(
                operation = %request.operation(),
                error = %e,
                "Failed to read error response body"
            );
            None
        }
    };

    let error = service_error(
        request.operation(),
        request.resource().to_string(),
        status,
        parsed,
        header_request_id,
        header_host_id,
    );
    warn!(
        operation = %error.operation,
        resource = %error.resource,
        status = error.status,
        code = error.code.as_deref().unwrap_or(""),
        request_id = error.request_id.as_deref().unwrap_or(""),
        "Service returned an error"
    );
    Err(error.into())
}

/// Read the whole body of an accepted response.
pub(crate) async fn read_body(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<Bytes, AwsError> {
    response.body.collect().await.map_err(|source| {
        AwsError::Transport(TransportFault {
            operation: request.operation(),
            resource: request.resource().to_string(),
            source,
        })
    })
}

/// Read the whole body as UTF-8 text.
pub(crate) async fn read_text(
    request: &OperationRequest,
    response: HttpResponse,
) -> Result<String, AwsError> {
    let body = read_body(request, response).await?;
    String::from_utf8(body.to_vec()).map_err(|e| {
        ResponseError::XmlParse {
            operation: request.operation(),
            message: format!("body is not UTF-8: {}", e),
        }
        .into()
    })
}

pub(crate) fn xml_fault(operation: Operation, error: XmlError) -> AwsError {
    ResponseError::XmlParse {
        operation,
        message: error.to_string(),
    }
    .into()
}
