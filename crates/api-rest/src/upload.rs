//! Helpers shared by the upload endpoints: multipart reading, off-reactor conversion and JSON
//! responses.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
        Multipart,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use api_shared::{responses::to_json_indented, ErrorBody};
use interop_core::{
    constants::ONLY_POST_MESSAGE, ConversionFailure, ConversionRequest, ConversionResult,
    ConversionService, FailureClass, Stage,
};

/// Read the named file field from a multipart body.
///
/// A request that is not multipart at all has no file, so it yields `Ok(None)` like a form
/// without the field.
pub(crate) async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> Result<Option<Vec<u8>>, MultipartError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("upload is not multipart: {}", rejection);
            return Ok(None);
        }
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(field_name) {
            let bytes = field.bytes().await?;
            return Ok(Some(bytes.to_vec()));
        }
    }
    Ok(None)
}

/// A form body that could not be read (too large, wrong content type, undecodable) is answered
/// with the rejection's own status and text. A missing field is not a rejection.
pub(crate) fn form_rejection_response(rejection: FormRejection) -> Response {
    tracing::warn!("failed to read form: {}", rejection);
    (rejection.status(), rejection.body_text()).into_response()
}

pub(crate) fn multipart_error_response(err: MultipartError) -> Response {
    tracing::warn!("failed to read upload: {}", err);
    json_response(err.status(), &ErrorBody::new(err.body_text()), None)
}

/// Run a conversion on the blocking pool so CPU-bound work never stalls the reactor.
pub(crate) async fn run_conversion(
    service: ConversionService,
    request: ConversionRequest,
) -> ConversionResult {
    match tokio::task::spawn_blocking(move || service.convert(request)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("conversion task failed: {:?}", e);
            ConversionResult::Failure(ConversionFailure {
                error: "conversion task failed".into(),
                kind: "JoinError".into(),
                cause: Some(e.to_string()),
                class: FailureClass::Conversion,
                stage: Stage::Converting,
                input: None,
            })
        }
    }
}

/// Serialise `body` as a JSON response, indented when `indent` is given.
pub(crate) fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    body: &T,
    indent: Option<usize>,
) -> Response {
    let rendered = match indent {
        Some(width) => to_json_indented(body, width),
        None => serde_json::to_string(body),
    };
    match rendered {
        Ok(json) => (status, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(e) => {
            tracing::error!("failed to serialise response: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}

/// 405 reply for anything but POST on an upload endpoint.
pub(crate) async fn method_not_allowed() -> Response {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorBody::new(ONLY_POST_MESSAGE),
        None,
    )
}
