//! HL7 lab checker endpoints: the form page and the upload API.

use axum::{
    extract::{multipart::MultipartRejection, rejection::FormRejection, Multipart, State},
    http::StatusCode,
    response::{Html, Response},
    routing::{post, MethodRouter},
    Form,
};
use serde::Deserialize;

use api_shared::{responses::to_json_indented, ErrorBody, InvalidHl7Body};
use interop_core::{ConversionRequest, ConversionResult, FailureClass, SourceFormat};

use crate::pages::{labcheck_page, PageOutput};
use crate::upload::{
    form_rejection_response, json_response, method_not_allowed, multipart_error_response,
    read_file_field, run_conversion,
};
use crate::AppState;

/// Multipart field holding the uploaded message.
pub const UPLOAD_FIELD: &str = "hl7_file";

#[derive(Debug, Deserialize)]
pub struct Hl7Form {
    #[serde(rename = "hl7-input", default)]
    pub hl7_input: Option<String>,
}

pub(crate) fn api_route() -> MethodRouter<AppState> {
    post(api_index).fallback(method_not_allowed)
}

/// GET /labcheck/
pub async fn index_page() -> Html<String> {
    labcheck_page("", None)
}

/// POST /labcheck/
///
/// Answers 200 once the form body is read: with the parsed message (4-space indent),
/// "Invalid HL7 message." or the parser's error text. An unreadable body keeps its rejection
/// status (413, 415).
pub async fn index_submit(
    State(state): State<AppState>,
    form: Result<Form<Hl7Form>, FormRejection>,
) -> Result<Html<String>, Response> {
    let Form(form) = form.map_err(form_rejection_response)?;
    let text = form.hl7_input.unwrap_or_default();

    let request = ConversionRequest::from_text(SourceFormat::Hl7, Some(text.clone()));
    let output = match run_conversion(state.service.clone(), request).await {
        ConversionResult::Success(parsed) => match to_json_indented(&parsed, 4) {
            Ok(json) => PageOutput {
                json: Some(json),
                error: None,
            },
            Err(e) => PageOutput {
                json: None,
                error: Some(e.to_string()),
            },
        },
        ConversionResult::Failure(failure) => PageOutput {
            json: None,
            error: Some(failure.error),
        },
    };

    Ok(labcheck_page(&text, Some(&output)))
}

#[utoipa::path(
    post,
    path = "/labcheck/api/",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "HL7 v2 message file in the `hl7_file` field"
    ),
    responses(
        (status = 200, description = "Parsed message (2-space indented JSON), or the invalid-message report", body = InvalidHl7Body),
        (status = 400, description = "No file uploaded", body = ErrorBody),
        (status = 405, description = "Method other than POST", body = ErrorBody),
        (status = 500, description = "Decoding or parsing failed", body = ErrorBody)
    )
)]
/// Check and parse an uploaded HL7 v2 message
///
/// A message that fails the structural check is reported with status 200, echoing the
/// submitted text. Only decoding and parsing failures are 500s.
pub async fn api_index(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let bytes = match read_file_field(multipart, UPLOAD_FIELD).await {
        Ok(bytes) => bytes,
        Err(e) => return multipart_error_response(e),
    };

    let request = match ConversionRequest::from_upload(SourceFormat::Hl7, bytes) {
        Ok(request) => request,
        Err(missing) => {
            return json_response(StatusCode::BAD_REQUEST, &ErrorBody::new(missing.error), None)
        }
    };

    match run_conversion(state.service.clone(), request).await {
        ConversionResult::Success(parsed) => {
            tracing::info!("labcheck api: parsed message");
            json_response(StatusCode::OK, &parsed, Some(2))
        }
        ConversionResult::Failure(failure) if failure.class == FailureClass::Invalid => {
            json_response(StatusCode::OK, &InvalidHl7Body::from(&failure), Some(2))
        }
        ConversionResult::Failure(failure) => {
            tracing::warn!("labcheck api: {} ({})", failure.error, failure.kind);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorBody::new(failure.error),
                Some(2),
            )
        }
    }
}
