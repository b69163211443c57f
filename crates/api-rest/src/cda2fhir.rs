//! CDA to FHIR endpoints: the form page and the upload API.

use axum::{
    extract::{multipart::MultipartRejection, rejection::FormRejection, Multipart, State},
    http::StatusCode,
    response::{Html, Response},
    routing::{post, MethodRouter},
    Form,
};
use serde::Deserialize;

use api_shared::{responses::to_json_indented, CdaErrorBody, ErrorBody};
use interop_core::{ConversionRequest, ConversionResult, SourceFormat};

use crate::pages::{cda2fhir_page, PageOutput};
use crate::upload::{
    form_rejection_response, json_response, method_not_allowed, multipart_error_response,
    read_file_field, run_conversion,
};
use crate::AppState;

/// Multipart field holding the uploaded document.
pub const UPLOAD_FIELD: &str = "cda_file";

#[derive(Debug, Deserialize)]
pub struct CdaForm {
    #[serde(rename = "cda-input", default)]
    pub cda_input: Option<String>,
}

pub(crate) fn api_route() -> MethodRouter<AppState> {
    post(api_index).fallback(method_not_allowed)
}

/// GET /cda2fhir/
pub async fn index_page() -> Html<String> {
    cda2fhir_page("", None)
}

/// POST /cda2fhir/
///
/// Answers 200 once the form body is read. The result area shows the Bundle on success and the
/// error object on failure. An unreadable body keeps its rejection status (413, 415).
pub async fn index_submit(
    State(state): State<AppState>,
    form: Result<Form<CdaForm>, FormRejection>,
) -> Result<Html<String>, Response> {
    let Form(form) = form.map_err(form_rejection_response)?;
    let xml = form.cda_input.unwrap_or_default();

    let request = ConversionRequest::from_text(SourceFormat::Ccda, Some(xml.clone()));
    let result = run_conversion(state.service.clone(), request).await;

    let rendered = match &result {
        ConversionResult::Success(bundle) => to_json_indented(bundle, 2),
        ConversionResult::Failure(failure) => {
            tracing::info!("cda2fhir page: conversion failed ({})", failure.kind);
            to_json_indented(&CdaErrorBody::from(failure), 2)
        }
    };
    let output = match rendered {
        Ok(json) => PageOutput {
            json: Some(json),
            error: None,
        },
        Err(e) => PageOutput {
            json: None,
            error: Some(e.to_string()),
        },
    };

    Ok(cda2fhir_page(&xml, Some(&output)))
}

#[utoipa::path(
    post,
    path = "/cda2fhir/api/",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "C-CDA XML file in the `cda_file` field"
    ),
    responses(
        (status = 200, description = "FHIR Bundle (2-space indented JSON)"),
        (status = 400, description = "No file uploaded", body = ErrorBody),
        (status = 405, description = "Method other than POST", body = ErrorBody),
        (status = 500, description = "Conversion failed", body = CdaErrorBody)
    )
)]
/// Convert an uploaded C-CDA document into a FHIR Bundle
///
/// The document is rendered with the configured document type. Any decoding, parsing or
/// rendering failure is reported as a 500 with the error text, its kind and its cause.
pub async fn api_index(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let bytes = match read_file_field(multipart, UPLOAD_FIELD).await {
        Ok(bytes) => bytes,
        Err(e) => return multipart_error_response(e),
    };

    let request = match ConversionRequest::from_upload(SourceFormat::Ccda, bytes) {
        Ok(request) => request,
        Err(missing) => {
            return json_response(StatusCode::BAD_REQUEST, &ErrorBody::new(missing.error), None)
        }
    };

    match run_conversion(state.service.clone(), request).await {
        ConversionResult::Success(bundle) => {
            tracing::info!("cda2fhir api: converted document");
            json_response(StatusCode::OK, &bundle, Some(2))
        }
        ConversionResult::Failure(failure) => {
            tracing::warn!("cda2fhir api: {} ({})", failure.error, failure.kind);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &CdaErrorBody::from(&failure),
                None,
            )
        }
    }
}
