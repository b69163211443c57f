//! Integration tests for the interop REST endpoints
//!
//! Tests cover:
//! - CDA to FHIR page and upload API with good and bad documents
//! - HL7 lab checker page and upload API with good, invalid and missing uploads
//! - 405 replies for non-POST requests on the upload APIs
//! - Health endpoint and upload size limit

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

use api_rest::{build_router, AppState};
use interop_core::CoreConfig;

const GOOD_CCDA: &str = include_str!("test_files/good-ccda.xml");
const BAD_CCDA: &str = include_str!("test_files/bad-ccda.xml");
const ADT: &str = include_str!("test_files/adt.hl7");
const LAB_MESSAGE: &str = include_str!("test_files/redacted-lab-message.hl7");
const BAD_HL7: &str = include_str!("test_files/bad-hl7.hl7");

const BOUNDARY: &str = "interop-test-boundary";

/// Test helper: Create app with default configuration
fn setup_app() -> Router {
    build_router(AppState::new(Arc::new(CoreConfig::default())))
}

/// Test helper: Multipart upload with a single file field
fn upload_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Test helper: Multipart body with no fields at all
fn empty_upload_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(format!("--{BOUNDARY}--\r\n")))
        .unwrap()
}

fn percent_encode(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

/// Test helper: URL-encoded form post with one field
fn form_request(uri: &str, field: &str, value: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("{field}={}", percent_encode(value))))
        .unwrap()
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    serde_json::from_str(&body_text(body).await).expect("Should parse JSON")
}

/// Test helper: JSON shown in a page's `<pre id=...>` block
fn page_json(page: &str, id: &str) -> Value {
    let open = format!("<pre id=\"{id}\">");
    let start = page.find(&open).expect("output block") + open.len();
    let end = start + page[start..].find("</pre>").expect("end of output block");
    let json = page[start..end]
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    serde_json::from_str(&json).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = setup_app().oneshot(request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    assert!(body["message"].is_string());
}

// =============================================================================
// CDA to FHIR
// =============================================================================

#[tokio::test]
async fn test_cda_page_get_renders_form() {
    let response = setup_app().oneshot(request("GET", "/cda2fhir/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response.into_body()).await;
    assert!(page.contains("name=\"cda-input\""));
    assert!(!page.contains("FHIR Output"));
}

#[tokio::test]
async fn test_cda_page_good_ccda() {
    let response = setup_app()
        .oneshot(form_request("/cda2fhir/", "cda-input", GOOD_CCDA))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response.into_body()).await;
    assert!(page.contains("FHIR Output"));
    let output = page_json(&page, "fhir-output");
    assert_eq!(output["resourceType"], "Bundle");
}

#[tokio::test]
async fn test_cda_page_bad_ccda() {
    let response = setup_app()
        .oneshot(form_request("/cda2fhir/", "cda-input", BAD_CCDA))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response.into_body()).await;
    assert!(page.contains("FHIR Output"));
    let output = page_json(&page, "fhir-output");
    assert!(output.is_object());
    assert!(output["error"].is_string());
    assert_eq!(output["message"], "XmlParseError");
}

#[tokio::test]
async fn test_cda_api_good_ccda() {
    let response = setup_app()
        .oneshot(upload_request("/cda2fhir/api/", "cda_file", GOOD_CCDA.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let text = body_text(response.into_body()).await;
    assert!(text.starts_with("{\n  \"resourceType\": \"Bundle\""));
    let data: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(data["resourceType"], "Bundle");
    assert_eq!(data["entry"][0]["resource"]["resourceType"], "Composition");
}

#[tokio::test]
async fn test_cda_api_bad_ccda() {
    let response = setup_app()
        .oneshot(upload_request("/cda2fhir/api/", "cda_file", BAD_CCDA.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let data = extract_json(response.into_body()).await;
    assert!(data["error"].is_string());
    assert_eq!(data["message"], "XmlParseError");
    assert!(data["cause"].is_string());
}

#[tokio::test]
async fn test_cda_api_not_a_clinical_document_has_null_cause() {
    let response = setup_app()
        .oneshot(upload_request("/cda2fhir/api/", "cda_file", b"<note>hello</note>"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["message"], "InvalidDocument");
    assert!(data["cause"].is_null());
}

#[tokio::test]
async fn test_cda_api_invalid_utf8_is_server_error() {
    let response = setup_app()
        .oneshot(upload_request("/cda2fhir/api/", "cda_file", &[0x3c, 0xff, 0xfe, 0x3e]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["message"], "UnicodeDecodeError");
}

#[tokio::test]
async fn test_cda_api_missing_file() {
    let response = setup_app()
        .oneshot(empty_upload_request("/cda2fhir/api/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data, serde_json::json!({ "error": "No CDA file uploaded." }));
}

#[tokio::test]
async fn test_cda_api_empty_file() {
    let response = setup_app()
        .oneshot(upload_request("/cda2fhir/api/", "cda_file", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cda_api_rejects_get() {
    let response = setup_app()
        .oneshot(request("GET", "/cda2fhir/api/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["error"], "Only POST method allowed.");
}

#[tokio::test]
async fn test_cda_api_repeat_gives_same_classification() {
    let app = setup_app();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(upload_request("/cda2fhir/api/", "cda_file", BAD_CCDA.as_bytes()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let cfg = CoreConfig::new(64, CoreConfig::default().cda_document_type()).unwrap();
    let app = build_router(AppState::new(Arc::new(cfg)));
    let response = app
        .oneshot(upload_request("/cda2fhir/api/", "cda_file", GOOD_CCDA.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cda_page_paste_over_limit_is_rejected() {
    let cfg = CoreConfig::new(64, CoreConfig::default().cda_document_type()).unwrap();
    let app = build_router(AppState::new(Arc::new(cfg)));
    let response = app
        .oneshot(form_request("/cda2fhir/", "cda-input", GOOD_CCDA))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_cda_page_missing_field_converts_empty_input() {
    let response = setup_app()
        .oneshot(form_request("/cda2fhir/", "other", "value"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response.into_body()).await;
    let output = page_json(&page, "fhir-output");
    assert!(output["error"].is_string());
}

#[tokio::test]
async fn test_labcheck_page_wrong_content_type_is_rejected() {
    let response = setup_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/labcheck/")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(ADT))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_labcheck_api_custom_delimiters() {
    let message = "MSH#$*!%#LIS#LAB#EHR#CLINIC#20240315143005##ORU$R01#C1#P#2.5.1\rPID#1##MRN7##ROE$ANN";
    let response = setup_app()
        .oneshot(upload_request("/labcheck/api/", "hl7_file", message.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["message_type"], "ORU$R01");
    assert_eq!(data["message_code"], "ORU");
}

// =============================================================================
// HL7 lab checker
// =============================================================================

#[tokio::test]
async fn test_labcheck_page_good_hl7() {
    let response = setup_app()
        .oneshot(form_request("/labcheck/", "hl7-input", ADT))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response.into_body()).await;
    let parsed = page_json(&page, "parsed-json");
    assert_eq!(parsed["message_code"], "ADT");
    assert_eq!(parsed["patient"]["sex"], "M");
    assert_eq!(parsed["visit"]["patient_class"], "I");
}

#[tokio::test]
async fn test_labcheck_page_invalid_hl7() {
    let response = setup_app()
        .oneshot(form_request("/labcheck/", "hl7-input", BAD_HL7))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response.into_body()).await;
    assert!(page.contains("Invalid HL7 message."));
    assert!(!page.contains("<pre id=\"parsed-json\">"));
}

#[tokio::test]
async fn test_labcheck_api_good_hl7() {
    let response = setup_app()
        .oneshot(upload_request("/labcheck/api/", "hl7_file", LAB_MESSAGE.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["message_code"], "ORU");
    assert_eq!(data["control_id"], "CTRL0001");
    let order = &data["orders"][0];
    assert_eq!(order["observations"].as_array().map(Vec::len), Some(2));
    assert_eq!(order["observations"][0]["units"], "g/dL");
    assert_eq!(order["observations"][1]["abnormal_flags"], "H");
}

#[tokio::test]
async fn test_labcheck_api_invalid_hl7_is_ok() {
    let response = setup_app()
        .oneshot(upload_request("/labcheck/api/", "hl7_file", BAD_HL7.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["error"], "Invalid HL7 message.");
    assert_eq!(data["hl7_input"], BAD_HL7);
}

#[tokio::test]
async fn test_labcheck_api_invalid_utf8_is_server_error() {
    let response = setup_app()
        .oneshot(upload_request("/labcheck/api/", "hl7_file", &[0x4d, 0x53, 0x48, 0xff]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let data = extract_json(response.into_body()).await;
    assert!(data["error"].is_string());
}

#[tokio::test]
async fn test_labcheck_api_missing_file() {
    let response = setup_app()
        .oneshot(upload_request("/labcheck/api/", "other_field", ADT.as_bytes()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["error"], "No HL7 file uploaded.");
}

#[tokio::test]
async fn test_labcheck_api_not_multipart_is_missing_file() {
    let response = setup_app()
        .oneshot(request("POST", "/labcheck/api/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_labcheck_api_rejects_put() {
    let response = setup_app()
        .oneshot(request("PUT", "/labcheck/api/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let data = extract_json(response.into_body()).await;
    assert_eq!(data["error"], "Only POST method allowed.");
}
