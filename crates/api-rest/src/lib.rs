//! # API REST
//!
//! REST API implementation for the CDA to FHIR converter and the HL7 lab checker.
//!
//! Handles:
//! - HTTP endpoints with axum (HTML form pages and multipart upload APIs)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON formatting, status codes, CORS, body limits)
//!
//! Uses `interop-core` for the conversions and `api-shared` for response bodies.

#![warn(rust_2018_idioms)]

pub mod cda2fhir;
pub mod labcheck;
pub mod pages;
mod upload;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{CdaErrorBody, ErrorBody, HealthRes, HealthService, InvalidHl7Body};
use interop_core::{ConversionService, CoreConfig};

/// Application state shared across REST API handlers.
///
/// Holds the startup configuration and the conversion service. Neither changes after startup,
/// so requests never share mutable state.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub service: ConversionService,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let service = ConversionService::new(&cfg);
        Self { cfg, service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, cda2fhir::api_index, labcheck::api_index),
    components(schemas(HealthRes, ErrorBody, CdaErrorBody, InvalidHl7Body))
)]
pub struct ApiDoc;

/// Build the full router: pages, upload APIs, health and Swagger UI.
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.cfg.max_upload_bytes();

    Router::new()
        .route("/health", get(health))
        .route(
            "/cda2fhir/",
            get(cda2fhir::index_page).post(cda2fhir::index_submit),
        )
        .route("/cda2fhir/api/", cda2fhir::api_route())
        .route(
            "/labcheck/",
            get(labcheck::index_page).post(labcheck::index_submit),
        )
        .route("/labcheck/api/", labcheck::api_route())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns the current health status of the interop service.
/// This endpoint is used for monitoring and load balancer health checks.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}
