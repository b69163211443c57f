use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api_rest::{build_router, AppState};
use interop_core::{
    config::{cda_document_type_from_env_value, max_upload_bytes_from_env_value},
    CoreConfig,
};

/// Service log levels on top of `RUST_LOG`. `tower_http=debug` is where `TraceLayer` logs requests.
fn log_filter(base: EnvFilter) -> anyhow::Result<EnvFilter> {
    Ok(base
        .add_directive("interop=info".parse()?)
        .add_directive("api_rest=info".parse()?)
        .add_directive("tower_http=debug".parse()?))
}

/// Main entry point for the interop service
///
/// Starts the REST server (default: 0.0.0.0:3000) with the CDA to FHIR and HL7 lab checker
/// pages, their upload APIs, a health check and Swagger UI.
///
/// # Environment Variables
/// - `INTEROP_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `INTEROP_MAX_UPLOAD_BYTES`: Largest accepted request body (default: 10 MiB)
/// - `INTEROP_CDA_DOCUMENT_TYPE`: Document template for CDA rendering (default: "CCD")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid, or server startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter(EnvFilter::from_default_env())?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("INTEROP_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("INTEROP_MAX_UPLOAD_BYTES").ok())?;
    let cda_document_type =
        cda_document_type_from_env_value(std::env::var("INTEROP_CDA_DOCUMENT_TYPE").ok())?;
    let cfg = Arc::new(CoreConfig::new(max_upload_bytes, cda_document_type)?);

    tracing::info!("++ Starting interop REST on {}", rest_addr);
    tracing::info!(
        "++ CDA document type {}, upload limit {} bytes",
        cfg.cda_document_type(),
        cfg.max_upload_bytes()
    );

    let app = build_router(AppState::new(cfg));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_enables_request_tracing() {
        let filter = log_filter(EnvFilter::new("")).unwrap().to_string();
        assert!(filter.contains("tower_http=debug"));
        assert!(filter.contains("interop=info"));
        assert!(filter.contains("api_rest=info"));
    }
}
