//! # API Shared
//!
//! Shared definitions for the interop APIs.
//!
//! Contains:
//! - Response bodies (`responses` module) with their OpenAPI schemas
//! - JSON formatting used by both the upload endpoints and the pages
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `interop` CLI for common functionality.

pub mod health;
pub mod responses;

pub use health::{HealthRes, HealthService};
pub use responses::{CdaErrorBody, ErrorBody, InvalidHl7Body};
