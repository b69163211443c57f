//! Constants used throughout the interop core crate.
//!
//! User-facing messages live here so the HTTP layer, the CLI and the tests all agree on the
//! exact wording.

/// Default upper bound for an uploaded document, in bytes (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Document template used when none is configured.
pub const DEFAULT_CDA_DOCUMENT_TYPE: fhir::DocumentType = fhir::DocumentType::Ccd;

/// Error for a CDA upload request without a file.
pub const NO_CDA_FILE_MESSAGE: &str = "No CDA file uploaded.";

/// Error for an HL7 upload request without a file.
pub const NO_HL7_FILE_MESSAGE: &str = "No HL7 file uploaded.";

/// Reported when an HL7 message fails the structural check.
pub const INVALID_HL7_MESSAGE: &str = "Invalid HL7 message.";

/// Body of the 405 response on the upload endpoints.
pub const ONLY_POST_MESSAGE: &str = "Only POST method allowed.";
