//! C-CDA to FHIR R4 conversion.
//!
//! This crate renders a C-CDA XML document into a FHIR `Bundle` (type `document`):
//! - a `Composition` built from the document header and its sections
//! - the `Patient`, authoring `Practitioner`s and custodian `Organization`
//! - one clinical resource per recognised section entry (allergies, problems, medications,
//!   results, vital signs, immunizations, procedures)
//!
//! This crate focuses on:
//! - reading the CDA header and the common C-CDA entry templates
//! - producing FHIR R4 shaped JSON with deterministic resource ids
//!
//! It does NOT validate documents against C-CDA schematron or FHIR profiles.

mod cda;
pub mod codesystems;
pub mod document_type;
pub mod renderer;
pub mod resources;
mod sections;

pub use document_type::DocumentType;
pub use renderer::CcdaRenderer;
pub use resources::{Bundle, Resource};

/// Errors returned by the `fhir` crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("failed to parse CDA XML")]
    XmlParse(#[from] roxmltree::Error),

    #[error("invalid CDA document: {0}")]
    InvalidDocument(String),

    #[error("CDA document is missing required element {0}")]
    MissingElement(&'static str),

    #[error("unsupported document type '{0}'")]
    UnsupportedDocumentType(String),

    #[error("failed to serialise FHIR bundle")]
    Serialization(#[from] serde_json::Error),
}

impl FhirError {
    /// Stable name of this error variant, used when reporting failures.
    pub fn kind(&self) -> &'static str {
        match self {
            FhirError::XmlParse(_) => "XmlParseError",
            FhirError::InvalidDocument(_) => "InvalidDocument",
            FhirError::MissingElement(_) => "MissingElement",
            FhirError::UnsupportedDocumentType(_) => "UnsupportedDocumentType",
            FhirError::Serialization(_) => "SerializationError",
        }
    }
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
