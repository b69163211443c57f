//! Seams to the conversion libraries.
//!
//! The service only talks to the CDA renderer and the HL7 toolkit through these traits, so
//! either can be swapped or stubbed without touching request handling.

use fhir::{DocumentType, FhirError};
use hl7::Hl7Error;

use crate::{CoreError, CoreResult};

/// Renders a CDA document into FHIR JSON text.
pub trait CdaRenderer: Send + Sync {
    fn render_fhir_string(&self, document_type: DocumentType, xml: &str)
        -> Result<String, FhirError>;
}

/// Cleans, checks and parses HL7 v2 messages.
pub trait Hl7Toolkit: Send + Sync {
    fn cleanup(&self, text: &str) -> String;

    fn is_valid(&self, text: &str) -> bool;

    /// Parse a cleaned message and return the first message it contains.
    fn parse_first(&self, text: &str) -> CoreResult<serde_json::Value>;
}

impl CdaRenderer for fhir::CcdaRenderer {
    fn render_fhir_string(
        &self,
        document_type: DocumentType,
        xml: &str,
    ) -> Result<String, FhirError> {
        fhir::CcdaRenderer::render_fhir_string(self, document_type, xml)
    }
}

/// [`Hl7Toolkit`] backed by the `hl7` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hl7Library;

impl Hl7Toolkit for Hl7Library {
    fn cleanup(&self, text: &str) -> String {
        hl7::cleanup(text)
    }

    fn is_valid(&self, text: &str) -> bool {
        hl7::is_valid(text)
    }

    fn parse_first(&self, text: &str) -> CoreResult<serde_json::Value> {
        let first = hl7::parse_message(text)?
            .into_iter()
            .next()
            .ok_or(Hl7Error::NoMessages)?;
        serde_json::to_value(first).map_err(CoreError::Serialization)
    }
}
