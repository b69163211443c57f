//! The conversion pipeline: decode, validate (HL7 only), convert.
//!
//! Every call runs one request to a terminal [`Stage`] and returns a [`ConversionResult`]. No
//! error escapes as a panic or an `Err`; failures are values the caller formats.

use std::sync::Arc;

use fhir::DocumentType;

use crate::collaborators::{CdaRenderer, Hl7Library, Hl7Toolkit};
use crate::config::CoreConfig;
use crate::conversion::{
    ConversionFailure, ConversionRequest, ConversionResult, SourceFormat, Stage,
};
use crate::{CoreError, CoreResult};

/// Stateless conversion operations - no HTTP concerns.
#[derive(Clone)]
pub struct ConversionService {
    renderer: Arc<dyn CdaRenderer>,
    toolkit: Arc<dyn Hl7Toolkit>,
    document_type: DocumentType,
}

impl ConversionService {
    /// Creates a service backed by the `fhir` and `hl7` crates.
    pub fn new(config: &CoreConfig) -> Self {
        Self::with_collaborators(
            Arc::new(fhir::CcdaRenderer::new()),
            Arc::new(Hl7Library),
            config.cda_document_type(),
        )
    }

    pub fn with_collaborators(
        renderer: Arc<dyn CdaRenderer>,
        toolkit: Arc<dyn Hl7Toolkit>,
        document_type: DocumentType,
    ) -> Self {
        Self {
            renderer,
            toolkit,
            document_type,
        }
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    /// Run a request through the pipeline for its source format.
    pub fn convert(&self, request: ConversionRequest) -> ConversionResult {
        match request.source_format {
            SourceFormat::Ccda => self.convert_cda(request),
            SourceFormat::Hl7 => self.check_hl7(request),
        }
    }

    /// Render a CDA document into a FHIR Bundle.
    ///
    /// Decoding and rendering failures are `Conversion` failures carrying the error kind and
    /// its cause.
    pub fn convert_cda(&self, request: ConversionRequest) -> ConversionResult {
        let xml = match request.raw_input.decode() {
            Ok(xml) => xml,
            Err(e) => return failed(&e, Stage::AwaitingInput),
        };

        tracing::debug!("cda2fhir: converting {} bytes as {}", xml.len(), self.document_type);
        match self.render(&xml) {
            Ok(bundle) => {
                tracing::debug!("cda2fhir: succeeded");
                ConversionResult::Success(bundle)
            }
            Err(e) => failed(&e, Stage::Converting),
        }
    }

    fn render(&self, xml: &str) -> CoreResult<serde_json::Value> {
        let rendered = self.renderer.render_fhir_string(self.document_type, xml)?;
        serde_json::from_str(&rendered).map_err(CoreError::Serialization)
    }

    /// Clean, check and parse an HL7 v2 message, keeping the first parsed message.
    ///
    /// A message that fails the structural check is an `Invalid` failure, not an error.
    pub fn check_hl7(&self, request: ConversionRequest) -> ConversionResult {
        let text = match request.raw_input.decode() {
            Ok(text) => text,
            Err(e) => return failed(&e, Stage::AwaitingInput),
        };

        tracing::debug!("labcheck: validating {} bytes", text.len());
        let cleaned = self.toolkit.cleanup(&text);
        if !self.toolkit.is_valid(&cleaned) {
            tracing::info!("labcheck: invalid HL7 message");
            return ConversionResult::Failure(ConversionFailure::invalid_hl7(text));
        }

        tracing::debug!("labcheck: parsing");
        match self.toolkit.parse_first(&cleaned) {
            Ok(parsed) => {
                tracing::debug!("labcheck: succeeded");
                ConversionResult::Success(parsed)
            }
            Err(e) => failed(&e, Stage::Converting),
        }
    }
}

fn failed(error: &CoreError, stage: Stage) -> ConversionResult {
    tracing::warn!("conversion failed during {:?}: {} ({})", stage, error, error.kind());
    ConversionResult::Failure(ConversionFailure::from_error(error, stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{FailureClass, RawInput};
    use fhir::FhirError;
    use hl7::Hl7Error;
    use serde_json::json;

    struct StubRenderer(Result<&'static str, fn() -> FhirError>);

    impl CdaRenderer for StubRenderer {
        fn render_fhir_string(&self, _: DocumentType, _: &str) -> Result<String, FhirError> {
            match &self.0 {
                Ok(json) => Ok(json.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    struct StubToolkit {
        valid: bool,
        parse_fails: bool,
    }

    impl Hl7Toolkit for StubToolkit {
        fn cleanup(&self, text: &str) -> String {
            text.trim().to_string()
        }

        fn is_valid(&self, _: &str) -> bool {
            self.valid
        }

        fn parse_first(&self, text: &str) -> CoreResult<serde_json::Value> {
            if self.parse_fails {
                return Err(Hl7Error::NoMessages.into());
            }
            Ok(json!({ "cleaned": text }))
        }
    }

    fn service(renderer: StubRenderer, valid: bool, parse_fails: bool) -> ConversionService {
        ConversionService::with_collaborators(
            Arc::new(renderer),
            Arc::new(StubToolkit { valid, parse_fails }),
            DocumentType::Ccd,
        )
    }

    fn cda(text: &str) -> ConversionRequest {
        ConversionRequest::from_text(SourceFormat::Ccda, Some(text.to_string()))
    }

    fn hl7(text: &str) -> ConversionRequest {
        ConversionRequest::from_text(SourceFormat::Hl7, Some(text.to_string()))
    }

    fn failure(result: ConversionResult) -> ConversionFailure {
        match result {
            ConversionResult::Failure(f) => f,
            ConversionResult::Success(v) => panic!("expected failure, got {v}"),
        }
    }

    #[test]
    fn cda_success_parses_rendered_json() {
        let svc = service(StubRenderer(Ok(r#"{"resourceType":"Bundle"}"#)), true, false);
        let result = svc.convert(cda("<ClinicalDocument/>"));
        assert_eq!(result, ConversionResult::Success(json!({ "resourceType": "Bundle" })));
        assert_eq!(result.stage(), Stage::Succeeded);
    }

    #[test]
    fn cda_render_error_is_conversion_failure() {
        let svc = service(
            StubRenderer(Err(|| FhirError::InvalidDocument("root".into()))),
            true,
            false,
        );
        let f = failure(svc.convert(cda("<x/>")));
        assert_eq!(f.class, FailureClass::Conversion);
        assert_eq!(f.kind, "InvalidDocument");
        assert_eq!(f.error, "invalid CDA document: root");
        assert_eq!(f.stage, Stage::Converting);
        assert_eq!(f.cause, None);
    }

    #[test]
    fn cda_undecodable_upload_fails_before_rendering() {
        let svc = service(StubRenderer(Ok("{}")), true, false);
        let request = ConversionRequest {
            raw_input: RawInput::Bytes(vec![0xc3, 0x28]),
            source_format: SourceFormat::Ccda,
        };
        let f = failure(svc.convert(request));
        assert_eq!(f.kind, "UnicodeDecodeError");
        assert_eq!(f.stage, Stage::AwaitingInput);
        assert!(f.cause.is_some());
    }

    #[test]
    fn hl7_invalid_is_reported_with_original_input() {
        let svc = service(StubRenderer(Ok("{}")), false, false);
        let f = failure(svc.convert(hl7("  not hl7  ")));
        assert_eq!(f.class, FailureClass::Invalid);
        assert_eq!(f.error, "Invalid HL7 message.");
        assert_eq!(f.input.as_deref(), Some("  not hl7  "));
        assert_eq!(f.stage, Stage::Validating);
    }

    #[test]
    fn hl7_success_parses_cleaned_text() {
        let svc = service(StubRenderer(Ok("{}")), true, false);
        let result = svc.convert(hl7("  MSH|^~\\&  "));
        assert_eq!(result, ConversionResult::Success(json!({ "cleaned": "MSH|^~\\&" })));
    }

    #[test]
    fn hl7_parse_error_is_conversion_failure() {
        let svc = service(StubRenderer(Ok("{}")), true, true);
        let f = failure(svc.convert(hl7("MSH")));
        assert_eq!(f.class, FailureClass::Conversion);
        assert_eq!(f.error, "no messages found in input");
    }

    #[test]
    fn repeated_requests_classify_the_same() {
        let svc = ConversionService::new(&CoreConfig::default());
        let request = hl7("PID|1||123");
        let first = svc.convert(request.clone());
        let second = svc.convert(request);
        assert_eq!(first, second);
        assert_eq!(failure(first).class, FailureClass::Invalid);
    }

    #[test]
    fn library_backed_service_parses_a_real_message() {
        let svc = ConversionService::new(&CoreConfig::default());
        let message = "MSH|^~\\&|LAB|HOSP|EHR|HOSP|20240102030405||ORU^R01|MSG1|P|2.5\r\
                       PID|1||12345^^^HOSP^MR||DOE^JANE||19800101|F\r\
                       OBR|1||ORD1|718-7^Hemoglobin^LN\r\
                       OBX|1|NM|718-7^Hemoglobin^LN||13.2|g/dL|12-16|N|||F\r";
        match svc.convert(hl7(message)) {
            ConversionResult::Success(parsed) => assert!(parsed.is_object()),
            ConversionResult::Failure(f) => panic!("unexpected failure: {f:?}"),
        }
    }
}
