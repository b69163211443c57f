//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handlers never read process-wide environment variables;
//! they only see the `CoreConfig` they were given.

use crate::constants::{DEFAULT_CDA_DOCUMENT_TYPE, DEFAULT_MAX_UPLOAD_BYTES};
use crate::validation::validate_max_upload_bytes;
use crate::{CoreError, CoreResult};
use fhir::DocumentType;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    max_upload_bytes: usize,
    cda_document_type: DocumentType,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `max_upload_bytes` is zero.
    pub fn new(max_upload_bytes: usize, cda_document_type: DocumentType) -> CoreResult<Self> {
        validate_max_upload_bytes(max_upload_bytes)?;

        Ok(Self {
            max_upload_bytes,
            cda_document_type,
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn cda_document_type(&self) -> DocumentType {
        self.cda_document_type
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cda_document_type: DEFAULT_CDA_DOCUMENT_TYPE,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the upload limit from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_UPLOAD_BYTES`].
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> CoreResult<usize> {
    let Some(value) = non_empty(value) else {
        return Ok(DEFAULT_MAX_UPLOAD_BYTES);
    };
    let parsed = value.parse::<usize>().map_err(|_| {
        CoreError::InvalidInput(format!(
            "INTEROP_MAX_UPLOAD_BYTES must be a positive integer, got '{value}'"
        ))
    })?;
    validate_max_upload_bytes(parsed)?;
    Ok(parsed)
}

/// Parse the CDA document type from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_CDA_DOCUMENT_TYPE`].
pub fn cda_document_type_from_env_value(value: Option<String>) -> CoreResult<DocumentType> {
    let parsed = non_empty(value)
        .map(|v| {
            v.parse::<DocumentType>()
                .map_err(|e| CoreError::InvalidInput(format!("INTEROP_CDA_DOCUMENT_TYPE: {e}")))
        })
        .transpose()?;

    Ok(parsed.unwrap_or(DEFAULT_CDA_DOCUMENT_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset_or_blank() {
        assert_eq!(
            max_upload_bytes_from_env_value(None).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
        assert_eq!(
            max_upload_bytes_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
        assert_eq!(
            cda_document_type_from_env_value(Some(String::new())).unwrap(),
            DocumentType::Ccd
        );
    }

    #[test]
    fn parses_explicit_values() {
        assert_eq!(
            max_upload_bytes_from_env_value(Some("2048".into())).unwrap(),
            2048
        );
        assert_eq!(
            cda_document_type_from_env_value(Some("ProgressNote".into())).unwrap(),
            DocumentType::ProgressNote
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            max_upload_bytes_from_env_value(Some("0".into())),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            max_upload_bytes_from_env_value(Some("ten".into())),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            cda_document_type_from_env_value(Some("Letter".into())),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(CoreConfig::new(0, DocumentType::Ccd).is_err());
    }
}
