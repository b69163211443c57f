use std::error::Error as _;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("'utf-8' codec can't decode uploaded file")]
    Decode(#[from] std::string::FromUtf8Error),
    #[error("{0}")]
    Cda(#[from] fhir::FhirError),
    #[error("{0}")]
    Hl7(#[from] hl7::Hl7Error),
    #[error("failed to serialize conversion output: {0}")]
    Serialization(serde_json::Error),
}

impl CoreError {
    /// Stable name of the underlying failure.
    ///
    /// Collaborator errors report their own kind so callers see `XmlParseError` rather than a
    /// wrapper name.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "InvalidInput",
            CoreError::Decode(_) => "UnicodeDecodeError",
            CoreError::Cda(e) => e.kind(),
            CoreError::Hl7(e) => e.kind(),
            CoreError::Serialization(_) => "SerializationError",
        }
    }

    /// Text of the error that caused this one, if there is one.
    ///
    /// The wrapping variants are transparent, so this looks through them to the collaborator
    /// error's own source.
    pub fn cause(&self) -> Option<String> {
        let source = match self {
            CoreError::Cda(e) => e.source(),
            CoreError::Hl7(e) => e.source(),
            other => other.source(),
        };
        source.map(|s| s.to_string())
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
