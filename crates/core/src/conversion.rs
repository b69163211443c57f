//! Request and result types shared by both conversion front-ends.

use serde::Serialize;

use crate::constants::{INVALID_HL7_MESSAGE, NO_CDA_FILE_MESSAGE, NO_HL7_FILE_MESSAGE};
use crate::validation::non_empty_upload;
use crate::{CoreError, CoreResult};

/// Which converter a request is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Ccda,
    Hl7,
}

impl SourceFormat {
    /// Error reported when an upload request carries no file.
    pub fn missing_upload_message(self) -> &'static str {
        match self {
            SourceFormat::Ccda => NO_CDA_FILE_MESSAGE,
            SourceFormat::Hl7 => NO_HL7_FILE_MESSAGE,
        }
    }
}

/// Request payload as it arrived: pasted form text or uploaded bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawInput {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawInput {
    /// Decode the input as UTF-8 text, dropping a leading byte order mark.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Decode` if uploaded bytes are not valid UTF-8.
    pub fn decode(self) -> CoreResult<String> {
        let text = match self {
            RawInput::Text(text) => text,
            RawInput::Bytes(bytes) => String::from_utf8(bytes)?,
        };
        Ok(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionRequest {
    pub raw_input: RawInput,
    pub source_format: SourceFormat,
}

impl ConversionRequest {
    /// A request from a form field. A missing field is an empty string.
    pub fn from_text(source_format: SourceFormat, text: Option<String>) -> Self {
        Self {
            raw_input: RawInput::Text(text.unwrap_or_default()),
            source_format,
        }
    }

    /// A request from a file upload.
    ///
    /// # Errors
    ///
    /// Returns a `MissingInput` failure if no file was uploaded or the file is empty.
    pub fn from_upload(
        source_format: SourceFormat,
        bytes: Option<Vec<u8>>,
    ) -> Result<Self, ConversionFailure> {
        match non_empty_upload(bytes) {
            Some(bytes) => Ok(Self {
                raw_input: RawInput::Bytes(bytes),
                source_format,
            }),
            None => Err(ConversionFailure::missing_input(source_format)),
        }
    }
}

/// Progress of one request through the pipeline.
///
/// `Succeeded` and `Failed` are terminal; nothing is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Stage {
    AwaitingInput,
    Validating,
    Converting,
    Succeeded,
    Failed,
}

/// How a failure should be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FailureClass {
    /// No usable input was supplied.
    MissingInput,
    /// The input failed the structural check. A reported condition, not an error.
    Invalid,
    /// The converter or parser returned an error.
    Conversion,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionFailure {
    /// Human readable error text.
    pub error: String,
    /// Stable name of the failure kind.
    pub kind: String,
    /// Text of the underlying cause, if any.
    pub cause: Option<String>,
    pub class: FailureClass,
    /// Stage the pipeline was in when it failed.
    pub stage: Stage,
    /// Decoded input, kept for reports that echo it back.
    pub input: Option<String>,
}

impl ConversionFailure {
    pub fn missing_input(source_format: SourceFormat) -> Self {
        Self {
            error: source_format.missing_upload_message().to_string(),
            kind: "MissingInput".to_string(),
            cause: None,
            class: FailureClass::MissingInput,
            stage: Stage::AwaitingInput,
            input: None,
        }
    }

    pub fn invalid_hl7(input: String) -> Self {
        Self {
            error: INVALID_HL7_MESSAGE.to_string(),
            kind: "InvalidMessage".to_string(),
            cause: None,
            class: FailureClass::Invalid,
            stage: Stage::Validating,
            input: Some(input),
        }
    }

    pub fn from_error(error: &CoreError, stage: Stage) -> Self {
        Self {
            error: error.to_string(),
            kind: error.kind().to_string(),
            cause: error.cause(),
            class: FailureClass::Conversion,
            stage,
            input: None,
        }
    }
}

/// Outcome of a request: exactly one of a JSON payload or a failure.
#[derive(Clone, Debug, PartialEq)]
pub enum ConversionResult {
    Success(serde_json::Value),
    Failure(ConversionFailure),
}

impl ConversionResult {
    /// The terminal stage this result represents.
    pub fn stage(&self) -> Stage {
        match self {
            ConversionResult::Success(_) => Stage::Succeeded,
            ConversionResult::Failure(_) => Stage::Failed,
        }
    }
}
