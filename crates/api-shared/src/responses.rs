//! Response bodies and JSON formatting shared by the interop front-ends.

use interop_core::ConversionFailure;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `{"error": ...}`, used for missing uploads, wrong methods and HL7 parse failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Error object for CDA conversion failures.
///
/// `message` names the failure kind; `cause` is `null` when the failure has no underlying
/// cause.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CdaErrorBody {
    pub error: String,
    pub message: String,
    pub cause: Option<String>,
}

impl From<&ConversionFailure> for CdaErrorBody {
    fn from(failure: &ConversionFailure) -> Self {
        Self {
            error: failure.error.clone(),
            message: failure.kind.clone(),
            cause: failure.cause.clone(),
        }
    }
}

/// Reply for an HL7 message that fails the structural check. Echoes the submitted text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvalidHl7Body {
    pub hl7_input: String,
    pub error: String,
}

impl From<&ConversionFailure> for InvalidHl7Body {
    fn from(failure: &ConversionFailure) -> Self {
        Self {
            hl7_input: failure.input.clone().unwrap_or_default(),
            error: failure.error.clone(),
        }
    }
}

/// Serialise `value` as JSON indented by `indent` spaces.
///
/// # Errors
///
/// Returns the serialiser error if `value` cannot be represented as JSON.
pub fn to_json_indented<T: Serialize + ?Sized>(
    value: &T,
    indent: usize,
) -> Result<String, serde_json::Error> {
    let spaces = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(spaces.as_bytes());
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}
