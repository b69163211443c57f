//! Supported C-CDA document types.

use std::fmt;
use std::str::FromStr;

use crate::FhirError;

/// The C-CDA document template a caller asks the renderer to use.
///
/// The type supplies the Composition type and title when the document itself does not carry a
/// usable `code` or `title`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// Continuity of Care Document.
    Ccd,
    DischargeSummary,
    ReferralNote,
    ProgressNote,
}

impl DocumentType {
    /// Name as accepted by [`DocumentType::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            DocumentType::Ccd => "CCD",
            DocumentType::DischargeSummary => "DischargeSummary",
            DocumentType::ReferralNote => "ReferralNote",
            DocumentType::ProgressNote => "ProgressNote",
        }
    }

    /// LOINC document code.
    pub fn loinc_code(self) -> &'static str {
        match self {
            DocumentType::Ccd => "34133-9",
            DocumentType::DischargeSummary => "18842-5",
            DocumentType::ReferralNote => "57133-1",
            DocumentType::ProgressNote => "11506-3",
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            DocumentType::Ccd => "Summarization of Episode Note",
            DocumentType::DischargeSummary => "Discharge summary",
            DocumentType::ReferralNote => "Referral note",
            DocumentType::ProgressNote => "Progress note",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DocumentType {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CCD" => Ok(DocumentType::Ccd),
            "DischargeSummary" => Ok(DocumentType::DischargeSummary),
            "ReferralNote" => Ok(DocumentType::ReferralNote),
            "ProgressNote" => Ok(DocumentType::ProgressNote),
            other => Err(FhirError::UnsupportedDocumentType(other.to_string())),
        }
    }
}
