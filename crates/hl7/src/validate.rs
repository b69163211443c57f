//! Structural validity check.
//!
//! This is deliberately shallow: it checks the things that must hold for [`crate::parse_message`]
//! to produce something meaningful, not conformance to a message profile.

use crate::encoding::Delimiters;
use crate::segment::Segment;
use crate::{Hl7Error, Hl7Result, SEGMENT_SEPARATOR};

/// Check that cleaned text is a structurally valid HL7 v2 message (or batch of messages).
///
/// # Errors
///
/// Returns the first structural problem found:
/// - [`Hl7Error::Empty`] for blank input
/// - [`Hl7Error::MissingHeader`] if the first segment is not MSH
/// - [`Hl7Error::InvalidEncodingCharacters`] if an MSH declares unusable delimiters
/// - [`Hl7Error::InvalidSegmentId`] for a segment id that is not three upper-case alphanumerics
/// - [`Hl7Error::MissingMessageType`] if an MSH has no MSH-9
pub fn validate(message: &str) -> Hl7Result<()> {
    let mut lines = message
        .split(SEGMENT_SEPARATOR)
        .filter(|line| !line.is_empty())
        .peekable();

    let first = lines.peek().ok_or(Hl7Error::Empty)?;
    if !first.starts_with("MSH") {
        let found: String = first.chars().take(3).collect();
        return Err(Hl7Error::MissingHeader(found));
    }

    let mut delimiters = Delimiters::default();
    for (index, line) in lines.enumerate() {
        if line.starts_with("MSH") {
            delimiters = Delimiters::from_msh(line)?;
            let header = Segment::parse(line, &delimiters);
            if header.component(9, 1).is_none() {
                return Err(Hl7Error::MissingMessageType);
            }
            continue;
        }

        let id = line.split(delimiters.field).next().unwrap_or_default();
        if !is_segment_id(id) {
            return Err(Hl7Error::InvalidSegmentId {
                line: index + 1,
                id: id.chars().take(16).collect(),
            });
        }
    }

    Ok(())
}

/// `true` if [`validate`] accepts the message.
pub fn is_valid(message: &str) -> bool {
    match validate(message) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!("hl7 validation failed: {err}");
            false
        }
    }
}

fn is_segment_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == 3
        && bytes[0].is_ascii_uppercase()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
