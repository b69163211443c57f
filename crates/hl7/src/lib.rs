//! HL7 v2 message handling for the lab checker.
//!
//! This crate provides the three operations the lab checker front-end needs:
//! - [`cleanup`]: normalise pasted or uploaded text into `\r`-separated segments
//! - [`validate`] / [`is_valid`]: structural validity check on a cleaned message
//! - [`parse_message`]: parse a (possibly batched) message into [`ParsedMessage`] values
//!
//! This crate focuses on:
//! - pipe-delimited v2.x wire syntax (delimiters are read from each MSH segment)
//! - a structured, serde-serialisable projection of lab and ADT messages
//!
//! It does NOT implement profile conformance checking or message acknowledgement.

pub mod cleanup;
pub mod datetime;
pub mod encoding;
pub mod message;
pub mod segment;
pub mod validate;

pub use cleanup::cleanup;
pub use datetime::Hl7Timestamp;
pub use encoding::Delimiters;
pub use message::{
    parse_message, CodedValue, Identifier, Observation, Order, ParsedMessage, PatientSummary,
    PersonName, RawSegment, VisitSummary,
};
pub use segment::{Field, Segment};
pub use validate::{is_valid, validate};

/// HL7 segment terminator.
pub const SEGMENT_SEPARATOR: char = '\r';

/// Errors returned by the `hl7` crate.
#[derive(Debug, thiserror::Error)]
pub enum Hl7Error {
    #[error("message is empty")]
    Empty,

    #[error("message must start with an MSH segment, found '{0}'")]
    MissingHeader(String),

    #[error("invalid encoding characters in MSH: {0}")]
    InvalidEncodingCharacters(String),

    #[error("invalid segment id '{id}' on line {line}")]
    InvalidSegmentId { line: usize, id: String },

    #[error("MSH-9 message type is missing")]
    MissingMessageType,

    #[error("no messages found in input")]
    NoMessages,
}

impl Hl7Error {
    /// Stable name of this error variant, used when reporting failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Hl7Error::Empty => "EmptyMessage",
            Hl7Error::MissingHeader(_) => "MissingHeader",
            Hl7Error::InvalidEncodingCharacters(_) => "InvalidEncodingCharacters",
            Hl7Error::InvalidSegmentId { .. } => "InvalidSegmentId",
            Hl7Error::MissingMessageType => "MissingMessageType",
            Hl7Error::NoMessages => "NoMessages",
        }
    }
}

/// Type alias for Results that can fail with an [`Hl7Error`].
pub type Hl7Result<T> = Result<T, Hl7Error>;
