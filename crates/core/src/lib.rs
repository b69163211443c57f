//! # Interop Core
//!
//! Core business logic for the CDA to FHIR converter and the HL7 lab checker.
//!
//! This crate turns a raw request payload into a [`ConversionResult`]:
//! - decoding pasted text or uploaded bytes
//! - the HL7 structural check
//! - calling the CDA renderer or the HL7 parser through the [`CdaRenderer`] and
//!   [`Hl7Toolkit`] seams
//! - classifying failures so the caller can choose a status code
//!
//! **No API concerns**: HTTP routing, multipart handling and page rendering belong in
//! `api-rest` and `api-shared`.

pub mod collaborators;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod error;
pub mod service;
pub mod validation;

pub use collaborators::{CdaRenderer, Hl7Library, Hl7Toolkit};
pub use config::CoreConfig;
pub use conversion::{
    ConversionFailure, ConversionRequest, ConversionResult, FailureClass, RawInput, SourceFormat,
    Stage,
};
pub use error::{CoreError, CoreResult};
pub use service::ConversionService;
